//! Command-line shell. One [`Command`] per use case, plus `nuke`.
//!
//! Commands print their result as JSON on stdout. Errors go to stderr and
//! become the process exit code through [`UseCaseError::exit_code`].

mod admin;
mod journaling;
mod work;
mod workspace;

use std::path::PathBuf;

use clap::{ArgMatches, FromArgMatches};
use serde::Serialize;
use serde_json::Value;

use crate::config::ConfigOverrides;
use crate::models::{Env, Hosting};
use crate::use_cases::{UseCaseEnv, UseCaseError, UseCaseResult};

pub const BINARY_NAME: &str = "lifeplan";

/// A CLI command bound to one use case.
pub trait Command: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// The subcommand parser, without the global flags.
    fn build_parser(&self) -> clap::Command;

    fn run(&self, env: &UseCaseEnv, matches: &ArgMatches) -> UseCaseResult<Value>;

    /// Whether migrations must run before [`Command::run`].
    fn prepares_storage(&self) -> bool {
        true
    }
}

/// A command whose arguments are a derived [`clap::Args`] struct.
pub struct UseCaseCommand<A> {
    name: &'static str,
    description: &'static str,
    run: fn(&UseCaseEnv, A) -> UseCaseResult<Value>,
}

impl<A> Command for UseCaseCommand<A>
where
    A: clap::Args + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn description(&self) -> &'static str {
        self.description
    }

    fn build_parser(&self) -> clap::Command {
        A::augment_args(clap::Command::new(self.name).about(self.description))
    }

    fn run(&self, env: &UseCaseEnv, matches: &ArgMatches) -> UseCaseResult<Value> {
        let args = A::from_arg_matches(matches)
            .map_err(|e| UseCaseError::Validation(e.to_string()))?;
        (self.run)(env, args)
    }
}

pub(crate) fn command<A: clap::Args + 'static>(
    name: &'static str,
    description: &'static str,
    run: fn(&UseCaseEnv, A) -> UseCaseResult<Value>,
) -> Box<dyn Command> {
    Box::new(UseCaseCommand {
        name,
        description,
        run,
    })
}

pub(crate) fn to_json<T: Serialize>(output: T) -> UseCaseResult<Value> {
    serde_json::to_value(output).map_err(UseCaseError::internal)
}

/// Every command, in help order.
pub fn commands() -> Vec<Box<dyn Command>> {
    let mut all = Vec::new();
    all.extend(workspace::commands());
    all.extend(work::commands());
    all.extend(journaling::commands());
    all.extend(admin::commands());
    all
}

/// The top-level parser: global flags plus one subcommand per command.
pub fn build_parser(commands: &[Box<dyn Command>]) -> clap::Command {
    let root = clap::Command::new(BINARY_NAME)
        .about("Personal life planning: projects, habits, inbox tasks, journals and more")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            clap::Arg::new("env")
                .long("env")
                .global(true)
                .value_parser(clap::value_parser!(Env))
                .help("Runtime environment (production, staging, local)"),
        )
        .arg(
            clap::Arg::new("hosting")
                .long("hosting")
                .global(true)
                .value_parser(clap::value_parser!(Hosting))
                .help("Deployment mode (hosted-global, self-hosted, local)"),
        )
        .arg(
            clap::Arg::new("db-path")
                .long("db-path")
                .global(true)
                .value_parser(clap::value_parser!(PathBuf))
                .help("SQLite database file"),
        )
        .arg(
            clap::Arg::new("data-dir")
                .long("data-dir")
                .global(true)
                .value_parser(clap::value_parser!(PathBuf))
                .help("Directory holding workspace.yaml and .system.lock"),
        );
    commands
        .iter()
        .fold(root, |root, command| root.subcommand(command.build_parser()))
}

/// Global flags, as configuration overrides.
pub fn overrides(matches: &ArgMatches) -> ConfigOverrides {
    ConfigOverrides {
        env: matches.get_one::<Env>("env").copied(),
        hosting: matches.get_one::<Hosting>("hosting").copied(),
        db_path: matches.get_one::<PathBuf>("db-path").cloned(),
        data_dir: matches.get_one::<PathBuf>("data-dir").cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_names_are_unique() {
        let all = commands();
        let mut names: Vec<&str> = all.iter().map(|c| c.name()).collect();
        names.sort_unstable();
        let before = names.len();
        names.dedup();
        assert_eq!(names.len(), before);
    }

    #[test]
    fn parser_is_well_formed() {
        build_parser(&commands()).debug_assert();
    }

    #[test]
    fn global_flags_become_overrides() {
        let matches = build_parser(&commands())
            .try_get_matches_from([
                BINARY_NAME,
                "project-find",
                "--env",
                "staging",
                "--db-path",
                "/tmp/x.sqlite",
            ])
            .unwrap();
        let overrides = overrides(&matches);
        assert_eq!(overrides.env, Some(Env::Staging));
        assert_eq!(overrides.db_path, Some(PathBuf::from("/tmp/x.sqlite")));
        assert_eq!(overrides.hosting, None);
    }

    #[test]
    fn invalid_domain_values_are_rejected_while_parsing() {
        let result = build_parser(&commands()).try_get_matches_from([
            BINARY_NAME,
            "project-create",
            "--key",
            "Not A Key",
            "--name",
            "Work",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn period_lists_repeat_the_flag() {
        let parsed = build_parser(&commands()).try_get_matches_from([
            BINARY_NAME,
            "journal-periods-update",
            "--period",
            "daily",
            "--period",
            "weekly",
        ]);
        assert!(parsed.is_ok());
        let unknown = build_parser(&commands()).try_get_matches_from([
            BINARY_NAME,
            "time-plan-periods-update",
            "--period",
            "fortnightly",
        ]);
        assert!(unknown.is_err());
    }
}

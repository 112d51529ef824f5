use clap::{Arg, ArgAction, ArgMatches, Args};
use serde_json::{json, Value};

use super::{command, to_json, Command};
use crate::use_cases::*;

pub(super) fn commands() -> Vec<Box<dyn Command>> {
    vec![
        command(GcSweep::NAME, "Archive orphaned and stale entities", gc),
        command(GcLogTail::NAME, "Show the latest GC runs", gc_log),
        Box::new(Nuke),
    ]
}

#[derive(Debug, Args)]
struct GcCli {
    /// Also archive done and not-done inbox tasks and big plans
    #[arg(long)]
    archive_done: bool,
}

fn gc(env: &UseCaseEnv, cli: GcCli) -> UseCaseResult<Value> {
    to_json(env.run_logged_in_batch(
        &GcSweep,
        GcSweepArgs {
            archive_done: cli.archive_done,
        },
    )?)
}

#[derive(Debug, Args)]
struct GcLogCli {
    #[arg(long, default_value_t = DEFAULT_TAIL_LIMIT)]
    limit: u32,
}

fn gc_log(env: &UseCaseEnv, cli: GcLogCli) -> UseCaseResult<Value> {
    to_json(env.run_logged_in_readonly(&GcLogTail, GcLogTailArgs { limit: cli.limit })?)
}

/// Drops every table. Works on databases the current schema can't open.
struct Nuke;

impl Command for Nuke {
    fn name(&self) -> &'static str {
        "nuke"
    }

    fn description(&self) -> &'static str {
        "Delete all data, including the schema"
    }

    fn build_parser(&self) -> clap::Command {
        clap::Command::new(self.name()).about(self.description()).arg(
            Arg::new("yes")
                .long("yes")
                .action(ArgAction::SetTrue)
                .help("Confirm that everything should be deleted"),
        )
    }

    fn run(&self, env: &UseCaseEnv, matches: &ArgMatches) -> UseCaseResult<Value> {
        if !matches.get_flag("yes") {
            return Err(UseCaseError::Validation(
                "refusing to nuke without --yes".into(),
            ));
        }
        env.storage.connection().nuke()?;
        Ok(json!({ "nuked": true }))
    }

    fn prepares_storage(&self) -> bool {
        false
    }
}

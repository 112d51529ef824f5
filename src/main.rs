use std::process::ExitCode;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lifeplan::bootstrap::BootstrapFiles;
use lifeplan::cli;
use lifeplan::config::GlobalProperties;
use lifeplan::db::{Connection, DomainStorageEngine};
use lifeplan::use_cases::{Principal, UseCaseEnv, UseCaseError};

/// Logs go to stderr so stdout carries only command output.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "lifeplan=info".into()),
    );
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn fail(error: &UseCaseError) -> ExitCode {
    eprintln!("error: {error}");
    ExitCode::from(error.exit_code() as u8)
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    init_tracing();

    let mut commands = cli::commands();
    let matches = match cli::build_parser(&commands).try_get_matches() {
        Ok(matches) => matches,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            e.print()?;
            return Ok(ExitCode::from(code));
        }
    };
    let props = GlobalProperties::from_env(cli::overrides(&matches))
        .context("invalid LIFEPLAN_* configuration")?;
    tracing::debug!(env = %props.env, hosting = %props.hosting, db = %props.db_path.display(), "Configured");

    let Some((name, sub_matches)) = matches.subcommand() else {
        return Ok(ExitCode::from(1));
    };
    let Some(index) = commands.iter().position(|c| c.name() == name) else {
        return Ok(ExitCode::from(1));
    };
    let command = commands.swap_remove(index);
    let sub_matches = sub_matches.clone();

    let connection = match Connection::open(&props.db_path) {
        Ok(connection) => connection,
        Err(e) => return Ok(fail(&e.into())),
    };
    if command.prepares_storage() {
        if let Err(e) = connection.prepare() {
            return Ok(fail(&e.into()));
        }
    }

    let files = BootstrapFiles::new(&props.data_dir);
    let principal = Principal::from_lock(&files.load_lock());
    let env = UseCaseEnv::new(DomainStorageEngine::new(connection), files).with_principal(principal);
    let cancellation = env.cancellation.clone();

    let task = tokio::task::spawn_blocking(move || command.run(&env, &sub_matches));
    let result = match tokio::time::timeout(props.use_case_timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(UseCaseError::internal(join_error)),
        Err(_) => {
            cancellation.cancel();
            tracing::warn!(command = name, timeout = ?props.use_case_timeout, "Command timed out");
            Err(UseCaseError::Timeout)
        }
    };

    match result {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => Ok(fail(&e)),
    }
}

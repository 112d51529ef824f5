use clap::Args;
use serde_json::{json, Value};

use super::{command, to_json, Command};
use crate::models::*;
use crate::use_cases::*;

pub(super) fn commands() -> Vec<Box<dyn Command>> {
    vec![
        command(InitWorkspace::NAME, "Create the owner and the workspace", init),
        command(Login::NAME, "Log in and remember the session", login),
        command(ChangePassword::NAME, "Change the owner's password", change_password),
        command(UpdateFeatureFlags::NAME, "Enable or disable workspace features", feature_flags),
    ]
}

#[derive(Debug, Args)]
struct InitCli {
    #[arg(long)]
    email: String,
    #[arg(long)]
    user_name: String,
    #[arg(long)]
    password: String,
    #[arg(long)]
    workspace_name: String,
    /// Features to leave off, repeatable
    #[arg(long = "disable")]
    disabled: Vec<WorkspaceFeature>,
}

fn init(env: &UseCaseEnv, cli: InitCli) -> UseCaseResult<Value> {
    let email = EmailAddress::from_raw(&cli.email);
    let user_name = EntityName::from_raw(&cli.user_name);
    let workspace_name = EntityName::from_raw(&cli.workspace_name);
    let password = PasswordHash::check_plain(&cli.password);
    UseCaseError::check_fields([
        ("email", email.as_ref().map(|_| ()).map_err(Clone::clone)),
        ("user_name", user_name.as_ref().map(|_| ()).map_err(Clone::clone)),
        ("workspace_name", workspace_name.as_ref().map(|_| ()).map_err(Clone::clone)),
        ("password", password),
    ])?;

    let feature_flags = cli
        .disabled
        .into_iter()
        .fold(FeatureFlags::default(), |flags, feature| flags.with(feature, false));
    let output = env.run_mutation(
        &InitWorkspace,
        InitWorkspaceArgs {
            user_email: email?,
            user_name: user_name?,
            password: cli.password,
            workspace_name: workspace_name?,
            feature_flags,
        },
    )?;
    to_json(output)
}

#[derive(Debug, Args)]
struct LoginCli {
    #[arg(long)]
    email: EmailAddress,
    #[arg(long)]
    password: String,
}

fn login(env: &UseCaseEnv, cli: LoginCli) -> UseCaseResult<Value> {
    to_json(env.run_readonly(
        &Login,
        LoginArgs {
            email_address: cli.email,
            password: cli.password,
        },
    )?)
}

#[derive(Debug, Args)]
struct ChangePasswordCli {
    #[arg(long)]
    current_password: String,
    #[arg(long)]
    new_password: String,
}

fn change_password(env: &UseCaseEnv, cli: ChangePasswordCli) -> UseCaseResult<Value> {
    env.run_logged_in_mutation(
        &ChangePassword,
        ChangePasswordArgs {
            current_password: cli.current_password,
            new_password: cli.new_password,
        },
    )?;
    Ok(json!({ "changed": true }))
}

#[derive(Debug, Args)]
struct FeatureFlagsCli {
    #[arg(long = "enable")]
    enabled: Vec<WorkspaceFeature>,
    #[arg(long = "disable")]
    disabled: Vec<WorkspaceFeature>,
}

fn feature_flags(env: &UseCaseEnv, cli: FeatureFlagsCli) -> UseCaseResult<Value> {
    let changes = cli
        .enabled
        .into_iter()
        .map(|feature| (feature, true))
        .chain(cli.disabled.into_iter().map(|feature| (feature, false)))
        .collect();
    to_json(env.run_logged_in_mutation(&UpdateFeatureFlags, UpdateFeatureFlagsArgs { changes })?)
}

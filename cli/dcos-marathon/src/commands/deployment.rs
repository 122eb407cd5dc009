//! Deployment commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde_json::Value;
use tabled::Tabled;

use crate::marathon::{normalize_app_id, view, DeploymentView};
use crate::output::{print_json, print_message, print_output, OutputFormat};

use super::watch::{poll_until_gone, PollArgs};
use super::CommandContext;

/// Deployment commands.
#[derive(Debug, Args)]
pub struct DeploymentCommand {
    #[command(subcommand)]
    command: DeploymentSubcommand,
}

#[derive(Debug, Subcommand)]
enum DeploymentSubcommand {
    /// List deployments, optionally for one application.
    List(ListDeploymentsArgs),

    /// Roll back a deployment by starting a reverting deployment.
    Rollback(DeploymentIdArgs),

    /// Stop a deployment without reverting it.
    Stop(DeploymentIdArgs),

    /// Follow a deployment until it finishes.
    Watch(WatchDeploymentArgs),

    /// Wait until no deployment is in progress.
    Wait(WaitDeploymentsArgs),
}

#[derive(Debug, Args)]
struct ListDeploymentsArgs {
    /// Only list deployments affecting this application.
    app_id: Option<String>,
}

#[derive(Debug, Args)]
struct DeploymentIdArgs {
    /// Deployment ID.
    deployment_id: String,
}

#[derive(Debug, Args)]
struct WatchDeploymentArgs {
    /// Deployment ID.
    deployment_id: String,

    #[command(flatten)]
    poll: PollArgs,
}

#[derive(Debug, Args)]
struct WaitDeploymentsArgs {
    /// Only wait for deployments affecting this application.
    app_id: Option<String>,

    #[command(flatten)]
    poll: PollArgs,
}

impl DeploymentCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        match self.command {
            DeploymentSubcommand::List(args) => list_deployments(ctx, args).await,
            DeploymentSubcommand::Rollback(args) => rollback_deployment(ctx, args).await,
            DeploymentSubcommand::Stop(args) => stop_deployment(ctx, args).await,
            DeploymentSubcommand::Watch(args) => watch_deployment(ctx, args).await,
            DeploymentSubcommand::Wait(args) => wait_deployments(ctx, args).await,
        }
    }
}

/// Deployment row for table output.
#[derive(Debug, Clone, Tabled)]
struct DeploymentRow {
    #[tabled(rename = "APP")]
    app: String,

    #[tabled(rename = "ACTION")]
    action: String,

    #[tabled(rename = "PROGRESS")]
    progress: String,

    #[tabled(rename = "ID")]
    id: String,
}

impl From<&DeploymentView> for DeploymentRow {
    fn from(deployment: &DeploymentView) -> Self {
        let action = if deployment.current_actions.is_empty() {
            "-".to_string()
        } else {
            deployment
                .current_actions
                .iter()
                .map(|a| match a.app.as_deref() {
                    Some(app) => format!("{} {}", action_label(&a.action), app),
                    None => action_label(&a.action).to_string(),
                })
                .collect::<Vec<_>>()
                .join(", ")
        };

        Self {
            app: deployment.affected_apps.join(", "),
            action,
            progress: format!("{}/{}", deployment.current_step, deployment.total_steps),
            id: deployment.id.clone(),
        }
    }
}

/// Short label for a Marathon deployment action.
fn action_label(action: &str) -> &str {
    match action {
        "StartApplication" => "start",
        "StopApplication" => "stop",
        "ScaleApplication" => "scale",
        "RestartApplication" => "restart",
        "ResolveArtifacts" => "artifacts",
        other => other,
    }
}

/// Whether a deployment touches `app_id` (already normalised).
fn affects_app(deployment: &Value, app_id: &str) -> bool {
    deployment
        .get("affectedApps")
        .and_then(Value::as_array)
        .is_some_and(|apps| apps.iter().any(|a| a.as_str() == Some(app_id)))
}

fn has_id(deployment: &Value, deployment_id: &str) -> bool {
    deployment.get("id").and_then(Value::as_str) == Some(deployment_id)
}

/// List deployments.
async fn list_deployments(ctx: CommandContext, args: ListDeploymentsArgs) -> Result<()> {
    let client = ctx.client()?;
    let mut deployments = client.get_deployments().await?;

    if let Some(app_id) = args.app_id.as_deref().map(normalize_app_id) {
        deployments.retain(|d| affects_app(d, &app_id));
    }

    let views = deployments
        .iter()
        .map(view::<DeploymentView>)
        .collect::<Result<Vec<_>, _>>()?;
    let rows: Vec<DeploymentRow> = views.iter().map(DeploymentRow::from).collect();

    print_output(&rows, &deployments, ctx.format);
    Ok(())
}

/// Roll back a deployment.
async fn rollback_deployment(ctx: CommandContext, args: DeploymentIdArgs) -> Result<()> {
    let client = ctx.client()?;
    let response = client.rollback_deployment(&args.deployment_id).await?;
    print_json(&response);
    Ok(())
}

/// Stop a deployment.
async fn stop_deployment(ctx: CommandContext, args: DeploymentIdArgs) -> Result<()> {
    let client = ctx.client()?;
    let response = client.stop_deployment(&args.deployment_id).await?;
    if ctx.format == OutputFormat::Json && !response.is_null() {
        print_json(&response);
    }
    Ok(())
}

/// Follow one deployment until it is gone.
async fn watch_deployment(ctx: CommandContext, args: WatchDeploymentArgs) -> Result<()> {
    let client = ctx.client()?;
    let format = ctx.format;
    let deployment_id = args.deployment_id;

    poll_until_gone(
        &client,
        &args.poll,
        |d| has_id(d, &deployment_id),
        |pending| {
            for deployment in pending {
                match format {
                    OutputFormat::Json => print_json(deployment),
                    OutputFormat::Table => {
                        if let Ok(v) = view::<DeploymentView>(deployment) {
                            let row = DeploymentRow::from(&v);
                            print_message(&format!("{} {} {}", row.id, row.progress, row.action));
                        }
                    }
                }
            }
        },
        format!(
            "Timed out after {}s waiting for deployment '{}'",
            args.poll.timeout, deployment_id
        ),
    )
    .await
}

/// Wait until no deployment (affecting the app, if given) remains.
async fn wait_deployments(ctx: CommandContext, args: WaitDeploymentsArgs) -> Result<()> {
    let client = ctx.client()?;
    let app_id = args.app_id.as_deref().map(normalize_app_id);

    poll_until_gone(
        &client,
        &args.poll,
        |d| app_id.as_deref().is_none_or(|app_id| affects_app(d, app_id)),
        |_| {},
        format!(
            "Timed out after {}s waiting for deployments to finish",
            args.poll.timeout
        ),
    )
    .await
}

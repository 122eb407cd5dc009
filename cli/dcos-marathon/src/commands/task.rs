//! Task commands.

use std::collections::BTreeSet;

use anyhow::Result;
use clap::{Args, Subcommand};
use serde_json::Value;
use tabled::Tabled;

use crate::error::CliError;
use crate::marathon::{normalize_app_id, view, DeploymentResult, TaskView};
use crate::output::{display_option, print_json, print_message, print_output, OutputFormat};

use super::CommandContext;

/// Task commands.
#[derive(Debug, Args)]
pub struct TaskCommand {
    #[command(subcommand)]
    command: TaskSubcommand,
}

#[derive(Debug, Subcommand)]
enum TaskSubcommand {
    /// List tasks, optionally for one application.
    List(ListTasksArgs),

    /// Show a task.
    Show(TaskIdArgs),

    /// Stop a task.
    Stop(StopTaskArgs),

    /// Kill one or more tasks.
    Kill(KillTasksArgs),
}

#[derive(Debug, Args)]
struct ListTasksArgs {
    /// Only list tasks of this application.
    app_id: Option<String>,
}

#[derive(Debug, Args)]
struct TaskIdArgs {
    /// Task ID.
    task_id: String,
}

#[derive(Debug, Args)]
struct StopTaskArgs {
    /// Task ID.
    task_id: String,

    /// Also remove the task's persistent volumes and reservations.
    #[arg(long)]
    wipe: bool,
}

#[derive(Debug, Args)]
struct KillTasksArgs {
    /// Task IDs.
    #[arg(required = true)]
    task_ids: Vec<String>,

    /// Scale the owning applications down by the number of killed tasks.
    #[arg(long)]
    scale: bool,

    /// Also remove the tasks' persistent volumes and reservations.
    #[arg(long)]
    wipe: bool,
}

impl TaskCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        match self.command {
            TaskSubcommand::List(args) => list_tasks(ctx, args).await,
            TaskSubcommand::Show(args) => show_task(ctx, args).await,
            TaskSubcommand::Stop(args) => stop_task(ctx, args).await,
            TaskSubcommand::Kill(args) => kill_tasks(ctx, args).await,
        }
    }
}

/// Task row for table output.
#[derive(Debug, Clone, Tabled)]
struct TaskRow {
    #[tabled(rename = "APP")]
    app: String,

    #[tabled(rename = "HEALTHY")]
    healthy: String,

    #[tabled(rename = "STARTED")]
    started: String,

    #[tabled(rename = "HOST")]
    host: String,

    #[tabled(rename = "ID")]
    id: String,
}

impl From<&TaskView> for TaskRow {
    fn from(task: &TaskView) -> Self {
        let healthy = if task.health_check_results.is_empty() {
            "-".to_string()
        } else {
            task.health_check_results.iter().all(|r| r.alive).to_string()
        };

        Self {
            app: task.app_id.clone(),
            healthy,
            started: display_option(task.started_at.as_deref()),
            host: task.host.clone(),
            id: task.id.clone(),
        }
    }
}

fn task_id_of(task: &Value) -> Option<&str> {
    task.get("id").and_then(Value::as_str)
}

/// Keep the tasks owned by `app_id`, or all tasks when none is given.
fn filter_tasks(tasks: Vec<Value>, app_id: Option<&str>) -> Vec<Value> {
    let Some(app_id) = app_id.map(normalize_app_id) else {
        return tasks;
    };
    tasks
        .into_iter()
        .filter(|t| t.get("appId").and_then(Value::as_str) == Some(app_id.as_str()))
        .collect()
}

/// Requested ids that are absent from a kill response.
fn missing_task_ids(requested: &[String], response: &Value) -> Vec<String> {
    let killed: BTreeSet<&str> = response
        .get("tasks")
        .and_then(Value::as_array)
        .map(|tasks| tasks.iter().filter_map(task_id_of).collect())
        .unwrap_or_default();

    requested
        .iter()
        .filter(|id| !killed.contains(id.as_str()))
        .cloned()
        .collect()
}

/// List tasks.
async fn list_tasks(ctx: CommandContext, args: ListTasksArgs) -> Result<()> {
    let client = ctx.client()?;
    let tasks = filter_tasks(client.get_tasks().await?, args.app_id.as_deref());

    let views = tasks
        .iter()
        .map(view::<TaskView>)
        .collect::<Result<Vec<_>, _>>()?;
    let rows: Vec<TaskRow> = views.iter().map(TaskRow::from).collect();

    print_output(&rows, &tasks, ctx.format);
    Ok(())
}

/// Show a task.
async fn show_task(ctx: CommandContext, args: TaskIdArgs) -> Result<()> {
    let client = ctx.client()?;
    let task = client
        .get_tasks()
        .await?
        .into_iter()
        .find(|t| task_id_of(t) == Some(args.task_id.as_str()))
        .ok_or_else(|| CliError::NotFound(format!("Task '{}' does not exist", args.task_id)))?;

    print_json(&task);
    Ok(())
}

/// Stop a single task.
async fn stop_task(ctx: CommandContext, args: StopTaskArgs) -> Result<()> {
    let client = ctx.client()?;
    let response = client
        .kill_tasks(std::slice::from_ref(&args.task_id), false, args.wipe)
        .await?;

    let task = response
        .get("tasks")
        .and_then(Value::as_array)
        .and_then(|tasks| {
            tasks
                .iter()
                .find(|t| task_id_of(t) == Some(args.task_id.as_str()))
        })
        .ok_or_else(|| CliError::NotFound(format!("Task '{}' does not exist", args.task_id)))?;

    print_json(task);
    Ok(())
}

/// Kill tasks.
async fn kill_tasks(ctx: CommandContext, args: KillTasksArgs) -> Result<()> {
    let client = ctx.client()?;
    let response = client
        .kill_tasks(&args.task_ids, args.scale, args.wipe)
        .await?;

    if args.scale {
        let result: DeploymentResult = view(&response)?;
        match ctx.format {
            OutputFormat::Json => print_json(&response),
            OutputFormat::Table => {
                print_message(&format!("Started deployment: {}", result.deployment_id))
            }
        }
        return Ok(());
    }

    let missing = missing_task_ids(&args.task_ids, &response);
    if !missing.is_empty() {
        return Err(CliError::NotFound(format!(
            "Failed to kill tasks: {}",
            missing.join(", ")
        ))
        .into());
    }

    match ctx.format {
        OutputFormat::Json => print_json(&response),
        OutputFormat::Table => print_message(&format!(
            "Killed tasks: {}",
            serde_json::to_string(&args.task_ids)?
        )),
    }
    Ok(())
}

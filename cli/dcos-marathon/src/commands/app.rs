//! Application commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde_json::Value;
use tabled::Tabled;

use crate::error::CliError;
use crate::marathon::{normalize_app_id, view, AppView, DeploymentResult, MarathonClient};
use crate::output::{print_json, print_message, print_output, truncate, OutputFormat};
use crate::properties::parse_properties;
use crate::resource::{load_json, parse_json, read_stdin, Resource};

use super::CommandContext;

/// Application commands.
#[derive(Debug, Args)]
pub struct AppCommand {
    #[command(subcommand)]
    command: AppSubcommand,
}

#[derive(Debug, Subcommand)]
enum AppSubcommand {
    /// Add an application from a file, a URL, or stdin.
    Add(AddAppArgs),

    /// List applications.
    List,

    /// Show an application, optionally at a given version.
    Show(ShowAppArgs),

    /// Start an application with a number of instances.
    Start(StartAppArgs),

    /// Scale an application down to zero instances.
    Stop(AppIdArgs),

    /// Perform a rolling restart of an application.
    Restart(AppIdArgs),

    /// Update an application from properties or stdin.
    Update(UpdateAppArgs),

    /// Kill the tasks of an application.
    Kill(KillAppArgs),

    /// Remove an application.
    Remove(AppIdArgs),

    /// Inspect application versions.
    Version(VersionCommand),
}

#[derive(Debug, Args)]
struct AddAppArgs {
    /// Path or URL of the application JSON. Reads stdin when omitted.
    app_resource: Option<String>,

    /// Override a running deployment.
    #[arg(long)]
    force: bool,
}

#[derive(Debug, Args)]
struct ShowAppArgs {
    /// Application ID.
    app_id: String,

    /// ISO-8601 version, or a non-positive offset (-1 is the previous version).
    #[arg(long, allow_hyphen_values = true)]
    app_version: Option<String>,
}

#[derive(Debug, Args)]
struct StartAppArgs {
    /// Application ID.
    app_id: String,

    /// Number of instances to start.
    #[arg(allow_hyphen_values = true)]
    instances: Option<String>,

    /// Override a running deployment.
    #[arg(long)]
    force: bool,
}

#[derive(Debug, Args)]
struct AppIdArgs {
    /// Application ID.
    app_id: String,

    /// Override a running deployment.
    #[arg(long)]
    force: bool,
}

#[derive(Debug, Args)]
struct UpdateAppArgs {
    /// Application ID.
    app_id: String,

    /// Properties in KEY=VALUE form. Reads a JSON document from stdin when omitted.
    properties: Vec<String>,

    /// Override a running deployment.
    #[arg(long)]
    force: bool,
}

#[derive(Debug, Args)]
struct KillAppArgs {
    /// Application ID.
    app_id: String,

    /// Scale the application down by the number of killed tasks.
    #[arg(long)]
    scale: bool,

    /// Only kill tasks running on this host.
    #[arg(long)]
    host: Option<String>,
}

/// Application version commands.
#[derive(Debug, Args)]
struct VersionCommand {
    #[command(subcommand)]
    command: VersionSubcommand,
}

#[derive(Debug, Subcommand)]
enum VersionSubcommand {
    /// List the versions of an application, newest first.
    List(ListVersionsArgs),
}

#[derive(Debug, Args)]
struct ListVersionsArgs {
    /// Application ID.
    app_id: String,

    /// Maximum number of versions to list.
    #[arg(long, allow_hyphen_values = true)]
    max_count: Option<i64>,
}

impl AppCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        match self.command {
            AppSubcommand::Add(args) => add_app(ctx, args).await,
            AppSubcommand::List => list_apps(ctx).await,
            AppSubcommand::Show(args) => show_app(ctx, args).await,
            AppSubcommand::Start(args) => start_app(ctx, args).await,
            AppSubcommand::Stop(args) => stop_app(ctx, args).await,
            AppSubcommand::Restart(args) => restart_app(ctx, args).await,
            AppSubcommand::Update(args) => update_app(ctx, args).await,
            AppSubcommand::Kill(args) => kill_app(ctx, args).await,
            AppSubcommand::Remove(args) => remove_app(ctx, args).await,
            AppSubcommand::Version(cmd) => match cmd.command {
                VersionSubcommand::List(args) => list_versions(ctx, args).await,
            },
        }
    }
}

/// Application row for table output.
#[derive(Debug, Clone, Tabled)]
struct AppRow {
    #[tabled(rename = "ID")]
    id: String,

    #[tabled(rename = "MEM")]
    mem: String,

    #[tabled(rename = "CPUS")]
    cpus: String,

    #[tabled(rename = "TASKS")]
    tasks: String,

    #[tabled(rename = "HEALTH")]
    health: String,

    #[tabled(rename = "DEPLOYMENT")]
    deployment: String,

    #[tabled(rename = "CMD")]
    cmd: String,
}

impl From<&AppView> for AppRow {
    fn from(app: &AppView) -> Self {
        let health = if app.health_checks.is_empty() {
            "-".to_string()
        } else {
            format!(
                "{}/{}",
                app.tasks_healthy,
                app.tasks_healthy + app.tasks_unhealthy
            )
        };
        let deployment = match app.deployments.as_slice() {
            [] => "-".to_string(),
            [only] => only.id.clone(),
            many => format!("{} deployments", many.len()),
        };
        let cmd = app
            .cmd
            .clone()
            .or_else(|| {
                app.container
                    .as_ref()
                    .and_then(|c| c.pointer("/docker/image"))
                    .and_then(Value::as_str)
                    .map(|image| format!("docker: {}", image))
            })
            .unwrap_or_else(|| "-".to_string());

        Self {
            id: app.id.clone(),
            mem: format!("{}", app.mem),
            cpus: format!("{}", app.cpus),
            tasks: format!("{}/{}", app.tasks_running, app.instances),
            health,
            deployment,
            cmd: truncate(&cmd, 40),
        }
    }
}

/// A parsed `--app-version` value.
#[derive(Debug, Clone, PartialEq, Eq)]
enum AppVersion {
    /// An ISO-8601 timestamp, validated by Marathon.
    Absolute(String),
    /// Index into the version history, newest first.
    Relative(usize),
}

impl AppVersion {
    fn parse(raw: &str) -> Result<Self, CliError> {
        match raw.trim().parse::<i64>() {
            Ok(value) if value > 0 => Err(CliError::usage(format!(
                "Relative versions must be negative: {}",
                raw
            ))),
            Ok(value) => Ok(Self::Relative(value.unsigned_abs() as usize)),
            Err(_) => Ok(Self::Absolute(raw.to_string())),
        }
    }
}

/// Pick the relative version out of a newest-first history.
fn select_relative_version(
    app_id: &str,
    versions: &[String],
    offset: usize,
) -> Result<String, CliError> {
    versions.get(offset).cloned().ok_or_else(|| {
        CliError::usage(format!(
            "Application '{}' only has {} version(s).",
            app_id,
            versions.len()
        ))
    })
}

fn parse_instances(raw: Option<&str>) -> Result<i64, CliError> {
    let Some(raw) = raw else {
        return Ok(1);
    };
    match raw.trim().parse::<i64>() {
        Ok(count) if count > 0 => Ok(count),
        _ => Err(CliError::usage(format!("Error parsing instances: {}", raw))),
    }
}

fn validate_max_count(max_count: Option<i64>) -> Result<Option<usize>, CliError> {
    match max_count {
        None => Ok(None),
        Some(count) if count > 0 => Ok(Some(count as usize)),
        Some(count) => Err(CliError::usage(format!(
            "Maximum count must be a positive number: {}",
            count
        ))),
    }
}

fn already_exists(app_id: &str) -> CliError {
    CliError::Conflict(format!("Application '{}' already exists", app_id))
}

/// Print the outcome of a change that started a deployment.
fn print_deployment(response: &Value, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(response),
        OutputFormat::Table => {
            let result: DeploymentResult = view(response)?;
            print_message(&format!("Created deployment {}", result.deployment_id));
        }
    }
    Ok(())
}

/// Add a new application.
async fn add_app(ctx: CommandContext, args: AddAppArgs) -> Result<()> {
    let resource = Resource::from_arg(args.app_resource.as_deref());
    let app = load_json(
        resource,
        ctx.config.timeout(),
        "dcos marathon app add < app_resource.json",
    )
    .await?;

    let app_id = app
        .get("id")
        .and_then(Value::as_str)
        .map(normalize_app_id)
        .ok_or_else(|| CliError::input("Application JSON must contain an 'id' field"))?;

    let client = ctx.client()?;
    match client.get_app(&app_id).await {
        Ok(_) => return Err(already_exists(&app_id).into()),
        Err(CliError::Api { status: 404, .. }) => {}
        Err(other) => return Err(other.into()),
    }

    let response = client.add_app(&app, args.force).await?;

    match ctx.format {
        OutputFormat::Json => print_json(&response),
        OutputFormat::Table => {
            let created: AppView = view(&response)?;
            if let Some(deployment) = created.deployments.first() {
                print_message(&format!("Created deployment {}", deployment.id));
            }
        }
    }
    Ok(())
}

/// List all applications.
async fn list_apps(ctx: CommandContext) -> Result<()> {
    let client = ctx.client()?;
    let apps = client.get_apps().await?;

    let views = apps
        .iter()
        .map(view::<AppView>)
        .collect::<Result<Vec<_>, _>>()?;
    let rows: Vec<AppRow> = views.iter().map(AppRow::from).collect();

    print_output(&rows, &apps, ctx.format);
    Ok(())
}

/// Show an application, optionally at a given version.
async fn show_app(ctx: CommandContext, args: ShowAppArgs) -> Result<()> {
    let version = args.app_version.as_deref().map(AppVersion::parse).transpose()?;
    let client = ctx.client()?;

    let app = match version {
        None => client.get_app(&args.app_id).await?,
        Some(AppVersion::Absolute(version)) => {
            client.get_app_version(&args.app_id, &version).await?
        }
        Some(AppVersion::Relative(offset)) => {
            let versions = client.get_app_versions(&args.app_id).await?;
            let version = select_relative_version(&args.app_id, &versions, offset)?;
            client.get_app_version(&args.app_id, &version).await?
        }
    };

    print_json(&app);
    Ok(())
}

/// Start an application.
async fn start_app(ctx: CommandContext, args: StartAppArgs) -> Result<()> {
    let instances = parse_instances(args.instances.as_deref())?;
    let client = ctx.client()?;

    let app: AppView = view(&client.get_app(&args.app_id).await?)?;
    if app.instances > 0 {
        return Err(CliError::Refused(format!(
            "Application '{}' already started: {} instances.",
            args.app_id, app.instances
        ))
        .into());
    }

    let response = client.scale_app(&args.app_id, instances, args.force).await?;
    print_deployment(&response, ctx.format)
}

/// Stop an application.
async fn stop_app(ctx: CommandContext, args: AppIdArgs) -> Result<()> {
    let client = ctx.client()?;

    let app: AppView = view(&client.get_app(&args.app_id).await?)?;
    if app.instances <= 0 {
        return Err(CliError::Refused(format!(
            "Application '{}' already stopped: {} instances.",
            args.app_id, app.instances
        ))
        .into());
    }

    let response = client.scale_app(&args.app_id, 0, args.force).await?;
    print_deployment(&response, ctx.format)
}

/// Rolling restart of an application.
async fn restart_app(ctx: CommandContext, args: AppIdArgs) -> Result<()> {
    let client = ctx.client()?;

    let app: AppView = view(&client.get_app(&args.app_id).await?)?;
    if app.tasks_running <= 0 {
        return Err(CliError::Refused(format!(
            "Unable to perform rolling restart of application '{}' because it has no running tasks",
            normalize_app_id(&args.app_id)
        ))
        .into());
    }

    let response = client.restart_app(&args.app_id, args.force).await?;
    print_deployment(&response, ctx.format)
}

/// Update an application.
async fn update_app(ctx: CommandContext, args: UpdateAppArgs) -> Result<()> {
    let client = ctx.client()?;

    // A missing app should fail before stdin is consumed
    client.get_app(&args.app_id).await?;

    let payload = if args.properties.is_empty() {
        let contents = read_stdin("dcos marathon app update your-app-id < app_update.json")?;
        parse_json(&contents)?
    } else {
        Value::Object(parse_properties(&args.properties)?)
    };

    let response = client.update_app(&args.app_id, &payload, args.force).await?;
    print_deployment(&response, ctx.format)
}

/// Kill the tasks of an application.
async fn kill_app(ctx: CommandContext, args: KillAppArgs) -> Result<()> {
    let client = ctx.client()?;
    let response = client
        .kill_app_tasks(&args.app_id, args.scale, args.host.as_deref())
        .await?;

    match ctx.format {
        OutputFormat::Json => print_json(&response),
        OutputFormat::Table if args.scale => {
            print_message(&format!(
                "Started deployment: {}",
                serde_json::to_string(&response)?
            ));
        }
        OutputFormat::Table => {
            let ids: Vec<&str> = response
                .get("tasks")
                .and_then(Value::as_array)
                .map(|tasks| {
                    tasks
                        .iter()
                        .filter_map(|t| t.get("id").and_then(Value::as_str))
                        .collect()
                })
                .unwrap_or_default();
            print_message(&format!("Killed tasks: {}", serde_json::to_string(&ids)?));
        }
    }
    Ok(())
}

/// Remove an application.
async fn remove_app(ctx: CommandContext, args: AppIdArgs) -> Result<()> {
    let client = ctx.client()?;
    let response = client.remove_app(&args.app_id, args.force).await?;
    print_deployment(&response, ctx.format)
}

/// List application versions.
async fn list_versions(ctx: CommandContext, args: ListVersionsArgs) -> Result<()> {
    let max_count = validate_max_count(args.max_count)?;
    let client = ctx.client()?;

    let mut versions = client.get_app_versions(&args.app_id).await?;
    if let Some(max_count) = max_count {
        versions.truncate(max_count);
    }

    print_json(&versions);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("-1", AppVersion::Relative(1))]
    #[case("0", AppVersion::Relative(0))]
    #[case("-200", AppVersion::Relative(200))]
    #[case("2016-02-11T20:39:32.972Z", AppVersion::Absolute("2016-02-11T20:39:32.972Z".to_string()))]
    #[case("20:39:32.972Z", AppVersion::Absolute("20:39:32.972Z".to_string()))]
    fn parses_app_versions(#[case] raw: &str, #[case] expected: AppVersion) {
        assert_eq!(AppVersion::parse(raw).unwrap(), expected);
    }

    #[test]
    fn positive_relative_version_is_rejected() {
        let err = AppVersion::parse("2").unwrap_err();
        assert_eq!(err.to_string(), "Relative versions must be negative: 2");
    }

    #[test]
    fn relative_version_indexes_newest_first() {
        let versions = vec!["v3".to_string(), "v2".to_string(), "v1".to_string()];
        assert_eq!(select_relative_version("a", &versions, 0).unwrap(), "v3");
        assert_eq!(select_relative_version("a", &versions, 1).unwrap(), "v2");

        let err = select_relative_version("zero-instance-app", &versions, 200).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Application 'zero-instance-app' only has 3 version(s)."
        );
    }

    #[rstest]
    #[case(None, Some(1))]
    #[case(Some("100"), Some(100))]
    #[case(Some("0"), None)]
    #[case(Some("-3"), None)]
    #[case(Some("many"), None)]
    fn parses_instances(#[case] raw: Option<&str>, #[case] expected: Option<i64>) {
        assert_eq!(parse_instances(raw).ok(), expected);
    }

    #[test]
    fn max_count_must_be_positive() {
        assert_eq!(validate_max_count(None).unwrap(), None);
        assert_eq!(validate_max_count(Some(3)).unwrap(), Some(3));
        let err = validate_max_count(Some(-1)).unwrap_err();
        assert_eq!(err.to_string(), "Maximum count must be a positive number: -1");
    }

    #[test]
    fn existing_app_is_a_conflict() {
        let err = already_exists("/zero-instance-app");
        assert!(matches!(err, CliError::Conflict(_)));
        assert_eq!(err.to_string(), "Application '/zero-instance-app' already exists");
    }

    #[test]
    fn app_row_summarizes_state() {
        let app: AppView = view(&json!({
            "id": "/zero-instance-app",
            "instances": 3,
            "cpus": 0.1,
            "mem": 16.0,
            "cmd": "sleep 1000",
            "tasksRunning": 2,
            "tasksHealthy": 1,
            "tasksUnhealthy": 1,
            "healthChecks": [{ "protocol": "COMMAND" }],
            "deployments": [{ "id": "d-1" }]
        }))
        .unwrap();
        let row = AppRow::from(&app);
        assert_eq!(row.tasks, "2/3");
        assert_eq!(row.health, "1/2");
        assert_eq!(row.deployment, "d-1");
        assert_eq!(row.cmd, "sleep 1000");
    }

    #[test]
    fn app_row_falls_back_to_docker_image() {
        let app: AppView = view(&json!({
            "id": "/web",
            "container": { "docker": { "image": "nginx:1.25" } }
        }))
        .unwrap();
        let row = AppRow::from(&app);
        assert_eq!(row.cmd, "docker: nginx:1.25");
        assert_eq!(row.health, "-");
        assert_eq!(row.deployment, "-");
    }
}

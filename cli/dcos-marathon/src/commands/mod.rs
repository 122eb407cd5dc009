//! CLI commands.

mod about;
mod app;
mod config;
mod deployment;
mod leader;
mod ping;
mod task;
mod watch;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::client::ApiClient;
use crate::config::Config;
use crate::marathon::MarathonClient;
use crate::output::OutputFormat;

/// Printed by `--info`.
pub const INFO: &str = "Deploy and manage applications to DC/OS";

/// Deploy and manage applications to DC/OS.
#[derive(Debug, Parser)]
#[command(name = "dcos-marathon")]
#[command(author, about, long_about = None)]
#[command(disable_version_flag = true, arg_required_else_help = true)]
pub struct Cli {
    /// Print the raw JSON returned by Marathon.
    #[arg(long, global = true)]
    json: bool,

    /// Marathon URL (overrides `marathon.url`).
    #[arg(long, global = true, env = "DCOS_MARATHON_URL")]
    url: Option<String>,

    /// Path to the configuration file.
    #[arg(long, global = true, env = "DCOS_MARATHON_CONFIG")]
    config: Option<PathBuf>,

    /// Print version information.
    #[arg(long)]
    version: bool,

    /// Print a short description of this subcommand.
    #[arg(long)]
    info: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Manage applications.
    App(app::AppCommand),

    /// Manage tasks.
    Task(task::TaskCommand),

    /// Manage deployments.
    Deployment(deployment::DeploymentCommand),

    /// Show or abdicate the Marathon leader.
    Leader(leader::LeaderCommand),

    /// Check that Marathon is reachable.
    Ping,

    /// Print information about the Marathon instance.
    About,

    /// Show or edit CLI configuration.
    Config(config::ConfigCommand),
}

impl Cli {
    /// Run the CLI command.
    pub async fn run(self) -> Result<()> {
        if self.version {
            println!("dcos-marathon version {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        if self.info {
            println!("{}", INFO);
            return Ok(());
        }

        let Some(command) = self.command else {
            return Err(crate::error::CliError::usage(
                "Missing command. Run `dcos-marathon --help` for usage.",
            )
            .into());
        };

        let config = Config::load(self.config.as_deref())?;

        let ctx = CommandContext {
            config,
            url: self.url,
            format: OutputFormat::from_json_flag(self.json),
        };

        match command {
            Commands::App(cmd) => cmd.run(ctx).await,
            Commands::Task(cmd) => cmd.run(ctx).await,
            Commands::Deployment(cmd) => cmd.run(ctx).await,
            Commands::Leader(cmd) => cmd.run(ctx).await,
            Commands::Ping => ping::run(ctx).await,
            Commands::About => about::run(ctx).await,
            Commands::Config(cmd) => cmd.run(ctx),
        }
    }
}

/// Shared command context.
pub struct CommandContext {
    pub config: Config,
    pub url: Option<String>,
    pub format: OutputFormat,
}

impl CommandContext {
    /// Get a Marathon client for the configured endpoint.
    pub fn client(&self) -> Result<MarathonClient> {
        let api = ApiClient::new(&self.config, self.url.as_deref())?;
        Ok(MarathonClient::new(api))
    }
}

//! Config commands (stored Marathon URL, timeout and token).

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::config::Config;
use crate::output::{print_json, print_message, OutputFormat};

use super::CommandContext;

/// Show or edit the stored configuration.
#[derive(Debug, Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Debug, Subcommand)]
enum ConfigSubcommand {
    /// Show the effective configuration.
    Show,

    /// Print the stored value of a configuration key.
    Get(KeyArgs),

    /// Set a configuration key.
    Set(SetArgs),

    /// Remove a configuration key.
    Unset(KeyArgs),
}

#[derive(Debug, Args)]
struct SetArgs {
    /// One of marathon.url, marathon.timeout, core.dcos_acs_token.
    key: String,

    /// New value.
    value: String,
}

#[derive(Debug, Args)]
struct KeyArgs {
    /// One of marathon.url, marathon.timeout, core.dcos_acs_token.
    key: String,
}

#[derive(Debug, Serialize)]
struct ConfigView {
    path: Option<String>,
    #[serde(rename = "marathon.url")]
    marathon_url: String,
    #[serde(rename = "marathon.timeout")]
    marathon_timeout: u64,
    #[serde(rename = "core.dcos_acs_token")]
    dcos_acs_token: Option<&'static str>,
}

impl ConfigCommand {
    pub fn run(self, ctx: CommandContext) -> Result<()> {
        match self.command {
            ConfigSubcommand::Show => show(ctx),
            ConfigSubcommand::Get(args) => get(ctx, args),
            ConfigSubcommand::Set(args) => set(ctx, args),
            ConfigSubcommand::Unset(args) => unset(ctx, args),
        }
    }
}

fn view_of(config: &Config, url_override: Option<&str>) -> ConfigView {
    ConfigView {
        path: config.path().map(|p| p.display().to_string()),
        marathon_url: config.marathon_url(url_override).to_string(),
        marathon_timeout: config.timeout().as_secs(),
        dcos_acs_token: config.token().map(|_| "********"),
    }
}

fn show(ctx: CommandContext) -> Result<()> {
    let view = view_of(&ctx.config, ctx.url.as_deref());

    match ctx.format {
        OutputFormat::Json => print_json(&view),
        OutputFormat::Table => {
            println!("path: {}", view.path.as_deref().unwrap_or("-"));
            println!("marathon.url: {}", view.marathon_url);
            println!("marathon.timeout: {}", view.marathon_timeout);
            println!("core.dcos_acs_token: {}", view.dcos_acs_token.unwrap_or("-"));
        }
    }

    Ok(())
}

fn get(ctx: CommandContext, args: KeyArgs) -> Result<()> {
    let value = ctx.config.get(&args.key)?;

    match ctx.format {
        OutputFormat::Json => print_json(&serde_json::json!({ "key": args.key, "value": value })),
        OutputFormat::Table => print_message(value.as_deref().unwrap_or("-")),
    }
    Ok(())
}

fn set(mut ctx: CommandContext, args: SetArgs) -> Result<()> {
    ctx.config.set(&args.key, &args.value)?;
    ctx.config.save()?;

    match ctx.format {
        OutputFormat::Json => print_json(&serde_json::json!({ "ok": true, "key": args.key })),
        OutputFormat::Table => print_message(&format!("Set '{}'", args.key)),
    }
    Ok(())
}

fn unset(mut ctx: CommandContext, args: KeyArgs) -> Result<()> {
    ctx.config.unset(&args.key)?;
    ctx.config.save()?;

    match ctx.format {
        OutputFormat::Json => print_json(&serde_json::json!({ "ok": true, "key": args.key })),
        OutputFormat::Table => print_message(&format!("Removed '{}'", args.key)),
    }
    Ok(())
}

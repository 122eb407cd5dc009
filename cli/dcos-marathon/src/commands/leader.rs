//! Leader commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use serde_json::Value;
use tabled::Tabled;

use crate::error::CliError;
use crate::output::{display_option, print_json, print_message, render_table, OutputFormat};

use super::CommandContext;

/// Leader commands.
#[derive(Debug, Args)]
pub struct LeaderCommand {
    #[command(subcommand)]
    command: LeaderSubcommand,
}

#[derive(Debug, Subcommand)]
enum LeaderSubcommand {
    /// Show the current leader.
    Show,

    /// Make the current leader abdicate.
    Delete,
}

impl LeaderCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        match self.command {
            LeaderSubcommand::Show => show_leader(ctx).await,
            LeaderSubcommand::Delete => delete_leader(ctx).await,
        }
    }
}

/// Leader as printed; `ip` is null when the host does not resolve.
#[derive(Debug, Clone, Serialize)]
struct Leader {
    host: String,
    ip: Option<String>,
}

#[derive(Debug, Clone, Tabled)]
struct LeaderRow {
    #[tabled(rename = "HOST")]
    host: String,

    #[tabled(rename = "IP")]
    ip: String,
}

/// Split a `host:port` leader address.
fn split_leader(leader: &str) -> Result<(&str, u16), CliError> {
    let invalid = || CliError::Other(anyhow::anyhow!("Unexpected leader address: '{}'", leader));
    let (host, port) = leader.rsplit_once(':').ok_or_else(invalid)?;
    let port = port.parse().map_err(|_| invalid())?;
    Ok((host, port))
}

async fn resolve_ip(host: &str, port: u16) -> Option<String> {
    let mut addrs = tokio::net::lookup_host((host, port)).await.ok()?;
    addrs.next().map(|addr| addr.ip().to_string())
}

/// Show the current leader.
async fn show_leader(ctx: CommandContext) -> Result<()> {
    let client = ctx.client()?;
    let response = client.get_leader().await?;

    let leader = response
        .get("leader")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("Unexpected response from Marathon: missing 'leader'"))?;
    let (host, port) = split_leader(leader)?;

    let leader = Leader {
        host: host.to_string(),
        ip: resolve_ip(host, port).await,
    };

    match ctx.format {
        OutputFormat::Json => print_json(&leader),
        OutputFormat::Table => {
            let row = LeaderRow {
                host: leader.host.clone(),
                ip: display_option(leader.ip.as_deref()),
            };
            print_message(&render_table(&[row]));
        }
    }
    Ok(())
}

/// Abdicate the current leader.
async fn delete_leader(ctx: CommandContext) -> Result<()> {
    let client = ctx.client()?;
    let response = client.delete_leader().await?;

    match ctx.format {
        OutputFormat::Json => print_json(&response),
        OutputFormat::Table => print_message(
            response
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Leadership abdicated"),
        ),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_host_and_port() {
        assert_eq!(split_leader("marathon.mesos.:8080").unwrap(), ("marathon.mesos.", 8080));
        assert_eq!(split_leader("10.0.0.1:8443").unwrap(), ("10.0.0.1", 8443));
        assert!(split_leader("marathon.mesos").is_err());
        assert!(split_leader("marathon.mesos:http").is_err());
    }

    #[tokio::test]
    async fn resolves_literal_ip() {
        assert_eq!(resolve_ip("127.0.0.1", 8080).await.as_deref(), Some("127.0.0.1"));
    }
}

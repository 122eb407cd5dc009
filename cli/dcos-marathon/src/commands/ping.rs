//! Ping command.

use anyhow::Result;

use crate::output::{print_json, print_message, OutputFormat};

use super::CommandContext;

/// Check that Marathon answers `/ping`.
pub async fn run(ctx: CommandContext) -> Result<()> {
    let client = ctx.client()?;
    let body = client.ping().await?;
    let body = body.trim();

    match ctx.format {
        OutputFormat::Json => print_json(&serde_json::json!({ "response": body })),
        OutputFormat::Table => print_message(&format_ping(body)),
    }
    Ok(())
}

fn format_ping(body: &str) -> String {
    format!("Marathon ping response[1x]: {:?}", body)
}

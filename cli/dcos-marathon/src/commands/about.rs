//! About command.

use anyhow::Result;

use crate::output::print_json;

use super::CommandContext;

/// Print Marathon's `/v2/info` document.
pub async fn run(ctx: CommandContext) -> Result<()> {
    let client = ctx.client()?;
    let info = client.about().await?;
    print_json(&info);
    Ok(())
}

//! Deployment polling shared by `deployment watch` and `deployment wait`.

use std::time::Duration;

use anyhow::Result;
use clap::Args;
use serde_json::Value;
use tokio::time::Instant;
use tracing::debug;

use crate::marathon::MarathonClient;

/// Polling knobs.
#[derive(Debug, Clone, Args)]
pub struct PollArgs {
    /// Seconds between polls.
    #[arg(long, default_value = "1")]
    pub interval: u64,

    /// Give up after this many seconds.
    #[arg(long, default_value = "300")]
    pub timeout: u64,
}

impl PollArgs {
    fn interval(&self) -> Duration {
        Duration::from_secs(self.interval.max(1))
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

/// Poll the deployment list until `matches` selects nothing.
///
/// `on_poll` sees the matching deployments of every poll that still has some.
/// Fails with `timeout_message` once the timeout has elapsed.
pub async fn poll_until_gone<F, P>(
    client: &MarathonClient,
    args: &PollArgs,
    matches: F,
    mut on_poll: P,
    timeout_message: String,
) -> Result<()>
where
    F: Fn(&Value) -> bool,
    P: FnMut(&[Value]),
{
    let deadline = Instant::now() + args.timeout();
    let mut attempt = 0u64;

    loop {
        attempt += 1;
        let pending: Vec<Value> = client
            .get_deployments()
            .await?
            .into_iter()
            .filter(|d| matches(d))
            .collect();
        debug!(attempt, pending = pending.len(), "Polled deployments");

        if pending.is_empty() {
            return Ok(());
        }
        on_poll(&pending);

        let now = Instant::now();
        if now >= deadline {
            return Err(anyhow::anyhow!(timeout_message));
        }
        tokio::time::sleep(args.interval().min(deadline - now)).await;
    }
}

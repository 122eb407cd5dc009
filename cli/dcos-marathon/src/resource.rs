//! Loading JSON documents from a file, a URL, or standard input.

use std::io::{IsTerminal, Read};
use std::path::Path;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::error::CliError;

/// Where an application document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource<'a> {
    Path(&'a Path),
    Url(&'a str),
    Stdin,
}

impl<'a> Resource<'a> {
    /// Classify a command-line resource argument.
    pub fn from_arg(arg: Option<&'a str>) -> Self {
        match arg {
            None => Self::Stdin,
            Some(arg) if arg.starts_with("http://") || arg.starts_with("https://") => {
                Self::Url(arg)
            }
            Some(arg) => Self::Path(Path::new(arg)),
        }
    }
}

/// Load and parse a JSON document.
///
/// `tty_example` is the usage line shown when stdin is an interactive terminal.
pub async fn load_json(
    resource: Resource<'_>,
    timeout: Duration,
    tty_example: &str,
) -> Result<Value, CliError> {
    let contents = match resource {
        Resource::Path(path) => {
            debug!(path = %path.display(), "Reading resource from file");
            std::fs::read_to_string(path)
                .map_err(|_| unreadable(&path.display().to_string()))?
        }
        Resource::Url(url) => {
            debug!(url = %url, "Fetching resource over HTTP");
            fetch(url, timeout).await.ok_or_else(|| unreadable(url))?
        }
        Resource::Stdin => read_stdin(tty_example)?,
    };

    parse_json(&contents)
}

/// Read all of standard input, refusing an interactive terminal.
pub fn read_stdin(tty_example: &str) -> Result<String, CliError> {
    let mut stdin = std::io::stdin();
    if stdin.is_terminal() {
        return Err(CliError::input(format!(
            "We currently don't support reading from the TTY. Please specify an application JSON.\nE.g.: {}",
            tty_example
        )));
    }

    let mut contents = String::new();
    stdin
        .read_to_string(&mut contents)
        .map_err(|e| CliError::input(format!("Failed to read from stdin: {}", e)))?;
    Ok(contents)
}

/// Parse a JSON document with the CLI's error wording.
pub fn parse_json(contents: &str) -> Result<Value, CliError> {
    serde_json::from_str(contents)
        .map_err(|e| CliError::input(format!("Error loading JSON: {}", e)))
}

async fn fetch(url: &str, timeout: Duration) -> Option<String> {
    let client = reqwest::Client::builder().timeout(timeout).build().ok()?;
    let response = client.get(url).send().await.ok()?;
    if !response.status().is_success() {
        debug!(url = %url, status = response.status().as_u16(), "Resource fetch failed");
        return None;
    }
    response.text().await.ok()
}

fn unreadable(resource: &str) -> CliError {
    CliError::input(format!(
        "Can't read from resource: {}.\nPlease check that it exists.",
        resource
    ))
}

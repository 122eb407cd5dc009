//! Error handling and display for the CLI.

use std::io::IsTerminal;

use colored::Colorize;
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Bad or missing arguments. Raised before any request is sent.
    #[error("{0}")]
    Usage(String),

    /// Local input that could not be read or parsed.
    #[error("{0}")]
    Input(String),

    /// Marathon answered with a non-success status.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Error on request [{method} {url}]: {}", connection_cause(.source))]
    Connection {
        method: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Marathon already holds a conflicting resource.
    #[error("{0}")]
    Conflict(String),

    /// The resource is already in the requested state. Reported on stdout.
    #[error("{0}")]
    Refused(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl CliError {
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::Input(message.into())
    }

    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }
}

/// Describe why a request never got a response.
///
/// The top-level reqwest message only repeats the URL, so the cause chain
/// below it is rendered instead.
fn connection_cause(err: &reqwest::Error) -> String {
    let mut causes: Vec<String> = Vec::new();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        let text = cause.to_string();
        if !causes.contains(&text) {
            causes.push(text);
        }
        source = cause.source();
    }

    if causes.is_empty() {
        if err.is_timeout() {
            return "operation timed out".to_string();
        }
        return err.to_string();
    }
    causes.join(": ")
}

/// Follow-up hint printed under an error.
fn hint(err: &CliError) -> Option<&'static str> {
    match err {
        CliError::Api { status: 401, .. } => Some(
            "Hint: Set a valid token with `dcos-marathon config set core.dcos_acs_token <token>`.",
        ),
        CliError::Api { status: 403, .. } => {
            Some("Hint: You may not have permission for this operation.")
        }
        CliError::Connection { .. } => {
            Some("Hint: Check your network connection and the `marathon.url` setting.")
        }
        _ => None,
    }
}

/// Errors are styled only when stderr itself is a terminal.
fn stderr_color(stderr_is_terminal: bool, no_color: bool) -> bool {
    stderr_is_terminal && !no_color
}

/// Print an error in a user-friendly format.
pub fn print_error(err: &anyhow::Error) {
    let cli_err = err.downcast_ref::<CliError>();
    if let Some(CliError::Refused(message)) = cli_err {
        println!("{}", message);
        return;
    }

    colored::control::set_override(stderr_color(
        std::io::stderr().is_terminal(),
        std::env::var_os("NO_COLOR").is_some(),
    ));

    eprintln!("{}", err.to_string().red());
    if let Some(hint) = cli_err.and_then(hint) {
        eprintln!("{}", hint.yellow());
    }
}

//! Configuration management.
//!
//! Handles:
//! - Marathon endpoint configuration
//! - Request timeout
//! - DC/OS ACS token storage

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CliError;

/// Configuration file name.
const CONFIG_FILE: &str = "config.toml";

/// Marathon URL used when nothing else is configured.
pub const DEFAULT_MARATHON_URL: &str = "http://localhost:8080";

/// Per-request timeout used when nothing else is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Keys accepted by `config set` / `config unset`.
pub const CONFIG_KEYS: &[&str] = &["marathon.url", "marathon.timeout", "core.dcos_acs_token"];

/// Get the default config file path, if the platform has a config directory.
fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("io", "dcos", "dcos-marathon")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

/// CLI configuration, as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub marathon: MarathonSection,

    #[serde(default)]
    pub core: CoreSection,

    /// Where this config was loaded from and will be saved to.
    #[serde(skip)]
    path: Option<PathBuf>,
}

/// `[marathon]` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarathonSection {
    /// Marathon base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

/// `[core]` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoreSection {
    /// DC/OS authentication token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dcos_acs_token: Option<String>,
}

impl Config {
    /// Load config from `path` (or the default location), or return default.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_from(path.map(Path::to_path_buf).or_else(default_config_path))
    }

    /// Load from a resolved location. Without one, defaults apply and
    /// nothing can be saved.
    fn load_from(path: Option<PathBuf>) -> Result<Self> {
        let Some(path) = path else {
            debug!("No config directory available; using defaults");
            return Ok(Self::default());
        };

        if !path.exists() {
            return Ok(Self {
                path: Some(path),
                ..Self::default()
            });
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;

        let mut config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {:?}", path))?;
        config.path = Some(path);
        Ok(config)
    }

    /// Resolve the Marathon URL, preferring an explicit override.
    pub fn marathon_url<'a>(&'a self, url_override: Option<&'a str>) -> &'a str {
        url_override
            .or(self.marathon.url.as_deref())
            .unwrap_or(DEFAULT_MARATHON_URL)
    }

    /// Get the request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.marathon.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// Get the ACS token, if one is configured.
    pub fn token(&self) -> Option<&str> {
        self.core.dcos_acs_token.as_deref()
    }

    /// Path this config is bound to.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Read a single key as it would be displayed.
    pub fn get(&self, key: &str) -> Result<Option<String>, CliError> {
        match key {
            "marathon.url" => Ok(self.marathon.url.clone()),
            "marathon.timeout" => Ok(self.marathon.timeout.map(|t| t.to_string())),
            "core.dcos_acs_token" => Ok(self.core.dcos_acs_token.clone()),
            other => Err(unknown_key(other)),
        }
    }

    /// Set a single key.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), CliError> {
        match key {
            "marathon.url" => {
                let value = value.trim();
                if !value.starts_with("http://") && !value.starts_with("https://") {
                    return Err(CliError::usage(format!(
                        "Invalid value for 'marathon.url': '{}' must start with http:// or https://",
                        value
                    )));
                }
                self.marathon.url = Some(value.trim_end_matches('/').to_string());
            }
            "marathon.timeout" => {
                let timeout: u64 = value.trim().parse().map_err(|_| {
                    CliError::usage(format!(
                        "Invalid value for 'marathon.timeout': '{}' is not a number of seconds",
                        value
                    ))
                })?;
                if timeout == 0 {
                    return Err(CliError::usage(
                        "Invalid value for 'marathon.timeout': must be greater than zero",
                    ));
                }
                self.marathon.timeout = Some(timeout);
            }
            "core.dcos_acs_token" => self.core.dcos_acs_token = Some(value.to_string()),
            other => return Err(unknown_key(other)),
        }
        Ok(())
    }

    /// Remove a single key.
    pub fn unset(&mut self, key: &str) -> Result<(), CliError> {
        match key {
            "marathon.url" => self.marathon.url = None,
            "marathon.timeout" => self.marathon.timeout = None,
            "core.dcos_acs_token" => self.core.dcos_acs_token = None,
            other => return Err(unknown_key(other)),
        }
        Ok(())
    }

    /// Save config to disk.
    pub fn save(&self) -> Result<()> {
        let path = self.path.clone().or_else(default_config_path).ok_or_else(|| {
            anyhow::anyhow!("Could not determine config directory; pass --config <path>")
        })?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory {:?}", dir))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        // The file may hold a token; keep it private on Unix
        #[cfg(unix)]
        {
            use std::io::Write;
            use std::os::unix::fs::OpenOptionsExt;

            let mut file = fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&path)
                .with_context(|| format!("Failed to write config to {:?}", path))?;
            file.write_all(contents.as_bytes())?;
        }

        #[cfg(not(unix))]
        {
            fs::write(&path, contents)
                .with_context(|| format!("Failed to write config to {:?}", path))?;
        }

        Ok(())
    }
}

fn unknown_key(key: &str) -> CliError {
    CliError::usage(format!(
        "Unknown configuration key '{}'. Valid keys: {}",
        key,
        CONFIG_KEYS.join(", ")
    ))
}

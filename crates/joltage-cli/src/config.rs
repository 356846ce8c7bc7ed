//! Configuration file loading and logging initialization.
//!
//! The file is TOML with optional `[solver]` and `[logging]` tables. Command
//! line flags are applied on top of whatever the file sets.

use std::path::Path;

use anyhow::Context;
use joltage_solver::SolverConfig;
use serde::Deserialize;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub solver: SolverConfig,
    pub logging: LoggingConfig,
    /// Worker threads for `solve`; defaults to the number of CPUs
    pub threads: Option<usize>,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl LoggingConfig {
    /// Installs the global subscriber. `RUST_LOG` takes precedence over `level`.
    /// Logs go to stderr so stdout stays machine-readable.
    pub fn init(&self) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));

        match self.format.as_str() {
            "json" => {
                fmt().json().with_env_filter(filter).with_writer(std::io::stderr).init();
            }
            _ => {
                fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
            }
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            format: "pretty".into(),
        }
    }
}

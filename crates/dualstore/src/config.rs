use std::{env, fmt, str::FromStr};

use dualstore_core::migration::{ConfigError, Flag, MigrationConfig};

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Pretty => f.write_str("pretty"),
            LogFormat::Json => f.write_str("json"),
        }
    }
}

/// Startup configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Migration phase to start in (default: 1)
    pub phase: u8,
    /// Overrides the phase's validation flag when set
    pub validation: Option<bool>,
    /// Log output format (default: pretty)
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `MIGRATION_PHASE` - Starting phase, 1 through 5 (default: 1)
    /// - `MIGRATION_VALIDATION` - `true` or `false` to override validation
    /// - `LOG_FORMAT` - `pretty` or `json` (default: pretty)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Unparseable values fall back to their defaults.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            phase: lookup("MIGRATION_PHASE")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(1),
            validation: lookup("MIGRATION_VALIDATION").and_then(|v| v.trim().parse().ok()),
            log_format: lookup("LOG_FORMAT")
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
        }
    }

    /// Moves `flags` to the configured phase, then applies the validation
    /// override.
    pub fn apply(&self, flags: &MigrationConfig) -> Result<(), ConfigError> {
        flags.set_migration_phase(self.phase)?;
        if let Some(validation) = self.validation {
            flags.set_flag(Flag::ValidationEnabled, validation)?;
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            phase: 1,
            validation: None,
            log_format: LogFormat::Pretty,
        }
    }
}

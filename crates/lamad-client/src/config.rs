//! Configuration for the lamad demo binary
//!
//! CLI arguments with environment variable fallbacks using clap.

use std::time::Duration;

use clap::Parser;
use lamad_sync::SyncConfig;
use thiserror::Error;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("LAMAD_LOG_LEVEL must be one of trace, debug, info, warn, error (got {0})")]
    InvalidLogLevel(String),

    #[error("LAMAD_LOAD_TIMEOUT_MS must be greater than zero")]
    ZeroTimeout,

    #[error("LAMAD_JWT_SECRET must not be empty when set")]
    EmptyJwtSecret,

    #[error("LAMAD_TOPIC must not be empty")]
    EmptyTopic,
}

/// Lamad - learning path progress client
#[derive(Parser, Debug, Clone)]
#[command(name = "lamad")]
#[command(about = "Generate a learning path and walk through its steps")]
pub struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LAMAD_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LAMAD_LOG_JSON", default_value = "false")]
    pub log_json: bool,

    /// Loader timeout in milliseconds
    #[arg(long, env = "LAMAD_LOAD_TIMEOUT_MS", default_value = "30000")]
    pub load_timeout_ms: u64,

    /// HS256 secret; when set, tokens are verified as JWTs
    #[arg(long, env = "LAMAD_JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// Topic to generate a path for
    #[arg(long, env = "LAMAD_TOPIC", default_value = "Rust programming")]
    pub topic: String,

    /// Subject id of the demo learner
    #[arg(long, env = "LAMAD_USER", default_value = "demo-learner")]
    pub user: String,
}

impl Args {
    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            load_timeout: self.load_timeout(),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.log_level.clone()));
        }

        if self.load_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        if matches!(self.jwt_secret.as_deref(), Some(s) if s.trim().is_empty()) {
            return Err(ConfigError::EmptyJwtSecret);
        }

        if self.topic.trim().is_empty() {
            return Err(ConfigError::EmptyTopic);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["lamad"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn test_defaults() {
        let args = args(&[]);
        assert_eq!(args.load_timeout(), Duration::from_secs(30));
        assert_eq!(args.sync_config().load_timeout, Duration::from_secs(30));
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert_eq!(
            args(&["--log-level", "loud"]).validate(),
            Err(ConfigError::InvalidLogLevel("loud".into()))
        );
        assert_eq!(args(&["--load-timeout-ms", "0"]).validate(), Err(ConfigError::ZeroTimeout));
        assert_eq!(args(&["--jwt-secret", " "]).validate(), Err(ConfigError::EmptyJwtSecret));
        assert_eq!(args(&["--topic", ""]).validate(), Err(ConfigError::EmptyTopic));
    }
}

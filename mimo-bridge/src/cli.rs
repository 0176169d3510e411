//! CLI argument types for `mimo-bridge`.
//!
//! These types are defined separately from `main.rs` so that integration tests
//! can parse them directly.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use crate::config::duration_format::parse_duration;
use crate::config::{BridgeConfig, ConfigError, ConfigOverrides};

/// Arguments for `mimo-bridge`.
///
/// Everything after the options (or after `--`) is the backend command. When
/// no command is given, the config file's `command` or the built-in default is
/// used.
#[derive(Args, Debug)]
pub struct BridgeArgs {
    /// YAML config file.
    #[arg(long, env = "MIMO_BRIDGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Diagnostic log file (appended to).
    #[arg(long, env = "MIMO_BRIDGE_LOG")]
    pub log_file: Option<PathBuf>,

    /// Don't write the diagnostic log.
    #[arg(long)]
    pub no_diagnostics: bool,

    /// Extra environment for the backend, as KEY=VALUE. Repeatable.
    #[arg(short = 'e', long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair)]
    pub env: Vec<(String, String)>,

    /// Longest idle wait before re-checking the backend (e.g. 1s, 250ms).
    #[arg(long, value_parser = parse_duration)]
    pub wait_ceiling: Option<Duration>,

    /// Time between SIGTERM and SIGKILL when stopping the backend.
    #[arg(long, value_parser = parse_duration)]
    pub terminate_grace: Option<Duration>,

    /// Enable debug logging on stderr.
    #[arg(long)]
    pub verbose: bool,

    /// Backend command and arguments (after `--`).
    #[arg(trailing_var_arg = true)]
    pub command: Vec<String>,
}

impl BridgeArgs {
    /// The values given on the command line, for merging with the config file.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            command: self.command.clone(),
            env: self.env.clone(),
            log_file: self.log_file.clone(),
            no_diagnostics: self.no_diagnostics,
            wait_ceiling: self.wait_ceiling,
            terminate_grace: self.terminate_grace,
        }
    }

    /// Load the config file (if any) and resolve the final configuration.
    pub fn resolve(&self) -> Result<BridgeConfig, ConfigError> {
        BridgeConfig::load(self.config.as_deref(), self.overrides())
    }
}

/// Parse a `KEY=VALUE` pair. The value may be empty or contain `=`.
pub fn parse_env_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_pair() {
        assert_eq!(
            parse_env_pair("MIX_ENV=prod").unwrap(),
            ("MIX_ENV".to_string(), "prod".to_string())
        );
        assert_eq!(
            parse_env_pair("OPTS=a=b").unwrap(),
            ("OPTS".to_string(), "a=b".to_string())
        );
        assert_eq!(
            parse_env_pair("EMPTY=").unwrap(),
            ("EMPTY".to_string(), String::new())
        );
        assert!(parse_env_pair("=value").is_err());
        assert!(parse_env_pair("NOVALUE").is_err());
    }
}

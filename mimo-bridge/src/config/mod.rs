//! Configuration for the bridge.
//!
//! Values are resolved with the precedence CLI flag > config file > built-in
//! default. The config file is optional and only read when a path is given
//! (`--config` or `MIMO_BRIDGE_CONFIG`).
//!
//! # Example
//!
//! ```ignore
//! use mimo_bridge::config::{BridgeConfig, ConfigOverrides};
//!
//! let config = BridgeConfig::load(Some(Path::new("bridge.yaml")), ConfigOverrides::default())?;
//! println!("launching {}", config.launch.display());
//! ```

mod defaults;
pub mod duration_format;
mod error;
mod loader;
mod schema;

use std::path::{Path, PathBuf};
use std::time::Duration;

pub use defaults::{BridgeDefaults, DEFAULT_COMMAND, DEFAULT_LOG_FILE, default_command};
pub use error::ConfigError;
pub use loader::{load_config, substitute_env_vars};
pub use schema::FileConfig;

use crate::bridge::lifecycle::ShutdownPolicy;
use crate::bridge::relay::RelaySettings;
use crate::bridge::supervisor::LaunchSpec;

/// Fully resolved bridge configuration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub launch: LaunchSpec,
    pub log_file: PathBuf,
    pub diagnostics: bool,
    pub relay: RelaySettings,
    pub shutdown: ShutdownPolicy,
}

/// Values supplied on the command line. Empty / `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub command: Vec<String>,
    pub env: Vec<(String, String)>,
    pub log_file: Option<PathBuf>,
    pub no_diagnostics: bool,
    pub wait_ceiling: Option<Duration>,
    pub terminate_grace: Option<Duration>,
}

impl BridgeConfig {
    /// Load the optional config file at `path` and resolve it with `overrides`.
    pub fn load(path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let file = path.map(load_config).transpose()?;
        Self::resolve(file, overrides)
    }

    /// Merge file values, CLI overrides and defaults, then validate.
    pub fn resolve(
        file: Option<FileConfig>,
        overrides: ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let file = file.unwrap_or_default();
        let defaults = BridgeDefaults::default();

        let command = if !overrides.command.is_empty() {
            overrides.command
        } else {
            file.command.unwrap_or_else(default_command)
        };

        // File entries first so CLI entries win when the child env is applied.
        let mut env: Vec<(String, String)> = file.env.into_iter().collect();
        env.extend(overrides.env);

        let mut launch = LaunchSpec::from_command(&command).ok_or(ConfigError::EmptyCommand)?;
        launch.env = env;

        let config = Self {
            launch,
            log_file: overrides
                .log_file
                .or(file.log_file)
                .unwrap_or(defaults.log_file),
            diagnostics: !overrides.no_diagnostics && file.diagnostics.unwrap_or(true),
            relay: RelaySettings {
                wait_ceiling: overrides
                    .wait_ceiling
                    .or(file.wait_ceiling)
                    .unwrap_or(defaults.wait_ceiling),
                chunk_size: file.chunk_size.unwrap_or(defaults.chunk_size),
                max_line_bytes: file.max_line_bytes.unwrap_or(defaults.max_line_bytes),
                queue_limit: file.queue_limit.unwrap_or(defaults.queue_limit),
                drain_timeout: file.drain_timeout.unwrap_or(defaults.drain_timeout),
            },
            shutdown: ShutdownPolicy {
                terminate_grace: overrides
                    .terminate_grace
                    .or(file.terminate_grace)
                    .unwrap_or(defaults.terminate_grace),
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.launch.program.trim().is_empty() {
            return Err(ConfigError::EmptyCommand);
        }
        if let Some((key, _)) = self
            .launch
            .env
            .iter()
            .find(|(k, _)| k.is_empty() || k.contains('='))
        {
            return Err(ConfigError::InvalidEnv { key: key.clone() });
        }
        if self.relay.chunk_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "chunk_size",
                reason: "must be > 0".to_string(),
            });
        }
        if self.relay.max_line_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_line_bytes",
                reason: "must be > 0".to_string(),
            });
        }
        if self.relay.queue_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "queue_limit",
                reason: "must be > 0".to_string(),
            });
        }
        if self.relay.wait_ceiling.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "wait_ceiling",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

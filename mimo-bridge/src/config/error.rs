//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    // ─────────────────────────────────────────────────────────────────────────
    // Validation errors
    // ─────────────────────────────────────────────────────────────────────────
    /// The resolved child command has no program.
    #[error("child command is empty")]
    EmptyCommand,

    /// An environment override has an unusable key.
    #[error("invalid environment override '{key}': key must be non-empty and contain no '='")]
    InvalidEnv { key: String },

    /// A numeric or duration setting is out of range.
    #[error("invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    /// `${VAR}` referenced in the config file is not set and has no default.
    #[error("missing environment variable '{var}' referenced in configuration")]
    MissingEnvVar { var: String },

    // ─────────────────────────────────────────────────────────────────────────
    // I/O and parsing errors
    // ─────────────────────────────────────────────────────────────────────────
    /// YAML parsing error.
    #[error("YAML parse error: {0}")]
    ParseError(#[from] serde_saphyr::Error),

    /// I/O error reading config file.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Explicitly requested config file does not exist.
    #[error("configuration file not found: {}", path.display())]
    ConfigFileNotFound { path: PathBuf },

    /// Empty configuration file.
    #[error("configuration file is empty")]
    EmptyConfigFile,
}

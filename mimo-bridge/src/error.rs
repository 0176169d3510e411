//! Error types for the bridge binary.
//!
//! `BridgeError` covers everything that can end a session early: the child
//! cannot be launched, a stream could not be captured, a relay write failed
//! in a way that is not recoverable, or the configuration is unusable.
//!
//! Recoverable conditions never become errors. A read that is not ready yet
//! simply stays pending, malformed UTF-8 is replaced, and a failing diagnostic
//! log is ignored.

use mimo_bridge_core::StreamDirection;

use crate::config::ConfigError;

/// Errors that end a bridge session.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The child process could not be started.
    #[error("Failed to launch {program}: {reason}")]
    Launch {
        /// The program that was executed.
        program: String,
        /// Human-readable description of the spawn failure.
        reason: String,
    },

    /// A child stdio stream was not piped or was already taken.
    #[error("Child {stream} was not captured")]
    StreamCapture {
        /// `"stdin"`, `"stdout"` or `"stderr"`.
        stream: &'static str,
    },

    /// Unrecoverable IO failure while relaying.
    #[error("IO error on {direction} stream: {source}")]
    Relay {
        /// Which direction failed.
        direction: StreamDirection,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Any other IO error (signal registration, process wait).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

//! Centralized default values for bridge configuration.

use std::path::PathBuf;
use std::time::Duration;

use mimo_bridge_core::framing::MAX_LINE_BYTES;

/// Default child command: the backend's REPL entry point inside its container.
pub const DEFAULT_COMMAND: &[&str] = &[
    "docker",
    "exec",
    "-i",
    "-e",
    "MIX_ENV=prod",
    "mimo-mcp",
    "mix",
    "run",
    "--no-compile",
    "--no-halt",
    "-e",
    "Mimo.McpCli.run()",
];

/// Default diagnostic log path.
pub const DEFAULT_LOG_FILE: &str = "/tmp/mcp-wrapper.log";

/// Centralized default values used when neither the CLI nor the config file
/// sets a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeDefaults {
    /// Upper bound on one readiness wait, so liveness is re-polled when idle.
    pub wait_ceiling: Duration,

    /// Bytes requested per read.
    pub chunk_size: usize,

    /// Longest line accepted in either direction.
    pub max_line_bytes: usize,

    /// Bytes queued for a slow reader before the relay stops reading from
    /// the other side.
    pub queue_limit: usize,

    /// How long to keep reading child stdout after the child has exited.
    /// Grandchildren may hold the pipe open, so this must be bounded.
    pub drain_timeout: Duration,

    /// Time between SIGTERM and SIGKILL when stopping the child.
    pub terminate_grace: Duration,

    pub log_file: PathBuf,
}

impl Default for BridgeDefaults {
    fn default() -> Self {
        Self {
            wait_ceiling: Duration::from_secs(1),
            chunk_size: 64 * 1024,
            max_line_bytes: MAX_LINE_BYTES,
            queue_limit: 1024 * 1024,
            drain_timeout: Duration::from_secs(2),
            terminate_grace: Duration::from_secs(3),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

/// The default command as owned strings.
pub fn default_command() -> Vec<String> {
    DEFAULT_COMMAND.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let d = BridgeDefaults::default();
        assert_eq!(d.wait_ceiling, Duration::from_secs(1));
        assert_eq!(d.chunk_size, 65536);
        assert_eq!(d.max_line_bytes, 10 * 1024 * 1024);
        assert!(d.queue_limit >= d.chunk_size);
        assert!(d.drain_timeout < d.terminate_grace);
        assert_eq!(d.log_file, PathBuf::from("/tmp/mcp-wrapper.log"));
    }

    #[test]
    fn test_default_command() {
        let cmd = default_command();
        assert_eq!(cmd[0], "docker");
        assert_eq!(cmd.last().map(String::as_str), Some("Mimo.McpCli.run()"));
    }
}

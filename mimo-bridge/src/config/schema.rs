//! Configuration file schema.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use super::duration_format;

/// Contents of the optional YAML config file.
///
/// Every field is optional; anything left unset falls back to the CLI or the
/// built-in defaults.
///
/// ```yaml
/// command: ["docker", "exec", "-i", "mimo-mcp", "mix", "run", "--no-halt", "-e", "Mimo.McpCli.run()"]
/// env:
///   MIX_ENV: prod
/// log_file: /tmp/mcp-wrapper.log
/// wait_ceiling: 1s
/// terminate_grace: 3s
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Child program followed by its arguments, passed verbatim.
    #[serde(default)]
    pub command: Option<Vec<String>>,

    /// Extra environment for the child.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Set to `false` to disable the diagnostic log file.
    #[serde(default)]
    pub diagnostics: Option<bool>,

    #[serde(default, deserialize_with = "duration_format::deserialize_option")]
    pub wait_ceiling: Option<Duration>,

    #[serde(default)]
    pub chunk_size: Option<usize>,

    #[serde(default)]
    pub max_line_bytes: Option<usize>,

    /// Bytes buffered toward a slow reader before reads from the other side
    /// pause.
    #[serde(default)]
    pub queue_limit: Option<usize>,

    #[serde(default, deserialize_with = "duration_format::deserialize_option")]
    pub drain_timeout: Option<Duration>,

    #[serde(default, deserialize_with = "duration_format::deserialize_option")]
    pub terminate_grace: Option<Duration>,
}

//! Append-only diagnostic log for offline troubleshooting.
//!
//! The bridge runs with stdout reserved for protocol traffic and is usually
//! launched by an editor that swallows stderr, so the only practical way to
//! see what crossed (or failed to cross) the boundary is a plain text file.
//! Every raw chunk, every classification decision and every lifecycle event
//! is recorded as one line:
//!
//! ```text
//! [4242] 14:03:07 [OUT] {"jsonrpc":"2.0","id":1,"result":{}}
//! ```
//!
//! The sink is injected as a [`DiagnosticSink`] trait object behind a
//! [`Diagnostics`] handle, opened at startup and closed at shutdown. Write
//! failures are swallowed: diagnostics must never interrupt the relay.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::StreamDirection;
use crate::classify::SuppressReason;

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

/// A single diagnostic event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticEvent {
    SessionStart,
    /// About to launch the child with this command line.
    Launching { command: String },
    /// A line read from upstream and written to the child.
    Inbound { line: String },
    /// Upstream input reached end-of-stream.
    InputEof,
    /// The child's stdin was closed (after upstream EOF or a broken pipe).
    ChildInputClosed,
    /// A raw chunk read from the child's stdout.
    RawOutput { bytes: usize },
    /// A child output line forwarded upstream.
    Forwarded { line: String },
    /// A child output line that was dropped.
    Skipped { line: String, reason: SuppressReason },
    /// Text read from the child's stderr.
    Stderr { text: String },
    /// A line was discarded for exceeding the size limit.
    Oversized {
        direction: StreamDirection,
        max_bytes: usize,
    },
    /// The child exited with this code.
    ChildExited { code: i32 },
    /// An interruption signal ended the session.
    Interrupted,
    /// An unexpected error ended the session.
    Error { message: String },
    SessionEnd,
}

impl fmt::Display for DiagnosticEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionStart => f.write_str("=== SESSION START ==="),
            Self::Launching { command } => write!(f, "Starting: {command}"),
            Self::Inbound { line } => write!(f, "[IN] {line}"),
            Self::InputEof => f.write_str("EOF from stdin"),
            Self::ChildInputClosed => f.write_str("Child stdin closed"),
            Self::RawOutput { bytes } => write!(f, "[RAW_OUT] {bytes} bytes"),
            Self::Forwarded { line } => write!(f, "[OUT] {line}"),
            Self::Skipped { line, reason } => write!(f, "[{}] {line}", reason.tag()),
            Self::Stderr { text } => write!(f, "[ERR] {text}"),
            Self::Oversized {
                direction,
                max_bytes,
            } => write!(f, "[OVERSIZED] {direction} line over {max_bytes} bytes dropped"),
            Self::ChildExited { code } => write!(f, "Process exited: {code}"),
            Self::Interrupted => f.write_str("Interrupted"),
            Self::Error { message } => write!(f, "Error: {message}"),
            Self::SessionEnd => f.write_str("=== SESSION END ==="),
        }
    }
}

/// Format one log entry: `[<pid>] <HH:MM:SS> <event>\n`.
pub fn format_entry(pid: u32, event: &DiagnosticEvent) -> String {
    let now = chrono::Local::now().format("%H:%M:%S");
    let mut entry = format!("[{pid}] {now} {event}");
    // One entry is one line; embedded newlines (stderr dumps) are flattened.
    if entry.contains('\n') {
        entry = entry.trim_end().replace('\n', "\\n");
    }
    entry.push('\n');
    entry
}

// ─────────────────────────────────────────────────────────────────────────────
// Sinks
// ─────────────────────────────────────────────────────────────────────────────

/// Destination for diagnostic entries.
///
/// `record` must not fail and must return promptly.
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, event: &DiagnosticEvent);

    /// Flush and release the sink. Later records are dropped.
    fn close(&self) {}
}

/// Appends entries to a file shared with other bridge processes.
///
/// The file is opened with `O_APPEND` and each entry is written with a single
/// `write_all`, so concurrent appenders never interleave within a line.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    pid: u32,
    file: Mutex<Option<File>>,
}

impl FileSink {
    /// Open `path` for appending, creating it if needed.
    ///
    /// An unopenable path yields a sink that drops everything.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let file = match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(f) => Some(f),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "diagnostic log unavailable");
                None
            }
        };
        Self {
            path,
            pid: std::process::id(),
            file: Mutex::new(file),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.file.lock().is_some()
    }
}

impl DiagnosticSink for FileSink {
    fn record(&self, event: &DiagnosticEvent) {
        let entry = format_entry(self.pid, event);
        if let Some(file) = self.file.lock().as_mut() {
            let _ = file.write_all(entry.as_bytes());
        }
    }

    fn close(&self) {
        if let Some(mut file) = self.file.lock().take() {
            let _ = file.flush();
        }
    }
}

/// Keeps entries in memory. Used by tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<DiagnosticEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every recorded event, in order.
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.entries.lock().clone()
    }
}

impl DiagnosticSink for MemorySink {
    fn record(&self, event: &DiagnosticEvent) {
        self.entries.lock().push(event.clone());
    }
}

/// Drops everything. Used when diagnostics are disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn record(&self, _event: &DiagnosticEvent) {}
}

// ─────────────────────────────────────────────────────────────────────────────
// Handle
// ─────────────────────────────────────────────────────────────────────────────

/// Cheaply clonable handle the relay records through.
///
/// Every event is mirrored to `tracing` at debug level before it reaches the
/// sink, so `RUST_LOG=debug` shows the same trail on stderr.
#[derive(Clone)]
pub struct Diagnostics {
    sink: Arc<dyn DiagnosticSink>,
}

impl Diagnostics {
    pub fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self { sink }
    }

    /// A handle that records nothing.
    pub fn disabled() -> Self {
        Self::new(Arc::new(NullSink))
    }

    pub fn record(&self, event: DiagnosticEvent) {
        tracing::debug!(target: "mimo_bridge::diagnostic", "{event}");
        self.sink.record(&event);
    }

    pub fn close(&self) {
        self.sink.close();
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics").finish_non_exhaustive()
    }
}

//! Child process lifecycle types.
//!
//! These types model the state of the backend child spawned by the bridge and
//! the grace period used when it has to be stopped.

use std::process::ExitStatus;
use std::time::Duration;

/// State of the managed child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildState {
    /// Spawned and not yet reaped.
    Running,
    /// Exited normally with an exit code.
    Exited {
        /// The process exit code.
        code: i32,
    },
    /// Killed by a signal (Unix only).
    Signalled {
        /// The signal number that terminated the process.
        signal: i32,
    },
}

impl ChildState {
    pub fn from_status(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Self::Exited { code };
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Self::Signalled { signal };
            }
        }
        Self::Exited { code: -1 }
    }

    /// Exit code the bridge reports for this state, shell style.
    ///
    /// `None` while the child is still running. A signal death maps to
    /// `128 + signal`.
    pub fn exit_code(self) -> Option<i32> {
        match self {
            Self::Running => None,
            Self::Exited { code } => Some(code),
            Self::Signalled { signal } => Some(128 + signal),
        }
    }

    pub fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }
}

/// How to stop a child that is still running.
///
/// The sequence is: SIGTERM to the child's process group, wait
/// `terminate_grace`, then SIGKILL and reap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownPolicy {
    /// Time to wait after SIGTERM before sending SIGKILL.
    pub terminate_grace: Duration,
}

impl Default for ShutdownPolicy {
    fn default() -> Self {
        Self {
            terminate_grace: Duration::from_secs(3),
        }
    }
}

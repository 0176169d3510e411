//! Child process launch, liveness polling and termination.

use std::process::Stdio;

use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};

use crate::error::BridgeError;

use super::lifecycle::{ChildState, ShutdownPolicy};

// ─────────────────────────────────────────────────────────────────────────────
// LaunchSpec
// ─────────────────────────────────────────────────────────────────────────────

/// Program, arguments and extra environment for the child.
///
/// Arguments are passed verbatim, never through a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Applied in order on top of the inherited environment.
    pub env: Vec<(String, String)>,
}

impl LaunchSpec {
    /// Split `command` into program and arguments. `None` if it is empty.
    pub fn from_command(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            env: Vec::new(),
        })
    }

    /// Space-joined command line, for logs.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// start
// ─────────────────────────────────────────────────────────────────────────────

/// Launch the child with all three stdio streams piped.
///
/// The child gets its own process group so termination reaches anything it
/// forks (e.g. `docker exec` helpers).
///
/// # Errors
///
/// Returns [`BridgeError::Launch`] if the program cannot be executed.
pub fn start(spec: &LaunchSpec) -> Result<ChildHandle, BridgeError> {
    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    for (key, value) in &spec.env {
        cmd.env(key, value);
    }

    #[cfg(unix)]
    cmd.process_group(0);

    let child = cmd.spawn().map_err(|e| BridgeError::Launch {
        program: spec.program.clone(),
        reason: e.to_string(),
    })?;

    tracing::info!(
        program = %spec.program,
        pid = child.id(),
        state = "running",
        "child process spawned"
    );

    Ok(ChildHandle {
        child,
        state: ChildState::Running,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// ChildHandle
// ─────────────────────────────────────────────────────────────────────────────

/// A running child and its last observed state.
///
/// Dropping the handle kills the child if it is still running.
#[derive(Debug)]
pub struct ChildHandle {
    child: Child,
    state: ChildState,
}

impl ChildHandle {
    /// OS process id, `None` once reaped.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    pub fn take_stdin(&mut self) -> Result<ChildStdin, BridgeError> {
        self.child
            .stdin
            .take()
            .ok_or(BridgeError::StreamCapture { stream: "stdin" })
    }

    pub fn take_stdout(&mut self) -> Result<ChildStdout, BridgeError> {
        self.child
            .stdout
            .take()
            .ok_or(BridgeError::StreamCapture { stream: "stdout" })
    }

    pub fn take_stderr(&mut self) -> Result<ChildStderr, BridgeError> {
        self.child
            .stderr
            .take()
            .ok_or(BridgeError::StreamCapture { stream: "stderr" })
    }

    /// Non-blocking liveness check. Reaps the child if it has exited.
    pub fn poll(&mut self) -> Result<ChildState, BridgeError> {
        if !self.state.is_running() {
            return Ok(self.state);
        }
        if let Some(status) = self.child.try_wait()? {
            self.state = ChildState::from_status(status);
            tracing::info!(state = ?self.state, "child process exited");
        }
        Ok(self.state)
    }

    /// Wait for the child to exit on its own.
    pub async fn wait(&mut self) -> Result<ChildState, BridgeError> {
        if self.state.is_running() {
            let status = self.child.wait().await?;
            self.state = ChildState::from_status(status);
        }
        Ok(self.state)
    }

    /// Stop the child if it is still running and return its exit code.
    ///
    /// 1. SIGTERM to the child's process group (Unix)
    /// 2. Wait `terminate_grace`
    /// 3. SIGKILL
    /// 4. Reap via `wait()` so no zombie is left behind
    pub async fn terminate(&mut self, policy: &ShutdownPolicy) -> Result<i32, BridgeError> {
        if let Some(code) = self.poll()?.exit_code() {
            return Ok(code);
        }

        tracing::info!(pid = self.id(), state = "shutting_down", "terminating child");

        #[cfg(unix)]
        {
            use nix::sys::signal::{Signal, killpg};
            use nix::unistd::Pid;
            if let Some(pid) = self.child.id() {
                tracing::info!(pid, "sending SIGTERM to process group");
                if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                    tracing::warn!(pid, error = ?e, "killpg SIGTERM failed");
                }
            }
        }
        #[cfg(not(unix))]
        if let Err(e) = self.child.start_kill() {
            tracing::warn!(error = %e, "start_kill failed");
        }

        match tokio::time::timeout(policy.terminate_grace, self.child.wait()).await {
            Ok(Ok(status)) => {
                self.state = ChildState::from_status(status);
                tracing::info!(state = ?self.state, "child exited after SIGTERM");
                return Ok(self.state.exit_code().unwrap_or(-1));
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "wait failed after SIGTERM");
            }
            Err(_) => {
                tracing::warn!("child did not exit within terminate_grace");
            }
        }

        tracing::warn!("sending SIGKILL");
        if let Err(e) = self.child.kill().await {
            tracing::error!(error = %e, "SIGKILL failed");
        }

        let state = self.wait().await?;
        tracing::info!(state = ?state, "child exited after SIGKILL");
        Ok(state.exit_code().unwrap_or(-1))
    }
}

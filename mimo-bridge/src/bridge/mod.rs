//! Bridge session: launch the child, relay until it exits or a signal
//! arrives, then make sure it is gone.
//!
//! This module contains [`run_bridge`], which binds the session to the
//! process's own stdin/stdout and to SIGINT/SIGTERM, and [`run_session`],
//! which takes arbitrary upstream streams and an interrupt future so tests
//! can drive a full session in-process.

pub mod lifecycle;
pub mod relay;
pub mod supervisor;

use std::future::Future;
use std::io;

use tokio::io::{AsyncRead, AsyncWrite};

use mimo_bridge_core::classify::PrefixClassifier;
use mimo_bridge_core::diagnostic::{DiagnosticEvent, Diagnostics};

use crate::config::BridgeConfig;
use crate::error::BridgeError;

use relay::RelayOutcome;

/// Exit code after an interruption signal (128 + SIGINT).
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Exit code when the session fails before or while relaying.
pub const FAILURE_EXIT_CODE: i32 = 1;

// ─────────────────────────────────────────────────────────────────────────────
// run_bridge
// ─────────────────────────────────────────────────────────────────────────────

/// Run one session over the process's stdin/stdout.
///
/// Signal handlers are registered before the child is launched so an early
/// SIGTERM cannot kill the bridge and orphan the child.
pub async fn run_bridge(config: &BridgeConfig, diag: &Diagnostics) -> Result<i32, BridgeError> {
    let interrupt = interrupt_signal()?;
    run_session(
        config,
        diag,
        tokio::io::stdin(),
        tokio::io::stdout(),
        interrupt,
    )
    .await
}

/// Resolves on SIGINT or SIGTERM.
#[cfg(unix)]
pub fn interrupt_signal() -> io::Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => tracing::info!("received SIGTERM, initiating shutdown"),
            _ = sigint.recv() => tracing::info!("received SIGINT, initiating shutdown"),
        }
    })
}

/// Resolves on Ctrl-C.
#[cfg(not(unix))]
pub fn interrupt_signal() -> io::Result<impl Future<Output = ()>> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "ctrl_c handler failed");
            std::future::pending::<()>().await;
        }
        tracing::info!("received Ctrl-C, initiating shutdown");
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// run_session
// ─────────────────────────────────────────────────────────────────────────────

/// Run a complete session and return the bridge's exit code.
///
/// - child exits on its own: its exit code (`128 + signal` if killed)
/// - `interrupt` resolves: the child is terminated, result is 130
/// - launch or relay failure: the child is terminated and the error returned
///
/// Session start/end markers and any error are written to `diag`. Closing the
/// sink is left to the caller.
pub async fn run_session<R, W, S>(
    config: &BridgeConfig,
    diag: &Diagnostics,
    upstream_in: R,
    upstream_out: W,
    interrupt: S,
) -> Result<i32, BridgeError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    S: Future<Output = ()>,
{
    diag.record(DiagnosticEvent::SessionStart);
    diag.record(DiagnosticEvent::Launching {
        command: config.launch.display(),
    });

    let result = supervise(config, diag, upstream_in, upstream_out, interrupt).await;

    match &result {
        Ok(code) => tracing::info!(code, "session finished"),
        Err(e) => {
            tracing::error!(error = %e, "session failed");
            diag.record(DiagnosticEvent::Error {
                message: e.to_string(),
            });
        }
    }
    diag.record(DiagnosticEvent::SessionEnd);
    result
}

async fn supervise<R, W, S>(
    config: &BridgeConfig,
    diag: &Diagnostics,
    upstream_in: R,
    upstream_out: W,
    interrupt: S,
) -> Result<i32, BridgeError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    S: Future<Output = ()>,
{
    let mut child = supervisor::start(&config.launch)?;
    let classifier = PrefixClassifier::default();

    let outcome = relay::run_relay(
        &mut child,
        upstream_in,
        upstream_out,
        &config.relay,
        &classifier,
        diag,
        interrupt,
    )
    .await;

    match outcome {
        Ok(RelayOutcome::ChildExited { code }) => Ok(code),
        Ok(RelayOutcome::Interrupted) => {
            match child.terminate(&config.shutdown).await {
                Ok(code) => tracing::info!(child_code = code, "child stopped after interrupt"),
                Err(e) => tracing::warn!(error = %e, "failed to stop child after interrupt"),
            }
            Ok(INTERRUPTED_EXIT_CODE)
        }
        Err(e) => {
            if let Err(te) = child.terminate(&config.shutdown).await {
                tracing::warn!(error = %te, "failed to stop child after relay error");
            }
            Err(e)
        }
    }
}

//! mimo-bridge entry point.
//!
//! Parses arguments, resolves configuration, opens the diagnostic log and runs
//! one bridge session. The process exits with the backend's exit code.

use std::sync::Arc;

use clap::Parser;

use mimo_bridge::bridge::{FAILURE_EXIT_CODE, run_bridge};
use mimo_bridge::cli::BridgeArgs;
use mimo_bridge_core::diagnostic::{Diagnostics, FileSink};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Definitions
// ─────────────────────────────────────────────────────────────────────────────

/// Stdio JSON-RPC bridge between an MCP client and a backend subprocess.
#[derive(Parser)]
#[command(name = "mimo-bridge", version)]
struct Cli {
    #[command(flatten)]
    args: BridgeArgs,
}

// ─────────────────────────────────────────────────────────────────────────────
// Entry Point
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.args.verbose);

    let config = match cli.args.resolve() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            eprintln!("mimo-bridge: {e}");
            std::process::exit(FAILURE_EXIT_CODE);
        }
    };

    let diag = if config.diagnostics {
        let sink = FileSink::open(&config.log_file);
        tracing::debug!(path = %sink.path().display(), open = sink.is_open(), "diagnostic log");
        Diagnostics::new(Arc::new(sink))
    } else {
        Diagnostics::disabled()
    };

    let code = match run_bridge(&config, &diag).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("mimo-bridge: {e}");
            FAILURE_EXIT_CODE
        }
    };

    diag.close();
    std::process::exit(code);
}

// ─────────────────────────────────────────────────────────────────────────────
// Tracing Init
// ─────────────────────────────────────────────────────────────────────────────

/// Initialise tracing subscriber with stderr output.
///
/// Stdout carries protocol traffic, so logs must never go there. When
/// `verbose` is true the filter is `debug`; otherwise `RUST_LOG` is respected
/// (defaulting to no output).
fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

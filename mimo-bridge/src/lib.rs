//! mimo-bridge: stdio JSON-RPC bridge to a backend subprocess.
//!
//! An MCP client launches `mimo-bridge` and speaks newline-delimited JSON-RPC
//! over its stdin/stdout. The bridge launches the backend (by default a REPL
//! inside a container), passes client lines through unchanged, and forwards
//! only those backend output lines that look like protocol messages. Banners,
//! log output and runtime chatter are kept off the client's stdout and go to
//! the diagnostic log instead.

pub mod bridge;
pub mod cli;
pub mod config;
pub mod error;

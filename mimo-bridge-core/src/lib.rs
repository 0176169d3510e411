//! mimo-bridge core: transport-agnostic pieces of the stdio bridge.
//!
//! This library holds the parts of the bridge that never touch a process or a
//! runtime: line reassembly over arbitrarily fragmented byte chunks, the
//! prefix-based protocol classifier, and the diagnostic event sink. The
//! `mimo-bridge` binary crate wires them into its multiplexing loop.

pub mod classify;
pub mod diagnostic;
pub mod framing;

use std::fmt;

/// Direction of a relayed byte stream.
///
/// Used to tag framing warnings and relay errors so a log reader can tell
/// which side of the bridge misbehaved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamDirection {
    /// Bridge stdin → child stdin.
    UpstreamToChild,
    /// Child stdout → bridge stdout.
    ChildToUpstream,
}

impl fmt::Display for StreamDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UpstreamToChild => f.write_str("upstream_to_child"),
            Self::ChildToUpstream => f.write_str("child_to_upstream"),
        }
    }
}

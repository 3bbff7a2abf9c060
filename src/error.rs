//! Error types for the relay
//!
//! Defines server-level errors and wire-level frame errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

use crate::types::ConnectionId;

/// Server-level errors
///
/// Covers fatal startup errors, transport errors, and registry misuse.
/// Registry misuse variants should not occur in the correct flow and are
/// logged as anomalies rather than crashing the server.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Listening address unavailable (fatal to start, server stays stopped)
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Connection already present in the registry
    #[error("connection {0} is already registered")]
    AlreadyRegistered(ConnectionId),

    /// Connection not present in the registry
    #[error("connection {0} is not registered")]
    NotFound(ConnectionId),

    /// Transport error (treated uniformly as peer-gone)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Wire-level frame errors
///
/// A malformed frame is dropped and logged; the connection stays open.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Frame has no colon and is not a recognized control token
    #[error("malformed frame: {0:?}")]
    Malformed(String),
}

//! Protocol and transport errors.

use std::net::SocketAddr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("connect to {addr} failed: {reason}")]
    ConnectFailed { addr: SocketAddr, reason: String },

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("session closed")]
    SessionClosed,

    #[error("serialisation error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A record that could not be turned into an envelope.
///
/// Never fatal: the decoder has already skipped to the next delimiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("malformed envelope ({reason}): {}", String::from_utf8_lossy(.bytes))]
    Malformed { bytes: Vec<u8>, reason: String },

    #[error("frame exceeds {max} bytes without a delimiter ({discarded} bytes discarded)")]
    Oversized { discarded: usize, max: usize },
}

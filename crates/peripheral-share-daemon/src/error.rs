//! Daemon errors.

use peripheral_share_protocol::{PeerId, ProtocolError};
use peripheral_share_types::Position;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("input error: {0}")]
    Input(#[from] peripheral_share_input::InputError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("layout error: {0}")]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Peer bookkeeping failures.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("peer {0} is already registered")]
    AlreadyRegistered(PeerId),

    #[error("a spoke holds a single session (already connected to {0})")]
    SpokeOccupied(PeerId),

    #[error("unknown peer {0}")]
    UnknownPeer(PeerId),

    #[error("send to {peer} failed: {source}")]
    Send {
        peer: PeerId,
        #[source]
        source: ProtocolError,
    },
}

/// Device layout failures.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("slot {position} is taken by {occupant}")]
    SlotOccupied { position: Position, occupant: String },
}

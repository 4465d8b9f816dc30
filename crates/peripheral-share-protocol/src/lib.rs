//! TCP transport layer and wire protocol for peripheral-share.
//!
//! This crate handles connection setup over TCP, envelope framing
//! (newline-delimited JSON via serde_json) and the per-peer [`Session`]
//! that owns a connection's receive loop and serialises its writes.

pub mod codec;
pub mod error;
pub mod session;
pub mod transport;

pub use codec::{decode, encode, Decoded, FrameDecoder};
pub use error::{DecodeError, ProtocolError};
pub use session::{CloseReason, PeerId, Session, SessionEvent};
pub use transport::{connect, TcpTransport};

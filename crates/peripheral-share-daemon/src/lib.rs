//! Core daemon for peripheral-share.
//!
//! Owns the peer registry, the device layout and the handoff state machine,
//! and drives them from a single event loop fed by peer sessions, the local
//! capture backend and outside callers.

pub mod config;
pub mod daemon;
pub mod edge;
pub mod error;
pub mod handoff;
pub mod layout;
pub mod registry;
pub mod setup;

pub use config::Config;
pub use daemon::{Daemon, DaemonEvent, DaemonStatus, PeerStatus};
pub use error::{DaemonError, LayoutError, RegistryError};
pub use handoff::{HandoffAction, HandoffMachine, HandoffState};
pub use registry::Role;

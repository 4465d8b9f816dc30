//! Shared types for peripheral-share.
//!
//! This crate contains all types shared across the peripheral-share workspace:
//! the wire envelope, input events, device descriptors, screen geometry and
//! layout positions.

pub mod device;
pub mod envelope;
pub mod event;
pub mod screen;

pub use device::{DeviceInfo, ScreenInfo};
pub use envelope::{unix_millis, Envelope};
pub use event::{InputEvent, Key, MouseButton};
pub use screen::{ParsePositionError, Point, Position, ScreenEdge, ScreenGeometry, ENTRY_MARGIN};

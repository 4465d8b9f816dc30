//! Input capture and injection adapters for peripheral-share.
//!
//! This crate defines the [`InputCapture`] and [`InputInjection`] traits that
//! platform backends implement. The daemon only talks to these traits; the
//! platform hooks themselves live outside this workspace. A [`headless`]
//! pair is always available, and the `mock` feature adds recording backends
//! for tests.

use async_trait::async_trait;
use peripheral_share_types::InputEvent;
use tokio::sync::mpsc;

pub mod error;
pub mod headless;
#[cfg(feature = "mock")]
pub mod mock;

pub use error::InputError;

/// Observes the local keyboard and mouse.
///
/// Capture is restartable: `start` after `stop` must resume delivering events
/// to the new sender.
#[async_trait]
pub trait InputCapture: Send + 'static {
    /// Start capturing input, sending events to `tx`.
    async fn start(&mut self, tx: mpsc::Sender<InputEvent>) -> Result<(), InputError>;

    /// Stop delivering events. Stopping an idle capture is a no-op.
    async fn stop(&mut self) -> Result<(), InputError>;

    /// Whether events are currently being delivered.
    fn is_capturing(&self) -> bool;

    /// Shut down the capture backend and release all resources.
    async fn shutdown(&mut self) -> Result<(), InputError>;
}

/// Synthesises input events on this machine.
#[async_trait]
pub trait InputInjection: Send + 'static {
    /// Inject one event.
    async fn inject(&mut self, event: &InputEvent) -> Result<(), InputError>;

    /// Move the cursor to an absolute position without reporting it as input.
    async fn warp_cursor(&mut self, x: i32, y: i32) -> Result<(), InputError>;

    /// Shut down the injection backend.
    async fn shutdown(&mut self) -> Result<(), InputError>;
}

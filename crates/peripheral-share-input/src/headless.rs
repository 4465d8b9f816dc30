//! Backends for machines without a platform input hook.
//!
//! [`NullCapture`] never produces events and [`LogInjection`] records what
//! would have been injected in the log. Together they let a daemon run as a
//! pure relay or be exercised end to end on a server.

use async_trait::async_trait;
use peripheral_share_types::{InputEvent, Key};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::InputError;
use crate::{InputCapture, InputInjection};

/// Capture backend with no input source.
#[derive(Debug, Default)]
pub struct NullCapture {
    tx: Option<mpsc::Sender<InputEvent>>,
}

impl NullCapture {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InputCapture for NullCapture {
    async fn start(&mut self, tx: mpsc::Sender<InputEvent>) -> Result<(), InputError> {
        debug!("headless capture started");
        self.tx = Some(tx);
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), InputError> {
        if self.tx.take().is_some() {
            debug!("headless capture stopped");
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.tx.is_some()
    }

    async fn shutdown(&mut self) -> Result<(), InputError> {
        self.tx = None;
        Ok(())
    }
}

/// Injection backend that logs every event instead of synthesising it.
#[derive(Debug, Default)]
pub struct LogInjection {
    injected: u64,
}

impl LogInjection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events accepted so far.
    pub fn injected(&self) -> u64 {
        self.injected
    }
}

#[async_trait]
impl InputInjection for LogInjection {
    async fn inject(&mut self, event: &InputEvent) -> Result<(), InputError> {
        if let InputEvent::KeyPress { key: Key::Unknown(raw) }
        | InputEvent::KeyRelease { key: Key::Unknown(raw) } = event
        {
            debug!(key = %raw, "skipping unknown key");
            return Ok(());
        }
        self.injected += 1;
        info!(event_type = event.event_type(), ?event, "inject");
        Ok(())
    }

    async fn warp_cursor(&mut self, x: i32, y: i32) -> Result<(), InputError> {
        info!(x, y, "warp cursor");
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), InputError> {
        info!(injected = self.injected, "headless injection shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_capture_tracks_state() {
        let mut capture = NullCapture::new();
        assert!(!capture.is_capturing());

        let (tx, _rx) = mpsc::channel(4);
        capture.start(tx).await.unwrap();
        assert!(capture.is_capturing());

        capture.stop().await.unwrap();
        capture.stop().await.unwrap();
        assert!(!capture.is_capturing());
    }

    #[tokio::test]
    async fn log_injection_skips_unknown_keys() {
        let mut injection = LogInjection::new();
        injection
            .inject(&InputEvent::KeyPress {
                key: Key::Unknown("<0x1f>".to_string()),
            })
            .await
            .unwrap();
        injection
            .inject(&InputEvent::KeyPress { key: Key::Char('a') })
            .await
            .unwrap();
        injection
            .inject(&InputEvent::MouseMove { x: 1, y: 2 })
            .await
            .unwrap();
        assert_eq!(injection.injected(), 2);
    }
}

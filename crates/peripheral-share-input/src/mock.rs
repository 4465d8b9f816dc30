//! Mock input backends for testing.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use peripheral_share_types::InputEvent;
use tokio::sync::mpsc;

use crate::error::InputError;
use crate::{InputCapture, InputInjection};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// MockCapture
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MockCaptureState {
    target: Option<mpsc::Sender<InputEvent>>,
    starts: usize,
    stops: usize,
    shutdown: bool,
}

/// Mock input capture backend for testing.
///
/// [`MockCapture::new`] also returns a sender that tests use to play the
/// role of the physical keyboard and mouse. Fed events reach the daemon only
/// while capture is started; anything fed while stopped is dropped, like
/// real input that happens while another machine is active.
pub struct MockCapture {
    feed_rx: Option<mpsc::Receiver<InputEvent>>,
    state: Arc<Mutex<MockCaptureState>>,
}

impl MockCapture {
    /// Create a new mock capture and a sender for feeding events.
    pub fn new() -> (Self, mpsc::Sender<InputEvent>) {
        let (feed_tx, feed_rx) = mpsc::channel(1024);
        let capture = Self {
            feed_rx: Some(feed_rx),
            state: Arc::new(Mutex::new(MockCaptureState::default())),
        };
        (capture, feed_tx)
    }

    /// Get a clonable handle for observing the capture state from tests.
    pub fn handle(&self) -> MockCaptureHandle {
        MockCaptureHandle {
            state: Arc::clone(&self.state),
        }
    }

    fn spawn_forwarder(&mut self) {
        let Some(mut feed_rx) = self.feed_rx.take() else {
            return;
        };
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            while let Some(event) = feed_rx.recv().await {
                let target = lock(&state).target.clone();
                if let Some(tx) = target {
                    let _ = tx.send(event).await;
                }
            }
        });
    }
}

#[async_trait]
impl InputCapture for MockCapture {
    async fn start(&mut self, tx: mpsc::Sender<InputEvent>) -> Result<(), InputError> {
        self.spawn_forwarder();
        let mut state = lock(&self.state);
        state.target = Some(tx);
        state.starts += 1;
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), InputError> {
        let mut state = lock(&self.state);
        if state.target.take().is_some() {
            state.stops += 1;
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        lock(&self.state).target.is_some()
    }

    async fn shutdown(&mut self) -> Result<(), InputError> {
        let mut state = lock(&self.state);
        state.target = None;
        state.shutdown = true;
        Ok(())
    }
}

/// Clonable observer handle for `MockCapture`.
#[derive(Clone)]
pub struct MockCaptureHandle {
    state: Arc<Mutex<MockCaptureState>>,
}

impl MockCaptureHandle {
    pub fn is_capturing(&self) -> bool {
        lock(&self.state).target.is_some()
    }

    /// How many times `start()` was called.
    pub fn starts(&self) -> usize {
        lock(&self.state).starts
    }

    /// How many times a running capture was stopped.
    pub fn stops(&self) -> usize {
        lock(&self.state).stops
    }

    pub fn is_shutdown(&self) -> bool {
        lock(&self.state).shutdown
    }
}

// ---------------------------------------------------------------------------
// MockInjection
// ---------------------------------------------------------------------------

/// Recorded injector call for test observation.
#[derive(Debug, Clone, PartialEq)]
pub enum Injected {
    Event(InputEvent),
    Warp { x: i32, y: i32 },
}

#[derive(Debug, Default)]
struct MockInjectionState {
    injected: Vec<Injected>,
    shutdown: bool,
}

/// Mock input injection backend for testing.
pub struct MockInjection {
    state: Arc<Mutex<MockInjectionState>>,
}

impl Default for MockInjection {
    fn default() -> Self {
        Self::new()
    }
}

impl MockInjection {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockInjectionState::default())),
        }
    }

    /// Get a clonable handle for observing injections from tests.
    pub fn handle(&self) -> MockInjectionHandle {
        MockInjectionHandle {
            state: Arc::clone(&self.state),
        }
    }
}

/// Clonable observer handle for `MockInjection`.
#[derive(Clone)]
pub struct MockInjectionHandle {
    state: Arc<Mutex<MockInjectionState>>,
}

impl MockInjectionHandle {
    /// Snapshot of every recorded call, in order.
    pub fn calls(&self) -> Vec<Injected> {
        lock(&self.state).injected.clone()
    }

    /// Snapshot of the injected events only.
    pub fn injected_events(&self) -> Vec<InputEvent> {
        lock(&self.state)
            .injected
            .iter()
            .filter_map(|call| match call {
                Injected::Event(event) => Some(event.clone()),
                Injected::Warp { .. } => None,
            })
            .collect()
    }

    /// The most recent cursor warp, if any.
    pub fn last_warp(&self) -> Option<(i32, i32)> {
        lock(&self.state)
            .injected
            .iter()
            .rev()
            .find_map(|call| match call {
                Injected::Warp { x, y } => Some((*x, *y)),
                Injected::Event(_) => None,
            })
    }

    pub fn is_shutdown(&self) -> bool {
        lock(&self.state).shutdown
    }
}

#[async_trait]
impl InputInjection for MockInjection {
    async fn inject(&mut self, event: &InputEvent) -> Result<(), InputError> {
        lock(&self.state).injected.push(Injected::Event(event.clone()));
        Ok(())
    }

    async fn warp_cursor(&mut self, x: i32, y: i32) -> Result<(), InputError> {
        lock(&self.state).injected.push(Injected::Warp { x, y });
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), InputError> {
        lock(&self.state).shutdown = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn capture_forwards_only_while_started() {
        let (mut capture, feed) = MockCapture::new();
        let handle = capture.handle();

        let (tx, mut rx) = mpsc::channel(8);
        capture.start(tx).await.unwrap();
        feed.send(InputEvent::MouseMove { x: 1, y: 1 }).await.unwrap();
        let got = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap();
        assert_eq!(got, Some(InputEvent::MouseMove { x: 1, y: 1 }));

        capture.stop().await.unwrap();
        feed.send(InputEvent::MouseMove { x: 2, y: 2 }).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());

        // Restart with a fresh channel.
        let (tx, mut rx) = mpsc::channel(8);
        capture.start(tx).await.unwrap();
        feed.send(InputEvent::MouseMove { x: 3, y: 3 }).await.unwrap();
        let got = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap();
        assert_eq!(got, Some(InputEvent::MouseMove { x: 3, y: 3 }));

        assert_eq!(handle.starts(), 2);
        assert_eq!(handle.stops(), 1);
        assert!(handle.is_capturing());
    }

    #[tokio::test]
    async fn injection_records_calls() {
        let mut injection = MockInjection::new();
        let handle = injection.handle();

        injection.warp_cursor(1910, 540).await.unwrap();
        injection
            .inject(&InputEvent::MouseMove { x: 5, y: 6 })
            .await
            .unwrap();
        injection.shutdown().await.unwrap();

        assert_eq!(
            handle.calls(),
            vec![
                Injected::Warp { x: 1910, y: 540 },
                Injected::Event(InputEvent::MouseMove { x: 5, y: 6 }),
            ]
        );
        assert_eq!(handle.injected_events().len(), 1);
        assert_eq!(handle.last_warp(), Some((1910, 540)));
        assert!(handle.is_shutdown());
    }
}

//! A live connection to one peer.
//!
//! A [`Session`] owns the transport through two background tasks: one reads
//! and decodes envelopes, the other drains a bounded queue of encoded records
//! onto the wire. [`Session::send`] only enqueues, so a peer that stops
//! reading can never stall the caller. Everything the session observes is
//! reported to its owner as a [`SessionEvent`].

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use peripheral_share_types::Envelope;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tracing::{debug, trace, warn};

use crate::codec::{self, FrameDecoder, READ_CHUNK};
use crate::error::ProtocolError;

/// Encoded records a session buffers before the peer counts as stalled.
pub const SEND_QUEUE: usize = 1024;

/// Longest a single record may take to reach the transport.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Identity of a peer connection (`address:port` of the remote end).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The remote socket address, when the id was built from one.
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        self.0.parse().ok()
    }
}

impl From<SocketAddr> for PeerId {
    fn from(addr: SocketAddr) -> Self {
        Self(addr.to_string())
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The peer closed its end cleanly.
    Eof,
    /// Reading from the transport failed.
    PeerReset(String),
    /// Writing to the transport failed.
    SendFailed(String),
    /// The peer stopped answering pings.
    IdleTimeout,
    /// Closed by the local owner.
    Local,
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Eof => write!(f, "eof"),
            Self::PeerReset(e) => write!(f, "peer reset: {e}"),
            Self::SendFailed(e) => write!(f, "send failed: {e}"),
            Self::IdleTimeout => write!(f, "idle timeout"),
            Self::Local => write!(f, "closed locally"),
        }
    }
}

/// Something a session observed.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    EnvelopeReceived { peer: PeerId, envelope: Envelope },
    Closed { peer: PeerId, reason: CloseReason },
}

struct Inner {
    peer: PeerId,
    outgoing: mpsc::Sender<Vec<u8>>,
    connected: AtomicBool,
    shutdown: watch::Sender<bool>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

/// Cloneable handle to one peer connection.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("peer", &self.inner.peer)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Wrap a connected transport and start its receive and write loops.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open<T>(peer: PeerId, transport: T, events: mpsc::UnboundedSender<SessionEvent>) -> Self
    where
        T: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(transport);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let (outgoing, outgoing_rx) = mpsc::channel(SEND_QUEUE);
        let session = Self {
            inner: Arc::new(Inner {
                peer,
                outgoing,
                connected: AtomicBool::new(true),
                shutdown,
                events,
            }),
        };

        debug!(peer = %session.inner.peer, "session opened");
        tokio::spawn(
            session
                .clone()
                .write_loop(writer, outgoing_rx, shutdown_rx.clone()),
        );
        tokio::spawn(session.clone().receive_loop(reader, shutdown_rx));
        session
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.inner.peer
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    /// Encode one envelope and queue it for the write loop. Never waits.
    ///
    /// A full queue means the peer stopped reading: the session is closed
    /// with [`CloseReason::SendFailed`] and
    /// [`ProtocolError::SendFailed`] is returned. Transport errors found
    /// later by the write loop close the session the same way.
    pub fn send(&self, envelope: &Envelope) -> Result<(), ProtocolError> {
        if !self.is_connected() {
            return Err(ProtocolError::SessionClosed);
        }
        let bytes = codec::encode(envelope)?;
        let len = bytes.len();

        match self.inner.outgoing.try_send(bytes) {
            Ok(()) => {
                trace!(peer = %self.inner.peer, kind = envelope.kind(), len, "queued envelope");
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                let reason = format!("send queue full ({SEND_QUEUE} records)");
                warn!(peer = %self.inner.peer, "peer is not reading, closing session");
                self.close(CloseReason::SendFailed(reason.clone()));
                Err(ProtocolError::SendFailed(reason))
            }
            Err(TrySendError::Closed(_)) => Err(ProtocolError::SessionClosed),
        }
    }

    /// Close the session. Idempotent: only the first call has any effect and
    /// emits the `Closed` event.
    ///
    /// Records already queued are still written if the transport accepts
    /// them without waiting; the write side is then shut down.
    pub fn close(&self, reason: CloseReason) {
        if !self.inner.connected.swap(false, Ordering::SeqCst) {
            return;
        }
        let _ = self.inner.shutdown.send(true);

        debug!(peer = %self.inner.peer, %reason, "session closed");
        let _ = self.inner.events.send(SessionEvent::Closed {
            peer: self.inner.peer.clone(),
            reason,
        });
    }

    async fn receive_loop<R>(self, mut reader: R, mut shutdown: watch::Receiver<bool>)
    where
        R: AsyncRead + Unpin,
    {
        let mut decoder = FrameDecoder::new();
        let mut chunk = vec![0u8; READ_CHUNK];

        let reason = loop {
            tokio::select! {
                _ = shutdown.changed() => return,
                read = reader.read(&mut chunk) => match read {
                    Ok(0) => break CloseReason::Eof,
                    Ok(n) => {
                        decoder.extend(&chunk[..n]);
                        while let Some(frame) = decoder.next_envelope() {
                            match frame {
                                Ok(envelope) => {
                                    trace!(peer = %self.inner.peer, kind = envelope.kind(), "received envelope");
                                    let _ = self.inner.events.send(SessionEvent::EnvelopeReceived {
                                        peer: self.inner.peer.clone(),
                                        envelope,
                                    });
                                }
                                Err(e) => {
                                    warn!(peer = %self.inner.peer, error = %e, "dropping undecodable record");
                                }
                            }
                        }
                    }
                    Err(e) => break CloseReason::PeerReset(e.to_string()),
                },
            }
        };

        self.close(reason);
    }

    async fn write_loop<W>(
        self,
        mut writer: W,
        mut outgoing: mpsc::Receiver<Vec<u8>>,
        mut shutdown: watch::Receiver<bool>,
    ) where
        W: AsyncWrite + Unpin,
    {
        loop {
            // Queued records go out before a pending shutdown is noticed.
            let bytes = tokio::select! {
                biased;
                next = outgoing.recv() => match next {
                    Some(bytes) => bytes,
                    None => break,
                },
                _ = shutdown.changed() => break,
            };

            // A write the peer is not draining is abandoned on close.
            let written = tokio::select! {
                biased;
                written = tokio::time::timeout(WRITE_TIMEOUT, write_record(&mut writer, &bytes)) => written,
                _ = shutdown.changed() => break,
            };

            match written {
                Ok(Ok(())) => trace!(peer = %self.inner.peer, len = bytes.len(), "wrote record"),
                Ok(Err(e)) => {
                    warn!(peer = %self.inner.peer, error = %e, "send failed");
                    self.close(CloseReason::SendFailed(e.to_string()));
                    break;
                }
                Err(_) => {
                    warn!(peer = %self.inner.peer, timeout = ?WRITE_TIMEOUT, "write timed out");
                    self.close(CloseReason::SendFailed("write timed out".to_string()));
                    break;
                }
            }
        }

        let _ = tokio::time::timeout(WRITE_TIMEOUT, writer.shutdown()).await;
    }
}

async fn write_record<W>(writer: &mut W, bytes: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(bytes).await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use std::time::Duration;

    use peripheral_share_types::InputEvent;
    use tokio::io::{duplex, ReadBuf};

    use super::*;

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> SessionEvent {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for session event")
            .expect("event channel closed")
    }

    #[tokio::test]
    async fn envelopes_flow_both_ways() {
        let (a_io, b_io) = duplex(64);
        let (a_tx, mut a_rx) = mpsc::unbounded_channel();
        let (b_tx, mut b_rx) = mpsc::unbounded_channel();
        let a = Session::open(PeerId::new("b"), a_io, a_tx);
        let b = Session::open(PeerId::new("a"), b_io, b_tx);

        let event = Envelope::Input(InputEvent::MouseMove { x: 100, y: 200 });
        a.send(&event).unwrap();
        match next_event(&mut b_rx).await {
            SessionEvent::EnvelopeReceived { peer, envelope } => {
                assert_eq!(peer, PeerId::new("a"));
                assert_eq!(envelope, event);
            }
            other => panic!("expected envelope, got {other:?}"),
        }

        b.send(&Envelope::Pong { timestamp: 5 }).unwrap();
        match next_event(&mut a_rx).await {
            SessionEvent::EnvelopeReceived { envelope, .. } => {
                assert_eq!(envelope, Envelope::Pong { timestamp: 5 });
            }
            other => panic!("expected envelope, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn close_twice_emits_one_event() {
        let (a_io, _b_io) = duplex(64);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = Session::open(PeerId::new("peer"), a_io, tx);

        session.close(CloseReason::Local);
        session.close(CloseReason::Local);

        match next_event(&mut rx).await {
            SessionEvent::Closed { reason, .. } => assert_eq!(reason, CloseReason::Local),
            other => panic!("expected Closed, got {other:?}"),
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
        assert!(!session.is_connected());
        assert!(matches!(
            session.send(&Envelope::Ping { timestamp: 1 }),
            Err(ProtocolError::SessionClosed)
        ));
    }

    #[tokio::test]
    async fn peer_close_is_reported_as_eof() {
        let (a_io, b_io) = duplex(64);
        let (a_tx, mut a_rx) = mpsc::unbounded_channel();
        let (b_tx, _b_rx) = mpsc::unbounded_channel();
        let _a = Session::open(PeerId::new("b"), a_io, a_tx);
        let b = Session::open(PeerId::new("a"), b_io, b_tx);

        b.close(CloseReason::Local);
        match next_event(&mut a_rx).await {
            SessionEvent::Closed { reason, .. } => assert_eq!(reason, CloseReason::Eof),
            other => panic!("expected Closed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn partial_reads_and_garbage_are_tolerated() {
        let (a_io, mut raw) = duplex(64);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _session = Session::open(PeerId::new("raw"), a_io, tx);

        raw.write_all(b"garbage\n{\"type\":\"pi").await.unwrap();
        raw.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        raw.write_all(b"ng\",\"timestamp\":11}\n").await.unwrap();

        match next_event(&mut rx).await {
            SessionEvent::EnvelopeReceived { envelope, .. } => {
                assert_eq!(envelope, Envelope::Ping { timestamp: 11 });
            }
            other => panic!("expected envelope, got {other:?}"),
        }
    }

    /// Transport whose reads never complete and whose writes always fail.
    struct BrokenPipe;

    impl AsyncRead for BrokenPipe {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            Poll::Pending
        }
    }

    impl AsyncWrite for BrokenPipe {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            Poll::Ready(Err(std::io::ErrorKind::BrokenPipe.into()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn write_failure_closes_session() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = Session::open(PeerId::new("dead"), BrokenPipe, tx);

        session.send(&Envelope::Ping { timestamp: 1 }).unwrap();
        match next_event(&mut rx).await {
            SessionEvent::Closed { reason, .. } => {
                assert!(matches!(reason, CloseReason::SendFailed(_)));
            }
            other => panic!("expected Closed, got {other:?}"),
        }
        assert!(!session.is_connected());
        assert!(matches!(
            session.send(&Envelope::Ping { timestamp: 2 }),
            Err(ProtocolError::SessionClosed)
        ));
    }

    #[tokio::test]
    async fn peer_that_never_reads_is_dropped() {
        // The far end is kept open but never read from.
        let (local, _stalled) = duplex(64);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = Session::open(PeerId::new("stalled"), local, tx);

        let event = Envelope::Input(InputEvent::MouseMove { x: 500, y: 500 });
        let mut result = Ok(());
        for _ in 0..=SEND_QUEUE + 1 {
            result = session.send(&event);
            if result.is_err() {
                break;
            }
        }
        assert!(matches!(result, Err(ProtocolError::SendFailed(_))));
        assert!(!session.is_connected());

        match next_event(&mut rx).await {
            SessionEvent::Closed { reason, .. } => {
                assert!(matches!(reason, CloseReason::SendFailed(_)));
            }
            other => panic!("expected Closed, got {other:?}"),
        }
    }
}

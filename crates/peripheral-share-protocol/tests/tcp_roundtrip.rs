//! Integration test: sessions over a loopback TCP connection.

use std::net::SocketAddr;
use std::time::Duration;

use peripheral_share_protocol::{
    connect, CloseReason, PeerId, ProtocolError, Session, SessionEvent, TcpTransport,
};
use peripheral_share_types::{Envelope, InputEvent, Key};
use tokio::sync::mpsc;

async fn next_event(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> SessionEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for session event")
        .expect("event channel closed")
}

#[tokio::test]
async fn envelopes_cross_a_tcp_connection() {
    let bind_addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
    let transport = TcpTransport::bind(bind_addr).await.unwrap();
    let server_addr = transport.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, remote) = transport.accept().await.unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = Session::open(PeerId::from(remote), stream, tx);

        let mut received = Vec::new();
        while received.len() < 2 {
            if let SessionEvent::EnvelopeReceived { envelope, .. } = next_event(&mut rx).await {
                received.push(envelope);
            }
        }
        session.send(&Envelope::Pong { timestamp: 99 }).unwrap();
        session.close(CloseReason::Local);
        received
    });

    let stream = connect(server_addr, Duration::from_secs(2)).await.unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let client = Session::open(PeerId::from(server_addr), stream, tx);

    let press = Envelope::Input(InputEvent::KeyPress {
        key: Key::Special("shift".to_string()),
    });
    client.send(&press).unwrap();
    client.send(&Envelope::Ping { timestamp: 99 }).unwrap();

    match next_event(&mut rx).await {
        SessionEvent::EnvelopeReceived { envelope, .. } => {
            assert_eq!(envelope, Envelope::Pong { timestamp: 99 });
        }
        other => panic!("expected pong, got {other:?}"),
    }

    let received = server.await.unwrap();
    assert_eq!(received, vec![press, Envelope::Ping { timestamp: 99 }]);

    // The server closed its session; the client sees end of stream.
    match next_event(&mut rx).await {
        SessionEvent::Closed { reason, .. } => assert_eq!(reason, CloseReason::Eof),
        other => panic!("expected Closed, got {other:?}"),
    }
}

#[tokio::test]
async fn connect_to_closed_port_fails() {
    let transport = TcpTransport::bind("127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    let addr = transport.local_addr().unwrap();
    drop(transport);

    let result = connect(addr, Duration::from_secs(2)).await;
    match result {
        Err(ProtocolError::ConnectFailed { addr: failed, .. }) => assert_eq!(failed, addr),
        other => panic!("expected ConnectFailed, got {other:?}"),
    }
}

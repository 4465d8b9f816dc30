//! TCP transport: bind, accept, and connect.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

use crate::error::ProtocolError;

/// Listening side of the TCP transport.
#[derive(Debug)]
pub struct TcpTransport {
    listener: TcpListener,
}

impl TcpTransport {
    /// Bind a listener on `addr`. Port `0` picks an ephemeral port.
    pub async fn bind(addr: SocketAddr) -> Result<Self, ProtocolError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ProtocolError::Bind { addr, source })?;
        info!(addr = %listener.local_addr().unwrap_or(addr), "TCP transport bound");
        Ok(Self { listener })
    }

    /// Accept an incoming connection.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr), ProtocolError> {
        let (stream, remote) = self.listener.accept().await?;
        stream.set_nodelay(true)?;
        debug!(remote = %remote, "accepted connection");
        Ok((stream, remote))
    }

    /// Get the local address this transport is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ProtocolError> {
        Ok(self.listener.local_addr()?)
    }
}

/// Connect to a remote peer, giving up after `timeout`.
pub async fn connect(addr: SocketAddr, timeout: Duration) -> Result<TcpStream, ProtocolError> {
    let stream = match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => {
            return Err(ProtocolError::ConnectFailed {
                addr,
                reason: e.to_string(),
            })
        }
        Err(_) => {
            return Err(ProtocolError::ConnectFailed {
                addr,
                reason: format!("timed out after {}s", timeout.as_secs_f32()),
            })
        }
    };
    stream.set_nodelay(true)?;
    debug!(remote = %addr, "connected to peer");
    Ok(stream)
}

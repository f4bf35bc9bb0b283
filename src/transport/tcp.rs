//! TCP construction helpers.

use std::net::SocketAddr;

use tokio::net::{TcpStream, ToSocketAddrs};

use crate::config::Config;
use crate::connection::{ConnectionId, SecureConnection};
use crate::error::Result;

impl SecureConnection<TcpStream> {
    /// Wrap an already-connected TCP stream.
    pub fn from_tcp(stream: TcpStream, id: ConnectionId, config: &Config) -> Result<Self> {
        if config.transport.nodelay {
            stream.set_nodelay(true)?;
        }
        if let Ok(peer) = stream.peer_addr() {
            tracing::debug!(connection = id, %peer, "wrapping TCP stream");
        }
        Ok(Self::with_config(stream, id, config))
    }

    /// Connect to `addr` and wrap the resulting stream.
    pub async fn connect(addr: impl ToSocketAddrs, id: ConnectionId, config: &Config) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        Self::from_tcp(stream, id, config)
    }

    /// Remote address of the underlying socket
    pub fn peer_addr(&self) -> Result<SocketAddr> {
        Ok(self.stream().peer_addr()?)
    }
}

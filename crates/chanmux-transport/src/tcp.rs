use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};

use tracing::{debug, info};

use crate::connection::Connection;
use crate::error::{Result, TransportError};

/// Default endpoint used by the command-line tools.
pub const DEFAULT_ADDR: &str = "127.0.0.1:9050";

/// TCP transport.
///
/// Provides bind/accept/connect over TCP. Accepted and connected streams have
/// Nagle's algorithm disabled: frames are written whole, one write per frame.
#[derive(Debug)]
pub struct TcpTransport {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl TcpTransport {
    /// Bind and listen on a TCP address.
    pub fn bind(addr: impl ToSocketAddrs + std::fmt::Debug) -> Result<Self> {
        let label = format!("{addr:?}");
        let listener = TcpListener::bind(&addr).map_err(|source| TransportError::Bind {
            addr: label.clone(),
            source,
        })?;
        let local_addr = listener.local_addr().map_err(|source| TransportError::Bind {
            addr: label,
            source,
        })?;

        info!(%local_addr, "listening on tcp");

        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<Connection> {
        let (stream, peer) = self.listener.accept().map_err(TransportError::Accept)?;
        stream.set_nodelay(true)?;
        info!(%peer, "accepted connection");
        Ok(Connection::from(stream))
    }

    /// Connect to a listening TCP endpoint (blocking).
    pub fn connect(addr: impl ToSocketAddrs + std::fmt::Debug) -> Result<Connection> {
        let stream = TcpStream::connect(&addr).map_err(|source| TransportError::Connect {
            addr: format!("{addr:?}"),
            source,
        })?;
        stream.set_nodelay(true)?;
        debug!(?addr, "connected over tcp");
        Ok(Connection::from(stream))
    }

    /// The address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        "tcp"
    }
}

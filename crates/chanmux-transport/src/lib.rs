//! Connection abstraction for chanmux.
//!
//! Provides one full-duplex byte stream type over the supported transports:
//! - TCP (all platforms)
//! - Unix domain sockets (Linux/macOS)
//!
//! This is the lowest layer of chanmux. The multiplexing engine never touches
//! sockets directly; it consumes a [`SplitStream`], which hands out an owned
//! reader half, an owned writer half, and a [`Shutdown`] closer.

pub mod connection;
pub mod error;
pub mod split;
pub mod tcp;

#[cfg(unix)]
pub mod uds;

pub use connection::Connection;
pub use error::{Result, TransportError};
pub use split::{Shutdown, Split, SplitStream};
pub use tcp::{TcpTransport, DEFAULT_ADDR};

#[cfg(unix)]
pub use uds::UnixDomainSocket;

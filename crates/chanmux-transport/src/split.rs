use std::io::{Read, Write};

use crate::connection::Connection;
use crate::error::Result;

/// Closes a connection from outside the threads blocked on it.
///
/// Implementations must wake any reader or writer currently blocked on the
/// connection's halves.
pub trait Shutdown: Send + Sync {
    fn shutdown(&self) -> Result<()>;
}

impl Shutdown for Connection {
    fn shutdown(&self) -> Result<()> {
        Connection::shutdown(self)
    }
}

impl Shutdown for std::net::TcpStream {
    fn shutdown(&self) -> Result<()> {
        std::net::TcpStream::shutdown(self, std::net::Shutdown::Both).map_err(Into::into)
    }
}

#[cfg(unix)]
impl Shutdown for std::os::unix::net::UnixStream {
    fn shutdown(&self) -> Result<()> {
        std::os::unix::net::UnixStream::shutdown(self, std::net::Shutdown::Both)
            .map_err(Into::into)
    }
}

/// The three independently owned parts of a full-duplex connection.
pub struct Split<R, W> {
    /// Exclusive read half.
    pub reader: R,
    /// Exclusive write half.
    pub writer: W,
    /// Interrupts blocked I/O on both halves.
    pub closer: Box<dyn Shutdown>,
}

/// A full-duplex connection that can be split for two independent pumps.
pub trait SplitStream {
    type Reader: Read + Send + 'static;
    type Writer: Write + Send + 'static;

    fn split(self) -> Result<Split<Self::Reader, Self::Writer>>;
}

impl SplitStream for Connection {
    type Reader = Connection;
    type Writer = Connection;

    fn split(self) -> Result<Split<Connection, Connection>> {
        let reader = self.try_clone()?;
        let closer = self.try_clone()?;
        Ok(Split {
            reader,
            writer: self,
            closer: Box::new(closer),
        })
    }
}

impl SplitStream for std::net::TcpStream {
    type Reader = Connection;
    type Writer = Connection;

    fn split(self) -> Result<Split<Connection, Connection>> {
        Connection::from(self).split()
    }
}

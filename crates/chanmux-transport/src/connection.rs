use std::io::{Read, Write};
use std::net::{Shutdown as NetShutdown, TcpStream};
use std::time::Duration;

use crate::error::Result;

/// A connected full-duplex byte stream over TCP or a Unix domain socket.
///
/// This is the connection type returned by every transport. It is what a
/// multiplexer runs on: one `Connection` carries all channels.
pub struct Connection {
    inner: ConnectionInner,
}

enum ConnectionInner {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            ConnectionInner::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            ConnectionInner::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            ConnectionInner::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            ConnectionInner::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            ConnectionInner::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            ConnectionInner::Unix(stream) => stream.flush(),
        }
    }
}

impl From<TcpStream> for Connection {
    fn from(stream: TcpStream) -> Self {
        Self {
            inner: ConnectionInner::Tcp(stream),
        }
    }
}

#[cfg(unix)]
impl From<std::os::unix::net::UnixStream> for Connection {
    fn from(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: ConnectionInner::Unix(stream),
        }
    }
}

impl Connection {
    /// Create a connected pair of Unix domain socket connections.
    ///
    /// Useful for wiring two multiplexers together in-process.
    #[cfg(unix)]
    pub fn pair() -> Result<(Self, Self)> {
        let (left, right) = std::os::unix::net::UnixStream::pair()?;
        Ok((left.into(), right.into()))
    }

    /// Set read timeout on the underlying stream.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            ConnectionInner::Tcp(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
            #[cfg(unix)]
            ConnectionInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
        }
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            ConnectionInner::Tcp(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
            #[cfg(unix)]
            ConnectionInner::Unix(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
        }
    }

    /// Disable Nagle's algorithm on TCP connections. No-op for other transports.
    pub fn set_nodelay(&self, nodelay: bool) -> Result<()> {
        match &self.inner {
            ConnectionInner::Tcp(stream) => stream.set_nodelay(nodelay).map_err(Into::into),
            #[cfg(unix)]
            ConnectionInner::Unix(_) => Ok(()),
        }
    }

    /// Try to clone this connection (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            ConnectionInner::Tcp(stream) => Ok(stream.try_clone()?.into()),
            #[cfg(unix)]
            ConnectionInner::Unix(stream) => Ok(stream.try_clone()?.into()),
        }
    }

    /// Shut down both directions.
    ///
    /// Any thread blocked reading or writing on a clone of this connection
    /// is woken: reads return EOF, writes fail.
    pub fn shutdown(&self) -> Result<()> {
        let result = match &self.inner {
            ConnectionInner::Tcp(stream) => stream.shutdown(NetShutdown::Both),
            #[cfg(unix)]
            ConnectionInner::Unix(stream) => stream.shutdown(NetShutdown::Both),
        };
        match result {
            Ok(()) => Ok(()),
            // Already disconnected by the peer.
            Err(err) if err.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Human-readable description of the remote end, for logs.
    pub fn peer_label(&self) -> String {
        match &self.inner {
            ConnectionInner::Tcp(stream) => stream
                .peer_addr()
                .map(|addr| format!("tcp://{addr}"))
                .unwrap_or_else(|_| "tcp://<unknown>".to_string()),
            #[cfg(unix)]
            ConnectionInner::Unix(stream) => match stream.peer_addr() {
                Ok(addr) => match addr.as_pathname() {
                    Some(path) => format!("unix://{}", path.display()),
                    None => "unix://<unnamed>".to_string(),
                },
                Err(_) => "unix://<unknown>".to_string(),
            },
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            ConnectionInner::Tcp(_) => f.debug_struct("Connection").field("type", &"tcp").finish(),
            #[cfg(unix)]
            ConnectionInner::Unix(_) => f
                .debug_struct("Connection")
                .field("type", &"unix")
                .finish(),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn pair_is_full_duplex() {
        let (mut left, mut right) = Connection::pair().unwrap();

        left.write_all(b"ping").unwrap();
        let mut buf = [0u8; 4];
        right.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ping");

        right.write_all(b"pong").unwrap();
        left.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"pong");
    }

    #[test]
    fn shutdown_unblocks_reader_on_clone() {
        let (left, _right) = Connection::pair().unwrap();
        let mut reader = left.try_clone().unwrap();

        let blocked = std::thread::spawn(move || {
            let mut buf = [0u8; 8];
            reader.read(&mut buf).unwrap()
        });

        std::thread::sleep(Duration::from_millis(20));
        left.shutdown().unwrap();

        assert_eq!(blocked.join().unwrap(), 0);
    }

    #[test]
    fn shutdown_twice_is_ok() {
        let (left, right) = Connection::pair().unwrap();
        drop(right);
        left.shutdown().unwrap();
        left.shutdown().unwrap();
    }

    #[test]
    fn debug_names_transport() {
        let (left, _right) = Connection::pair().unwrap();
        assert!(format!("{left:?}").contains("unix"));
        assert!(left.peer_label().starts_with("unix://"));
    }
}

use std::fmt;
use std::io;
use std::sync::Arc;

use bytes::Bytes;
use chanmux_frame::ChannelName;
use serde::Serialize;

use crate::buffer::ChannelBuffer;
use crate::error::{MuxError, Result};
use crate::multiplexer::Core;
use crate::outbound::Outgoing;
use crate::registry::Slot;

/// Which way data flows on a channel, from the caller's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    /// Caller writes, the engine transmits.
    SendOnly,
    /// The engine receives, caller reads.
    ReceiveOnly,
    /// Independent inbound and outbound buffers.
    Bidirectional,
}

impl Direction {
    pub fn can_send(self) -> bool {
        matches!(self, Direction::SendOnly | Direction::Bidirectional)
    }

    pub fn can_receive(self) -> bool {
        matches!(self, Direction::ReceiveOnly | Direction::Bidirectional)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::SendOnly => "send-only",
            Direction::ReceiveOnly => "receive-only",
            Direction::Bidirectional => "bidirectional",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-side surface of one channel.
///
/// Clones share the same buffers, so one thread can read while another
/// writes a bidirectional channel. Dropping a handle does not close the
/// channel; call [`close`](Self::close) or
/// [`Multiplexer::close_channel`](crate::Multiplexer::close_channel).
#[derive(Clone)]
pub struct ChannelHandle {
    name: ChannelName,
    direction: Direction,
    generation: u64,
    outbound: Option<ChannelBuffer>,
    inbound: Option<ChannelBuffer>,
    core: Arc<Core>,
}

impl ChannelHandle {
    pub(crate) fn new(name: ChannelName, slot: Slot, core: Arc<Core>) -> Self {
        Self {
            name,
            direction: slot.direction,
            generation: slot.generation,
            outbound: slot.outbound,
            inbound: slot.inbound,
            core,
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn channel_name(&self) -> &ChannelName {
        &self.name
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Queue `data` for transmission, blocking while the outbound buffer is full.
    pub fn write(&self, data: &[u8]) -> Result<()> {
        let buffer = self.outbound("write")?;
        buffer
            .write_notify(data, || {
                self.core.queue.push(Outgoing {
                    name: self.name.clone(),
                    buffer: buffer.clone(),
                });
            })
            .map_err(|_| MuxError::ClosedBuffer(self.name.to_string()))
    }

    /// Read received bytes into `buf`.
    ///
    /// Blocks until at least one byte is available. `Ok(0)` means the channel
    /// was closed and everything received has been read.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.inbound("read")?.read(buf))
    }

    /// Read up to `max` received bytes; `None` at end-of-stream.
    pub fn read_chunk(&self, max: usize) -> Result<Option<Bytes>> {
        Ok(self.inbound("read")?.read_chunk(max))
    }

    /// Block until everything written so far has gone out on the connection.
    ///
    /// A receive-only channel has nothing to flush.
    pub fn flush(&self) -> Result<()> {
        match &self.outbound {
            Some(buffer) => buffer
                .wait_drained()
                .map_err(|_| MuxError::ClosedBuffer(self.name.to_string())),
            None => Ok(()),
        }
    }

    /// Close this channel. Idempotent.
    ///
    /// Blocked readers see end-of-stream, blocked writers fail with
    /// `ClosedBuffer`, and unsent outbound bytes are discarded. If the name
    /// was already reused by a newer channel, that channel is left alone.
    pub fn close(&self) {
        self.core
            .registry
            .remove_generation(self.name.as_str(), self.generation);
        for buffer in [&self.outbound, &self.inbound].into_iter().flatten() {
            buffer.close();
        }
    }

    pub fn is_closed(&self) -> bool {
        [&self.outbound, &self.inbound]
            .into_iter()
            .flatten()
            .any(ChannelBuffer::is_closed)
    }

    fn outbound(&self, operation: &'static str) -> Result<&ChannelBuffer> {
        self.outbound.as_ref().ok_or_else(|| self.wrong_direction(operation))
    }

    fn inbound(&self, operation: &'static str) -> Result<&ChannelBuffer> {
        self.inbound.as_ref().ok_or_else(|| self.wrong_direction(operation))
    }

    fn wrong_direction(&self, operation: &'static str) -> MuxError {
        MuxError::WrongDirection {
            channel: self.name.to_string(),
            direction: self.direction,
            operation,
        }
    }
}

impl fmt::Debug for ChannelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelHandle")
            .field("name", &self.name.as_str())
            .field("direction", &self.direction)
            .field("generation", &self.generation)
            .finish()
    }
}

impl io::Read for ChannelHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        ChannelHandle::read(self, buf).map_err(Into::into)
    }
}

impl io::Write for ChannelHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        ChannelHandle::write(self, buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        ChannelHandle::flush(self).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};

    use super::*;
    use crate::Multiplexer;

    #[test]
    fn direction_capabilities() {
        assert!(Direction::SendOnly.can_send());
        assert!(!Direction::SendOnly.can_receive());
        assert!(Direction::ReceiveOnly.can_receive());
        assert!(!Direction::ReceiveOnly.can_send());
        assert!(Direction::Bidirectional.can_send() && Direction::Bidirectional.can_receive());
        assert_eq!(Direction::Bidirectional.to_string(), "bidirectional");
        assert_eq!(
            serde_json::to_string(&Direction::SendOnly).unwrap(),
            "\"send-only\""
        );
    }

    #[test]
    fn wrong_direction_is_rejected() {
        let mux = Multiplexer::new();
        let tx = mux.create_channel("tx", Direction::SendOnly).unwrap();
        let rx = mux.create_channel("rx", Direction::ReceiveOnly).unwrap();

        let mut buf = [0u8; 4];
        assert!(matches!(
            tx.read(&mut buf),
            Err(MuxError::WrongDirection { operation: "read", .. })
        ));
        assert!(matches!(
            rx.write(b"nope"),
            Err(MuxError::WrongDirection { operation: "write", .. })
        ));
        rx.flush().unwrap();
    }

    #[test]
    fn close_gives_eof_then_closed_buffer_on_write() {
        let mux = Multiplexer::new();
        let mut both = mux.create_channel("both", Direction::Bidirectional).unwrap();

        both.close();
        both.close();
        assert!(both.is_closed());

        let mut out = Vec::new();
        assert_eq!(both.read_to_end(&mut out).unwrap(), 0);
        assert!(matches!(both.write(b"x"), Err(MuxError::ClosedBuffer(_))));

        let io_err = Write::write(&mut both, b"x").unwrap_err();
        assert_eq!(io_err.kind(), io::ErrorKind::BrokenPipe);
        assert!(mux.channel_names().is_empty());
    }

    #[test]
    fn stale_handle_close_leaves_reused_name_alone() {
        let mux = Multiplexer::new();
        let old = mux.create_channel("x", Direction::ReceiveOnly).unwrap();
        old.close();

        let new = mux.create_channel("x", Direction::ReceiveOnly).unwrap();
        old.close();
        assert!(!new.is_closed());
        assert_eq!(mux.channel_names(), vec!["x"]);
    }

    #[test]
    fn debug_shows_name_and_direction() {
        let mux = Multiplexer::new();
        let handle = mux.create_channel("cmd", Direction::SendOnly).unwrap();
        let rendered = format!("{handle:?}");
        assert!(rendered.contains("\"cmd\""));
        assert!(rendered.contains("SendOnly"));
    }
}

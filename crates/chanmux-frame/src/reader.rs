use std::io::{ErrorKind, Read};

use bytes::{Bytes, BytesMut};
use tracing::{trace, warn};

use crate::channel::ChannelName;
use crate::codec::{check_preamble, Frame, FrameConfig, PAYLOAD_LEN_SIZE, PREAMBLE};
use crate::dump::HexDump;
use crate::error::{FrameError, Result};

/// Reads complete frames from any `Read` stream.
///
/// Every field is read with an exact-length read, so the reader never pulls
/// bytes belonging to the next frame off the stream. Partial reads are
/// retried internally, so callers always get complete frames.
pub struct FrameReader<T> {
    inner: T,
    config: FrameConfig,
    skipped: u64,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            config,
            skipped: 0,
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached, at a
    /// frame boundary or in the middle of a frame.
    pub fn read_frame(&mut self) -> Result<Frame> {
        let mut preamble = [0u8; PREAMBLE.len()];
        self.read_exact(&mut preamble)?;
        if let Err(err) = check_preamble(&preamble) {
            if !self.config.resync_on_desync {
                return Err(err);
            }
            self.resync(&mut preamble)?;
        }

        let mut name_len = [0u8; 1];
        self.read_exact(&mut name_len)?;
        let mut name = vec![0u8; name_len[0] as usize];
        self.read_exact(&mut name)?;
        let channel = ChannelName::from_wire(&name)?;

        let mut len_bytes = [0u8; PAYLOAD_LEN_SIZE];
        self.read_exact(&mut len_bytes)?;
        let payload_len = u32::from_be_bytes(len_bytes) as usize;
        if payload_len > self.config.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: payload_len,
                max: self.config.max_payload_size,
            });
        }

        let mut payload = BytesMut::zeroed(payload_len);
        self.read_exact(&mut payload)?;
        let frame = Frame::new(channel, Bytes::from(payload));

        trace!(
            channel = %frame.channel,
            size = frame.payload.len(),
            "read frame\n{}",
            HexDump(&frame.payload)
        );
        Ok(frame)
    }

    /// Slide a 4-byte window forward one byte at a time until it holds the preamble.
    fn resync(&mut self, window: &mut [u8; 4]) -> Result<()> {
        let mut skipped = 0u64;
        while *window != PREAMBLE {
            window.copy_within(1.., 0);
            self.read_exact(&mut window[3..])?;
            skipped += 1;
        }
        self.skipped += skipped;
        warn!(skipped, "resynchronised on frame preamble");
        Ok(())
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0usize;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => filled += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
        Ok(())
    }

    /// Total bytes discarded while resynchronising.
    pub fn skipped_bytes(&self) -> u64 {
        self.skipped
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

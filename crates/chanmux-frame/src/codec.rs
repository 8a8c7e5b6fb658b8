use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::channel::ChannelName;
use crate::error::{FrameError, Result};

/// Magic bytes opening every frame.
pub const PREAMBLE: [u8; 4] = [0xFF, 0x01, 0xFF, 0x01];

/// Size of the channel-name length field.
pub const NAME_LEN_SIZE: usize = 1;

/// Size of the payload length field.
pub const PAYLOAD_LEN_SIZE: usize = 4;

/// Smallest possible frame: preamble, a one-byte name, empty payload.
pub const MIN_FRAME_SIZE: usize = PREAMBLE.len() + NAME_LEN_SIZE + 1 + PAYLOAD_LEN_SIZE;

/// Largest payload the 4-byte length field can describe.
pub const MAX_WIRE_PAYLOAD: usize = u32::MAX as usize;

/// One chunk of one channel's byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The channel this chunk belongs to.
    pub channel: ChannelName,
    /// The chunk itself.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(channel: ChannelName, payload: impl Into<Bytes>) -> Self {
        Self {
            channel,
            payload: payload.into(),
        }
    }

    /// The total wire size of this frame (header + payload).
    pub fn wire_size(&self) -> usize {
        header_size(self.channel.len()) + self.payload.len()
    }
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[frame channel={} payload={}B]",
            self.channel,
            self.payload.len()
        )
    }
}

/// Header size for a frame carrying a name of `name_len` bytes.
pub fn header_size(name_len: usize) -> usize {
    PREAMBLE.len() + NAME_LEN_SIZE + name_len + PAYLOAD_LEN_SIZE
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────┬─────────┬──────────────┬────────────┬──────────────────┐
/// │ Preamble (4B)│ NameLen │ Name         │ PayloadLen │ Payload          │
/// │ FF 01 FF 01  │ (1B)    │ (NameLen B)  │ (4B BE)    │ (PayloadLen B)   │
/// └──────────────┴─────────┴──────────────┴────────────┴──────────────────┘
/// ```
pub fn encode_frame(channel: &ChannelName, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > MAX_WIRE_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_WIRE_PAYLOAD,
        });
    }
    dst.reserve(header_size(channel.len()) + payload.len());
    dst.put_slice(&PREAMBLE);
    // ChannelName guarantees 1..=255 bytes.
    dst.put_u8(channel.len() as u8);
    dst.put_slice(channel.as_bytes());
    dst.put_u32(payload.len() as u32);
    dst.put_slice(payload);
    Ok(())
}

/// Decode a frame from an in-memory buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes exactly the frame's bytes from the buffer.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Frame>> {
    if src.len() < PREAMBLE.len() {
        return Ok(None);
    }
    check_preamble(&src[..PREAMBLE.len()])?;

    if src.len() < PREAMBLE.len() + NAME_LEN_SIZE {
        return Ok(None);
    }
    let name_len = src[PREAMBLE.len()] as usize;
    if name_len == 0 {
        return Err(FrameError::InvalidChannelName {
            name: String::new(),
            reason: "name must not be empty",
        });
    }

    let header = header_size(name_len);
    if src.len() < header {
        return Ok(None);
    }

    let name_start = PREAMBLE.len() + NAME_LEN_SIZE;
    let channel = ChannelName::from_wire(&src[name_start..name_start + name_len])?;

    let mut len_bytes = [0u8; PAYLOAD_LEN_SIZE];
    len_bytes.copy_from_slice(&src[name_start + name_len..header]);
    let payload_len = u32::from_be_bytes(len_bytes) as usize;
    if payload_len > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }

    if src.len() < header + payload_len {
        return Ok(None);
    }

    src.advance(header);
    let payload = src.split_to(payload_len).freeze();

    Ok(Some(Frame { channel, payload }))
}

pub(crate) fn check_preamble(bytes: &[u8]) -> Result<()> {
    if bytes != PREAMBLE {
        let mut found = [0u8; 4];
        found.copy_from_slice(&bytes[..PREAMBLE.len()]);
        return Err(FrameError::ProtocolDesync { found });
    }
    Ok(())
}

/// Configuration for frame reading and writing.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: the wire limit (no extra cap).
    pub max_payload_size: usize,
    /// On a bad preamble, scan forward for the next one instead of failing.
    pub resync_on_desync: bool,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: MAX_WIRE_PAYLOAD,
            resync_on_desync: false,
        }
    }
}

//! Self-delimiting frame codec for named channels.
//!
//! Every chunk of channel data crosses the connection as one frame:
//! - A 4-byte preamble (`FF 01 FF 01`) marking the frame boundary
//! - A 1-byte channel-name length (1-255)
//! - The ASCII channel name
//! - A 4-byte big-endian payload length
//! - The payload
//!
//! [`FrameReader`] reads every field with exact-length reads, so it never
//! consumes bytes past the end of the current frame.

pub mod channel;
pub mod codec;
pub mod dump;
pub mod error;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub mod async_codec;

pub use channel::{ChannelName, MAX_NAME_LEN};
pub use codec::{
    decode_frame, encode_frame, Frame, FrameConfig, MAX_WIRE_PAYLOAD, MIN_FRAME_SIZE, PREAMBLE,
};
pub use dump::HexDump;
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;

#[cfg(feature = "async")]
pub use async_codec::MuxCodec;

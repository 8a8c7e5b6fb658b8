/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The channel name cannot be carried in a frame.
    #[error("invalid channel name {name:?}: {reason}")]
    InvalidChannelName { name: String, reason: &'static str },

    /// The bytes at a frame boundary are not the preamble.
    #[error("protocol desync: expected preamble FF 01 FF 01, found {}", hex4(found))]
    ProtocolDesync { found: [u8; 4] },

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

fn hex4(bytes: &[u8; 4]) -> String {
    format!(
        "{:02X} {:02X} {:02X} {:02X}",
        bytes[0], bytes[1], bytes[2], bytes[3]
    )
}

pub type Result<T> = std::result::Result<T, FrameError>;

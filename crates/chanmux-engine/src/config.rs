use chanmux_frame::{FrameConfig, MAX_WIRE_PAYLOAD};

use crate::error::{MuxError, Result};

/// Default capacity of each channel buffer, in bytes.
pub const DEFAULT_BUFFER_CAPACITY: usize = 0xFFFF;

/// Multiplexer configuration.
#[derive(Debug, Clone)]
pub struct MuxConfig {
    /// Capacity of every channel buffer (each direction has its own). Default: 65535.
    pub buffer_capacity: usize,
    /// Most bytes the outbound pump takes from one channel per turn.
    /// `None` means `buffer_capacity`.
    pub max_chunk: Option<usize>,
    /// Largest inbound payload accepted; a bigger frame drops the connection.
    /// `None` means `buffer_capacity`.
    pub max_payload_size: Option<usize>,
    /// Scan for the next preamble after a desync instead of dropping the connection.
    pub resync_on_desync: bool,
}

impl Default for MuxConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            max_chunk: None,
            max_payload_size: None,
            resync_on_desync: false,
        }
    }
}

impl MuxConfig {
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    pub fn with_max_chunk(mut self, max_chunk: usize) -> Self {
        self.max_chunk = Some(max_chunk);
        self
    }

    pub fn with_max_payload_size(mut self, max_payload_size: usize) -> Self {
        self.max_payload_size = Some(max_payload_size);
        self
    }

    pub fn with_resync(mut self, resync: bool) -> Self {
        self.resync_on_desync = resync;
        self
    }

    /// Chunk size the outbound pump actually uses.
    pub fn effective_max_chunk(&self) -> usize {
        self.max_chunk
            .unwrap_or(self.buffer_capacity)
            .min(MAX_WIRE_PAYLOAD)
    }

    /// Inbound payload limit the frame reader actually enforces.
    pub fn effective_max_payload(&self) -> usize {
        self.max_payload_size
            .unwrap_or(self.buffer_capacity)
            .min(MAX_WIRE_PAYLOAD)
    }

    pub fn validate(&self) -> Result<()> {
        if self.buffer_capacity == 0 {
            return Err(MuxError::InvalidConfig("buffer_capacity must be at least 1"));
        }
        if self.max_chunk == Some(0) {
            return Err(MuxError::InvalidConfig("max_chunk must be at least 1"));
        }
        if self.max_payload_size == Some(0) {
            return Err(MuxError::InvalidConfig("max_payload_size must be at least 1"));
        }
        Ok(())
    }

    pub(crate) fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            max_payload_size: self.effective_max_payload(),
            resync_on_desync: self.resync_on_desync,
        }
    }
}

//! Named logical byte-streams over one full-duplex connection.
//!
//! chanmux lets independent channels, each addressed by a short ASCII name,
//! share a single TCP or Unix socket connection. Every chunk of channel data
//! travels as one self-delimiting frame, and bounded per-channel buffers give
//! blocking backpressure between callers and the connection.
//!
//! # Crate Structure
//!
//! - [`transport`]: connections (TCP, Unix domain sockets) and the split seam
//! - [`frame`]: wire frame codec, channel names, hex dump
//! - [`engine`]: the multiplexer, channel handles and buffers
//!
//! The most used types are re-exported at the crate root.

/// Re-export transport types.
pub mod transport {
    pub use chanmux_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use chanmux_frame::*;
}

/// Re-export engine types.
pub mod engine {
    pub use chanmux_engine::*;
}

pub use chanmux_engine::{
    ChannelHandle, Direction, MuxConfig, MuxError, MuxStats, Multiplexer, Result,
};
pub use chanmux_frame::ChannelName;
pub use chanmux_transport::{Connection, TcpTransport, DEFAULT_ADDR};

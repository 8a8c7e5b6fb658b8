//! Named-channel multiplexing over one full-duplex connection.
//!
//! A [`Multiplexer`] owns a registry of channels, each with one or two
//! bounded buffers, and two pump threads:
//! - the outbound pump takes chunks from channels that have pending data,
//!   round-robin, and writes each chunk as one complete frame;
//! - the inbound pump decodes frames and appends each payload to the named
//!   channel's inbound buffer.
//!
//! Callers only see [`ChannelHandle`]s and never touch the connection.

pub mod buffer;
pub mod config;
pub mod error;
pub mod handle;
pub mod multiplexer;
pub mod stats;

mod inbound;
mod outbound;
mod queue;
mod registry;

pub use buffer::{BufferClosed, ChannelBuffer};
pub use config::{MuxConfig, DEFAULT_BUFFER_CAPACITY};
pub use error::{MuxError, Result};
pub use handle::{ChannelHandle, Direction};
pub use multiplexer::Multiplexer;
pub use stats::MuxStats;

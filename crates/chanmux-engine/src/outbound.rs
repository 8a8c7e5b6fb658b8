//! Outbound pump: the only writer on the shared connection.

use std::io::Write;
use std::sync::Arc;

use chanmux_frame::{ChannelName, FrameWriter};
use tracing::{debug, trace};

use crate::buffer::{ChannelBuffer, Take};
use crate::multiplexer::Core;

/// A channel with outbound bytes waiting, as queued for the pump.
pub(crate) struct Outgoing {
    pub(crate) name: ChannelName,
    pub(crate) buffer: ChannelBuffer,
}

/// Serve the work queue until it is stopped or a write fails.
///
/// Each turn takes at most `max_chunk` bytes from one channel and writes
/// them as one frame. A channel with bytes left over goes back to the tail
/// of the queue, so every queued channel gets a turn before it is served
/// again.
pub(crate) fn run<W: Write>(core: Arc<Core>, mut writer: FrameWriter<W>) {
    let max_chunk = core.config.effective_max_chunk();
    debug!(max_chunk, "outbound pump started");

    while let Some(item) = core.queue.pop() {
        match item.buffer.try_take(max_chunk) {
            Take::Data { chunk, more } => {
                if let Err(err) = writer.send(&item.name, &chunk) {
                    core.connection_failed("write", err.to_string());
                    break;
                }
                core.counters.record_sent(chunk.len());
                item.buffer.finish_take();
                trace!(channel = %item.name, size = chunk.len(), more, "frame sent");

                if more {
                    core.queue.push(item);
                }
            }
            Take::Idle => {}
            Take::Closed => {
                debug!(channel = %item.name, "skipping closed channel");
            }
        }
    }

    debug!("outbound pump stopped");
}

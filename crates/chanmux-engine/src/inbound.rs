//! Inbound pump: the only reader on the shared connection.

use std::io::Read;
use std::sync::Arc;

use chanmux_frame::{FrameError, FrameReader};
use tracing::{debug, trace, warn};

use crate::error::MuxError;
use crate::multiplexer::Core;

/// Decode frames and deliver each payload to its channel until the
/// connection fails or the multiplexer stops.
///
/// Delivery blocks while the target buffer is full, which holds back every
/// other channel on this connection until the reader catches up.
pub(crate) fn run<R: Read>(core: Arc<Core>, mut reader: FrameReader<R>) {
    debug!("inbound pump started");

    loop {
        let frame = match reader.read_frame() {
            Ok(frame) => frame,
            Err(FrameError::ConnectionClosed) => {
                core.connection_failed("read", "connection closed by peer".to_string());
                break;
            }
            Err(err) => {
                core.connection_failed("read", err.to_string());
                break;
            }
        };

        let size = frame.payload.len();
        core.counters.record_received(size);

        let Some(buffer) = core.registry.resolve_inbound(frame.channel.as_str()) else {
            core.counters.record_unknown();
            let err = MuxError::UnknownChannel(frame.channel.into_string());
            warn!(error = %err, size, "dropping inbound frame");
            continue;
        };

        if buffer.write(&frame.payload).is_err() {
            core.counters.record_dropped();
            debug!(channel = %frame.channel, size, "channel closed before delivery");
            continue;
        }
        trace!(channel = %frame.channel, size, "frame delivered");
    }

    debug!("inbound pump stopped");
}

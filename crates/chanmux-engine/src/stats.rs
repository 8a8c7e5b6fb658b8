use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Point-in-time traffic counters for one multiplexer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MuxStats {
    pub frames_sent: u64,
    pub bytes_sent: u64,
    pub frames_received: u64,
    pub bytes_received: u64,
    /// Inbound frames naming no channel with a receiving side.
    pub unknown_channel_frames: u64,
    /// Inbound frames whose channel closed before delivery.
    pub dropped_frames: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    frames_sent: AtomicU64,
    bytes_sent: AtomicU64,
    frames_received: AtomicU64,
    bytes_received: AtomicU64,
    unknown_channel_frames: AtomicU64,
    dropped_frames: AtomicU64,
}

impl Counters {
    pub(crate) fn record_sent(&self, payload_len: usize) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent
            .fetch_add(payload_len as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_received(&self, payload_len: usize) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received
            .fetch_add(payload_len as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_unknown(&self) {
        self.unknown_channel_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> MuxStats {
        MuxStats {
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            unknown_channel_frames: self.unknown_channel_frames.load(Ordering::Relaxed),
            dropped_frames: self.dropped_frames.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_recorded_traffic() {
        let counters = Counters::default();
        counters.record_sent(4);
        counters.record_sent(6);
        counters.record_received(3);
        counters.record_unknown();

        let stats = counters.snapshot();
        assert_eq!(stats.frames_sent, 2);
        assert_eq!(stats.bytes_sent, 10);
        assert_eq!(stats.frames_received, 1);
        assert_eq!(stats.bytes_received, 3);
        assert_eq!(stats.unknown_channel_frames, 1);
        assert_eq!(stats.dropped_frames, 0);
    }

    #[test]
    fn snapshot_serializes_as_flat_object() {
        let json = serde_json::to_value(MuxStats {
            frames_sent: 1,
            ..MuxStats::default()
        })
        .unwrap();
        assert_eq!(json["frames_sent"], 1);
        assert_eq!(json["unknown_channel_frames"], 0);
    }
}

//! Bounded blocking byte buffer.
//!
//! One side of every channel direction is the engine (a pump), the other is
//! the caller. The buffer decouples the two: writers block while it is full,
//! readers block while it is empty, and `close` releases both.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;

/// Returned when writing to (or flushing) a closed buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("buffer closed")]
pub struct BufferClosed;

/// Outcome of a non-blocking take by the outbound pump.
#[derive(Debug)]
pub(crate) enum Take {
    /// A chunk was taken; `more` is true if bytes remain queued.
    Data { chunk: Bytes, more: bool },
    /// Nothing buffered right now.
    Idle,
    /// The buffer is closed; any pending bytes were discarded.
    Closed,
}

/// A fixed-capacity FIFO byte buffer with blocking read/write.
///
/// Cloning yields another handle to the same buffer.
#[derive(Clone)]
pub struct ChannelBuffer {
    shared: Arc<Shared>,
}

struct Shared {
    capacity: usize,
    state: Mutex<State>,
    /// Signalled when data arrives or the buffer closes.
    readable: Condvar,
    /// Signalled when space frees up or the buffer closes.
    writable: Condvar,
}

struct State {
    data: VecDeque<u8>,
    closed: bool,
    /// Set while the buffer sits in (or is being serviced from) the outbound queue.
    scheduled: bool,
    /// A taken chunk has not been written out yet.
    in_flight: bool,
}

impl ChannelBuffer {
    /// Create an empty buffer holding at most `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            shared: Arc::new(Shared {
                capacity,
                state: Mutex::new(State {
                    data: VecDeque::with_capacity(capacity.min(64 * 1024)),
                    closed: false,
                    scheduled: false,
                    in_flight: false,
                }),
                readable: Condvar::new(),
                writable: Condvar::new(),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Bytes currently buffered and not yet read.
    pub fn len(&self) -> usize {
        self.lock().data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Append all of `data`, blocking while the buffer is full.
    ///
    /// Fails if the buffer is closed before every byte was accepted; bytes
    /// accepted before the close stay buffered.
    pub fn write(&self, data: &[u8]) -> Result<(), BufferClosed> {
        self.write_notify(data, || {})
    }

    /// Like [`write`](Self::write), calling `on_ready` (outside the lock)
    /// each time the buffer goes from unscheduled to scheduled.
    pub(crate) fn write_notify(
        &self,
        data: &[u8],
        mut on_ready: impl FnMut(),
    ) -> Result<(), BufferClosed> {
        let mut remaining = data;
        let mut state = self.lock();
        loop {
            if state.closed {
                return Err(BufferClosed);
            }
            if remaining.is_empty() {
                return Ok(());
            }

            let space = self.shared.capacity - state.data.len();
            if space == 0 {
                state = self
                    .shared
                    .writable
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
                continue;
            }

            let n = space.min(remaining.len());
            state.data.extend(&remaining[..n]);
            remaining = &remaining[n..];
            self.shared.readable.notify_all();

            if !state.scheduled {
                state.scheduled = true;
                drop(state);
                on_ready();
                state = self.lock();
            }
        }
    }

    /// Read up to `buf.len()` bytes, blocking only while the buffer is empty.
    ///
    /// Returns as soon as any data exists. Returns 0 once the buffer is
    /// closed and drained (or if `buf` is empty).
    pub fn read(&self, buf: &mut [u8]) -> usize {
        if buf.is_empty() {
            return 0;
        }
        let mut state = self.wait_readable();
        let n = buf.len().min(state.data.len());
        for (dst, src) in buf.iter_mut().zip(state.data.drain(..n)) {
            *dst = src;
        }
        if n > 0 {
            self.shared.writable.notify_all();
        }
        n
    }

    /// Read up to `max` bytes as one chunk; `None` means end-of-stream.
    pub fn read_chunk(&self, max: usize) -> Option<Bytes> {
        if max == 0 {
            return Some(Bytes::new());
        }
        let mut state = self.wait_readable();
        if state.data.is_empty() {
            return None;
        }
        let n = max.min(state.data.len());
        let chunk: Vec<u8> = state.data.drain(..n).collect();
        self.shared.writable.notify_all();
        Some(Bytes::from(chunk))
    }

    /// Take up to `max` bytes without blocking.
    ///
    /// Clears the scheduled flag when nothing is left, so the next write
    /// reschedules the buffer.
    pub(crate) fn try_take(&self, max: usize) -> Take {
        let mut state = self.lock();
        if state.closed {
            state.data.clear();
            state.scheduled = false;
            return Take::Closed;
        }
        if state.data.is_empty() {
            state.scheduled = false;
            return Take::Idle;
        }

        let n = max.max(1).min(state.data.len());
        let chunk: Vec<u8> = state.data.drain(..n).collect();
        let more = !state.data.is_empty();
        if !more {
            state.scheduled = false;
        }
        state.in_flight = true;
        self.shared.writable.notify_all();
        Take::Data {
            chunk: Bytes::from(chunk),
            more,
        }
    }

    /// Mark the chunk returned by the last [`try_take`](Self::try_take) as written.
    pub(crate) fn finish_take(&self) {
        let mut state = self.lock();
        state.in_flight = false;
        drop(state);
        self.shared.writable.notify_all();
    }

    /// Block until every buffered byte has been taken and written out by the
    /// other side.
    pub fn wait_drained(&self) -> Result<(), BufferClosed> {
        let mut state = self.lock();
        loop {
            if state.data.is_empty() && !state.in_flight {
                return Ok(());
            }
            if state.closed {
                return Err(BufferClosed);
            }
            state = self
                .shared
                .writable
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Close the buffer, waking every blocked reader and writer.
    ///
    /// Idempotent. Buffered bytes remain readable until drained.
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        drop(state);
        self.shared.readable.notify_all();
        self.shared.writable.notify_all();
    }

    fn wait_readable(&self) -> MutexGuard<'_, State> {
        let mut state = self.lock();
        while state.data.is_empty() && !state.closed {
            state = self
                .shared
                .readable
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ChannelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("ChannelBuffer")
            .field("capacity", &self.shared.capacity)
            .field("len", &state.data.len())
            .field("closed", &state.closed)
            .finish()
    }
}

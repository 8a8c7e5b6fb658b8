use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chanmux_frame::ChannelName;
use tracing::debug;

use crate::buffer::ChannelBuffer;
use crate::error::{MuxError, Result};
use crate::handle::Direction;

/// Buffers owned by one live channel.
#[derive(Debug, Clone)]
pub(crate) struct Slot {
    pub(crate) generation: u64,
    pub(crate) direction: Direction,
    pub(crate) outbound: Option<ChannelBuffer>,
    pub(crate) inbound: Option<ChannelBuffer>,
}

impl Slot {
    fn close(&self) {
        if let Some(buffer) = &self.outbound {
            buffer.close();
        }
        if let Some(buffer) = &self.inbound {
            buffer.close();
        }
    }
}

/// Name to buffer-pair mapping with unique names.
///
/// Every create gets a fresh generation number, so a handle from a closed
/// channel can never close a newer channel that reused the name.
pub(crate) struct Registry {
    capacity: usize,
    state: Mutex<RegistryState>,
}

struct RegistryState {
    channels: HashMap<ChannelName, Slot>,
    next_generation: u64,
    closed: bool,
}

impl Registry {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(RegistryState {
                channels: HashMap::new(),
                next_generation: 1,
                closed: false,
            }),
        }
    }

    pub(crate) fn insert(&self, name: &ChannelName, direction: Direction) -> Result<Slot> {
        let mut state = self.lock();
        if state.closed {
            return Err(MuxError::Stopped);
        }
        if state.channels.contains_key(name) {
            return Err(MuxError::DuplicateChannel(name.to_string()));
        }

        let generation = state.next_generation;
        state.next_generation += 1;

        let slot = Slot {
            generation,
            direction,
            outbound: direction
                .can_send()
                .then(|| ChannelBuffer::new(self.capacity)),
            inbound: direction
                .can_receive()
                .then(|| ChannelBuffer::new(self.capacity)),
        };
        state.channels.insert(name.clone(), slot.clone());
        debug!(channel = %name, %direction, generation, "channel registered");
        Ok(slot)
    }

    /// Remove and close a channel. Returns false if no such channel exists.
    pub(crate) fn remove(&self, name: &str) -> bool {
        let removed = self.lock().channels.remove(name);
        match removed {
            Some(slot) => {
                slot.close();
                debug!(channel = name, generation = slot.generation, "channel closed");
                true
            }
            None => false,
        }
    }

    /// Remove a channel only if it is still the given generation.
    pub(crate) fn remove_generation(&self, name: &str, generation: u64) -> bool {
        let mut state = self.lock();
        match state.channels.get(name) {
            Some(slot) if slot.generation == generation => {}
            _ => return false,
        }
        let removed = state.channels.remove(name);
        drop(state);

        if let Some(slot) = removed {
            slot.close();
            debug!(channel = name, generation, "channel closed");
        }
        true
    }

    /// Inbound buffer for frames addressed to `name`, if it can receive.
    pub(crate) fn resolve_inbound(&self, name: &str) -> Option<ChannelBuffer> {
        self.lock()
            .channels
            .get(name)
            .and_then(|slot| slot.inbound.clone())
    }

    /// Close every channel and refuse new ones.
    pub(crate) fn close_all(&self) {
        let drained: Vec<(ChannelName, Slot)> = {
            let mut state = self.lock();
            state.closed = true;
            state.channels.drain().collect()
        };
        for (name, slot) in drained {
            slot.close();
            debug!(channel = %name, "channel closed by shutdown");
        }
    }

    /// Sorted names of the live channels.
    pub(crate) fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .lock()
            .channels
            .keys()
            .map(|name| name.to_string())
            .collect();
        names.sort();
        names
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> ChannelName {
        ChannelName::new(s).unwrap()
    }

    #[test]
    fn buffers_follow_direction() {
        let registry = Registry::new(16);

        let send = registry.insert(&name("tx"), Direction::SendOnly).unwrap();
        assert!(send.outbound.is_some() && send.inbound.is_none());

        let recv = registry.insert(&name("rx"), Direction::ReceiveOnly).unwrap();
        assert!(recv.outbound.is_none() && recv.inbound.is_some());

        let both = registry
            .insert(&name("both"), Direction::Bidirectional)
            .unwrap();
        assert!(both.outbound.is_some() && both.inbound.is_some());
        assert_eq!(both.inbound.as_ref().unwrap().capacity(), 16);

        assert_eq!(registry.names(), vec!["both", "rx", "tx"]);
    }

    #[test]
    fn duplicate_name_rejected() {
        let registry = Registry::new(16);
        registry.insert(&name("cmd"), Direction::SendOnly).unwrap();
        let err = registry
            .insert(&name("cmd"), Direction::ReceiveOnly)
            .unwrap_err();
        assert!(matches!(err, MuxError::DuplicateChannel(n) if n == "cmd"));
    }

    #[test]
    fn remove_closes_buffers_and_frees_name() {
        let registry = Registry::new(16);
        let slot = registry
            .insert(&name("cmd"), Direction::Bidirectional)
            .unwrap();

        assert!(registry.remove("cmd"));
        assert!(!registry.remove("cmd"));
        assert!(slot.inbound.unwrap().is_closed());
        assert!(slot.outbound.unwrap().is_closed());
        assert!(registry.resolve_inbound("cmd").is_none());

        registry.insert(&name("cmd"), Direction::SendOnly).unwrap();
    }

    #[test]
    fn stale_generation_does_not_remove_new_channel() {
        let registry = Registry::new(16);
        let old = registry.insert(&name("x"), Direction::ReceiveOnly).unwrap();
        registry.remove("x");
        let new = registry.insert(&name("x"), Direction::ReceiveOnly).unwrap();
        assert_ne!(old.generation, new.generation);

        assert!(!registry.remove_generation("x", old.generation));
        assert!(registry.resolve_inbound("x").is_some());
        assert!(registry.remove_generation("x", new.generation));
        assert!(registry.resolve_inbound("x").is_none());
    }

    #[test]
    fn send_only_channel_has_no_inbound_side() {
        let registry = Registry::new(16);
        registry.insert(&name("tx"), Direction::SendOnly).unwrap();
        assert!(registry.resolve_inbound("tx").is_none());
    }

    #[test]
    fn close_all_refuses_new_channels() {
        let registry = Registry::new(16);
        let slot = registry.insert(&name("a"), Direction::ReceiveOnly).unwrap();
        registry.close_all();

        assert!(slot.inbound.unwrap().is_closed());
        assert!(registry.names().is_empty());
        assert!(matches!(
            registry.insert(&name("b"), Direction::SendOnly),
            Err(MuxError::Stopped)
        ));
    }
}

//! Pending payload slots shared by the front-end and the engine.
//!
//! A payload (a disk or ROM path) is stored before the command that refers to
//! it is pushed, and taken by the engine when it applies that command.

use bridge_protocol::PayloadSlot;
use parking_lot::Mutex;

const SLOT_COUNT: usize = PayloadSlot::ALL.len();

#[derive(Debug, Default)]
pub struct PendingPayloadStore {
    slots: [Mutex<Option<String>>; SLOT_COUNT],
}

impl PendingPayloadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value`, dropping whatever the slot held before.
    pub fn set(&self, slot: PayloadSlot, value: impl Into<String>) {
        let value = value.into();
        let previous = self.slots[slot.index()].lock().replace(value);
        if previous.is_some() {
            tracing::debug!(?slot, "replaced unconsumed payload");
        }
    }

    /// Removes and returns the slot's value.
    pub fn take(&self, slot: PayloadSlot) -> Option<String> {
        self.slots[slot.index()].lock().take()
    }

    pub fn is_set(&self, slot: PayloadSlot) -> bool {
        self.slots[slot.index()].lock().is_some()
    }

    /// Empties every slot.
    pub fn clear(&self) {
        for slot in &self.slots {
            slot.lock().take();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_protocol::Drive;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn last_write_wins_and_take_clears() {
        let store = PendingPayloadStore::new();
        let slot = PayloadSlot::Drive(Drive::Df0);
        store.set(slot, "v1");
        store.set(slot, "v2");
        assert_eq!(store.take(slot).as_deref(), Some("v2"));
        assert_eq!(store.take(slot), None);
    }

    #[test]
    fn slots_are_independent() {
        let store = PendingPayloadStore::new();
        store.set(PayloadSlot::Rom, "kick.rom");
        store.set(PayloadSlot::Drive(Drive::Df1), "b.adf");

        assert!(!store.is_set(PayloadSlot::Drive(Drive::Df0)));
        assert_eq!(store.take(PayloadSlot::Rom).as_deref(), Some("kick.rom"));
        assert!(store.is_set(PayloadSlot::Drive(Drive::Df1)));

        store.clear();
        assert!(!store.is_set(PayloadSlot::Drive(Drive::Df1)));
    }

    #[test]
    fn concurrent_writers_never_expose_partial_values() {
        let store = Arc::new(PendingPayloadStore::new());
        let slot = PayloadSlot::Rom;
        let values: Vec<String> = (0..8).map(|i| format!("{i}").repeat(256)).collect();

        let writers: Vec<_> = values
            .iter()
            .cloned()
            .map(|value| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..200 {
                        store.set(slot, value.clone());
                    }
                })
            })
            .collect();

        for _ in 0..2_000 {
            if let Some(seen) = store.take(slot) {
                assert!(values.contains(&seen), "torn payload");
            }
        }
        for writer in writers {
            writer.join().unwrap();
        }
    }
}

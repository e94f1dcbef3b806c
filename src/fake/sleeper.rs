//! Sleepers and the dense pending registry.
//!
//! Sleeper records live in a slab so that timers and tickers can hold a
//! stable key. The pending registry is a dense `Vec` of keys; each record
//! remembers its own position in that vector, which makes cancelling an
//! arbitrary sleeper a swap-remove plus one back-pointer fix-up.

use crate::channel::Sender;
use crate::clock::Callback;
use crate::types::Time;
use slab::Slab;
use std::fmt;

/// Stable handle to a sleeper record.
pub(crate) type SleeperKey = usize;

/// Who releases a sleeper record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Ownership {
    /// A timer or ticker handle; released when the handle lets go.
    Held,
    /// Nobody; the registry releases the record once it fires.
    Ephemeral,
}

/// One pending wake: a deadline plus what to do when it is reached.
pub(crate) struct Sleeper {
    pub(crate) deadline: Time,
    pub(crate) slot: Option<Sender<Time>>,
    pub(crate) callback: Option<Callback>,
    pub(crate) woken: bool,
    /// Set by `FakeTimer::stop`; cleared by a reset.
    pub(crate) stopped: bool,
    pub(crate) ownership: Ownership,
    /// Index into the pending vector, `None` while unregistered.
    position: Option<usize>,
}

impl Sleeper {
    /// A sleeper that delivers its deadline into `slot`.
    pub(crate) fn delivering(deadline: Time, slot: Sender<Time>, ownership: Ownership) -> Self {
        Self {
            deadline,
            slot: Some(slot),
            callback: None,
            woken: false,
            stopped: false,
            ownership,
            position: None,
        }
    }

    /// A sleeper that runs `callback` when it fires.
    pub(crate) fn calling(deadline: Time, callback: Callback, ownership: Ownership) -> Self {
        Self {
            deadline,
            slot: None,
            callback: Some(callback),
            woken: false,
            stopped: false,
            ownership,
            position: None,
        }
    }

    /// Returns true while the sleeper sits in the pending registry.
    pub(crate) const fn is_pending(&self) -> bool {
        self.position.is_some()
    }
}

impl fmt::Debug for Sleeper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sleeper")
            .field("deadline", &self.deadline)
            .field("delivers", &self.slot.is_some())
            .field("calls", &self.callback.is_some())
            .field("woken", &self.woken)
            .field("stopped", &self.stopped)
            .field("ownership", &self.ownership)
            .field("position", &self.position)
            .finish()
    }
}

/// Arena of sleeper records plus the dense list of pending ones.
#[derive(Debug, Default)]
pub(crate) struct SleeperRegistry {
    arena: Slab<Sleeper>,
    pending: Vec<SleeperKey>,
}

impl SleeperRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Number of pending sleepers.
    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of live sleeper records, pending or not.
    #[cfg(test)]
    pub(crate) fn record_count(&self) -> usize {
        self.arena.len()
    }

    /// Stores a new, unregistered record.
    pub(crate) fn insert(&mut self, sleeper: Sleeper) -> SleeperKey {
        self.arena.insert(sleeper)
    }

    pub(crate) fn get(&self, key: SleeperKey) -> Option<&Sleeper> {
        self.arena.get(key)
    }

    pub(crate) fn get_mut(&mut self, key: SleeperKey) -> Option<&mut Sleeper> {
        self.arena.get_mut(key)
    }

    /// Appends `key` to the pending list and records its position.
    ///
    /// Does nothing if the record is gone or already pending.
    pub(crate) fn push_pending(&mut self, key: SleeperKey) -> bool {
        let position = self.pending.len();
        match self.arena.get_mut(key) {
            Some(sleeper) if sleeper.position.is_none() => {
                sleeper.position = Some(position);
                self.pending.push(key);
                true
            }
            _ => false,
        }
    }

    /// Takes `key` out of the pending list in O(1).
    ///
    /// The last pending key is moved into the vacated position and its record
    /// updated. Returns whether the sleeper was pending.
    pub(crate) fn remove_pending(&mut self, key: SleeperKey) -> bool {
        let Some(position) = self.arena.get_mut(key).and_then(|s| s.position.take()) else {
            return false;
        };
        self.pending.swap_remove(position);
        if let Some(&moved) = self.pending.get(position) {
            if let Some(sleeper) = self.arena.get_mut(moved) {
                sleeper.position = Some(position);
            }
        }
        true
    }

    /// Empties the pending list, marking every record unregistered, and
    /// returns the keys in their former order.
    pub(crate) fn drain_pending(&mut self) -> Vec<SleeperKey> {
        let keys = std::mem::take(&mut self.pending);
        for &key in &keys {
            if let Some(sleeper) = self.arena.get_mut(key) {
                sleeper.position = None;
            }
        }
        keys
    }

    /// Drops a record outright. Returns whether it was pending.
    pub(crate) fn release(&mut self, key: SleeperKey) -> bool {
        let was_pending = self.remove_pending(key);
        if self.arena.contains(key) {
            self.arena.remove(key);
        }
        was_pending
    }

    /// Hands a record over to the registry.
    ///
    /// A pending record becomes ephemeral so it still fires for whoever holds
    /// its channel; anything else is released immediately.
    pub(crate) fn disown(&mut self, key: SleeperKey) {
        match self.arena.get_mut(key) {
            Some(sleeper) if sleeper.is_pending() => sleeper.ownership = Ownership::Ephemeral,
            Some(_) => {
                self.arena.remove(key);
            }
            None => {}
        }
    }

    /// Checks the position back-pointers against the pending list.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        for (position, &key) in self.pending.iter().enumerate() {
            let sleeper = self.arena.get(key).expect("pending key has a record");
            assert_eq!(sleeper.position, Some(position), "back-pointer of {key}");
        }
        let registered = self.arena.iter().filter(|(_, s)| s.is_pending()).count();
        assert_eq!(registered, self.pending.len(), "no stray positions");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::slot;

    fn sleeper_at(secs: u64) -> Sleeper {
        let (tx, _rx) = slot();
        Sleeper::delivering(Time::from_secs(secs), tx, Ownership::Held)
    }

    #[test]
    fn push_pending_records_positions() {
        let mut registry = SleeperRegistry::new();
        let a = registry.insert(sleeper_at(1));
        let b = registry.insert(sleeper_at(2));
        assert!(registry.push_pending(a));
        assert!(registry.push_pending(b));
        assert!(!registry.push_pending(a), "already pending");
        assert_eq!(registry.pending_len(), 2);
        registry.assert_consistent();
    }

    #[test]
    fn remove_pending_swaps_last_into_hole() {
        let mut registry = SleeperRegistry::new();
        let keys: Vec<_> = (1..=4).map(|s| registry.insert(sleeper_at(s))).collect();
        for &key in &keys {
            registry.push_pending(key);
        }

        assert!(registry.remove_pending(keys[1]));
        registry.assert_consistent();
        assert_eq!(registry.pending_len(), 3);
        assert!(!registry.get(keys[1]).expect("record kept").is_pending());

        assert!(!registry.remove_pending(keys[1]), "second removal reports not pending");

        assert!(registry.remove_pending(keys[3]));
        assert!(registry.remove_pending(keys[0]));
        assert!(registry.remove_pending(keys[2]));
        assert_eq!(registry.pending_len(), 0);
        registry.assert_consistent();
    }

    #[test]
    fn drain_pending_unregisters_everything() {
        let mut registry = SleeperRegistry::new();
        let a = registry.insert(sleeper_at(1));
        let b = registry.insert(sleeper_at(2));
        registry.push_pending(a);
        registry.push_pending(b);

        let drained = registry.drain_pending();
        assert_eq!(drained, vec![a, b]);
        assert_eq!(registry.pending_len(), 0);
        assert!(!registry.get(a).expect("record").is_pending());
        registry.assert_consistent();
    }

    #[test]
    fn release_and_disown() {
        let mut registry = SleeperRegistry::new();
        let pending = registry.insert(sleeper_at(1));
        let idle = registry.insert(sleeper_at(2));
        registry.push_pending(pending);

        registry.disown(pending);
        assert_eq!(
            registry.get(pending).expect("still pending").ownership,
            Ownership::Ephemeral
        );
        registry.disown(idle);
        assert!(registry.get(idle).is_none(), "idle record released");

        assert!(registry.release(pending));
        assert_eq!(registry.record_count(), 0);
        registry.assert_consistent();
    }
}

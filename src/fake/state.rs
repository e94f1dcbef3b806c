//! Fake clock scheduling state.
//!
//! [`ClockState`] is the single unit guarded by the clock's lock: the current
//! virtual instant, the sleeper registry and the blocker registry. Every
//! mutation that would wake somebody appends a [`Fire`] to a [`FireBatch`]
//! instead; the caller dispatches the batch once the lock is released, so no
//! user callback or waiter ever runs under the clock lock.

use super::blocker::BlockerRegistry;
use super::sleeper::{Ownership, Sleeper, SleeperKey, SleeperRegistry};
use crate::channel::{Latch, Sender};
use crate::clock::Callback;
use crate::tracing_compat::{debug, trace, warn};
use crate::types::Time;
use smallvec::SmallVec;
use std::fmt;
use std::thread;
use std::time::Duration;

/// One wake-up produced under the clock lock.
pub(crate) enum Fire {
    /// Deliver a sleeper's deadline into its slot.
    Deliver { slot: Sender<Time>, at: Time },
    /// Run a callback on its own thread.
    Call { callback: Callback, at: Time },
    /// Signal a satisfied blocker.
    Open(Latch),
}

impl fmt::Debug for Fire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deliver { at, .. } => f.debug_struct("Deliver").field("at", at).finish(),
            Self::Call { at, .. } => f.debug_struct("Call").field("at", at).finish(),
            Self::Open(latch) => f.debug_tuple("Open").field(latch).finish(),
        }
    }
}

/// Wake-ups collected while holding the clock lock.
#[derive(Debug, Default)]
pub(crate) struct FireBatch {
    fires: SmallVec<[Fire; 4]>,
}

impl FireBatch {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, fire: Fire) {
        self.fires.push(fire);
    }

    pub(crate) fn len(&self) -> usize {
        self.fires.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.fires.is_empty()
    }

    /// Performs every collected wake-up. Must be called without the clock
    /// lock held.
    #[cfg_attr(not(feature = "tracing-integration"), allow(unused_variables))]
    pub(crate) fn dispatch(self, callback_thread_name: &str) {
        for fire in self.fires {
            match fire {
                Fire::Deliver { slot, at } => {
                    if !slot.offer(at) {
                        trace!(%at, "delivery slot full, dropping value");
                    }
                }
                Fire::Call { callback, at } => {
                    let spawned = thread::Builder::new()
                        .name(callback_thread_name.to_string())
                        .spawn(move || callback());
                    if let Err(err) = spawned {
                        warn!(%at, error = %err, "failed to spawn fake clock callback thread");
                    }
                }
                Fire::Open(latch) => {
                    latch.open();
                }
            }
        }
    }
}

/// Clock instant plus both registries, mutated as one unit.
#[derive(Debug)]
pub(crate) struct ClockState {
    now: Time,
    sleepers: SleeperRegistry,
    blockers: BlockerRegistry,
}

impl ClockState {
    pub(crate) fn new(start: Time) -> Self {
        Self {
            now: start,
            sleepers: SleeperRegistry::new(),
            blockers: BlockerRegistry::new(),
        }
    }

    pub(crate) const fn now(&self) -> Time {
        self.now
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.sleepers.pending_len()
    }

    pub(crate) fn blocker_count(&self) -> usize {
        self.blockers.len()
    }

    pub(crate) fn sleeper(&self, key: SleeperKey) -> Option<&Sleeper> {
        self.sleepers.get(key)
    }

    pub(crate) fn sleeper_mut(&mut self, key: SleeperKey) -> Option<&mut Sleeper> {
        self.sleepers.get_mut(key)
    }

    /// Stores a sleeper without registering it.
    pub(crate) fn insert(&mut self, sleeper: Sleeper) -> SleeperKey {
        self.sleepers.insert(sleeper)
    }

    /// Creates an ephemeral sleeper delivering into `slot` and registers it.
    pub(crate) fn schedule_delivery(
        &mut self,
        deadline: Time,
        slot: Sender<Time>,
        batch: &mut FireBatch,
    ) -> bool {
        let key = self.insert(Sleeper::delivering(deadline, slot, Ownership::Ephemeral));
        self.register(key, batch)
    }

    /// Files a sleeper against the current instant.
    ///
    /// A sleeper whose deadline is not strictly in the future fires at once;
    /// otherwise it joins the pending registry and blockers are rechecked.
    /// Returns whether the sleeper is now pending.
    pub(crate) fn register(&mut self, key: SleeperKey, batch: &mut FireBatch) -> bool {
        let Some(sleeper) = self.sleepers.get(key) else {
            return false;
        };
        let deadline = sleeper.deadline;
        if deadline <= self.now {
            self.wake(key, batch);
            return false;
        }
        if !self.sleepers.push_pending(key) {
            return true;
        }
        trace!(key, %deadline, pending = self.sleepers.pending_len(), "registered sleeper");
        self.check_blockers(batch);
        true
    }

    /// Takes a sleeper out of the pending registry. Returns whether it was
    /// pending.
    pub(crate) fn remove(&mut self, key: SleeperKey, batch: &mut FireBatch) -> bool {
        let removed = self.sleepers.remove_pending(key);
        if removed {
            trace!(key, pending = self.sleepers.pending_len(), "removed sleeper");
            self.check_blockers(batch);
        }
        removed
    }

    /// Deletes a sleeper record, unregistering it first if needed.
    pub(crate) fn release(&mut self, key: SleeperKey, batch: &mut FireBatch) -> bool {
        let was_pending = self.remove(key, batch);
        self.sleepers.release(key);
        was_pending
    }

    /// Gives up ownership of a sleeper; see [`SleeperRegistry::disown`].
    pub(crate) fn disown(&mut self, key: SleeperKey) {
        self.sleepers.disown(key);
    }

    /// Moves virtual time forward by `delta` and fires everything now due.
    ///
    /// A zero delta does nothing.
    #[cfg_attr(not(feature = "tracing-integration"), allow(unused_variables))]
    pub(crate) fn advance(&mut self, delta: Duration, batch: &mut FireBatch) {
        if delta.is_zero() {
            return;
        }
        let before = batch.len();
        self.now += delta;
        for key in self.sleepers.drain_pending() {
            self.register(key, batch);
        }
        debug!(
            now = %self.now,
            delta_ns = crate::types::duration_to_nanos_saturating(delta),
            fired = batch.len() - before,
            pending = self.sleepers.pending_len(),
            "advanced fake clock"
        );
    }

    /// Moves virtual time forward to `target`. Instants at or before the
    /// current one are ignored.
    pub(crate) fn advance_to(&mut self, target: Time, batch: &mut FireBatch) {
        if let Some(delta) = target.checked_duration_since(self.now) {
            self.advance(delta, batch);
        }
    }

    /// Returns a latch that opens once at least `n` sleepers are pending.
    pub(crate) fn wait_for_count(&mut self, n: usize) -> Latch {
        let pending = self.sleepers.pending_len();
        if pending >= n {
            return Latch::opened();
        }
        trace!(threshold = n, pending, "registered blocker");
        self.blockers.push(n)
    }

    fn wake(&mut self, key: SleeperKey, batch: &mut FireBatch) {
        let Some(sleeper) = self.sleepers.get_mut(key) else {
            return;
        };
        if sleeper.woken {
            return;
        }
        sleeper.woken = true;
        let at = sleeper.deadline;
        if let Some(slot) = &sleeper.slot {
            batch.push(Fire::Deliver {
                slot: slot.clone(),
                at,
            });
        }
        if let Some(callback) = &sleeper.callback {
            batch.push(Fire::Call {
                callback: callback.clone(),
                at,
            });
        }
        let ephemeral = sleeper.ownership == Ownership::Ephemeral;
        if ephemeral {
            self.sleepers.release(key);
        }
        trace!(key, %at, ephemeral, "fired sleeper");
    }

    fn check_blockers(&mut self, batch: &mut FireBatch) {
        let pending = self.sleepers.pending_len();
        let satisfied = self.blockers.satisfy(pending, batch);
        if satisfied > 0 {
            debug!(pending, satisfied, "blockers satisfied");
        }
    }

    #[cfg(test)]
    pub(crate) fn record_count(&self) -> usize {
        self.sleepers.record_count()
    }

    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        self.sleepers.assert_consistent();
    }
}

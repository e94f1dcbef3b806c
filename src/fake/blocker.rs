//! Threshold waiters on the pending-sleeper count.

use super::state::{Fire, FireBatch};
use crate::channel::Latch;

/// Waits for the pending count to reach `threshold`.
#[derive(Debug)]
struct Blocker {
    threshold: usize,
    done: Latch,
}

/// Unsatisfied blockers, in creation order.
#[derive(Debug, Default)]
pub(crate) struct BlockerRegistry {
    waiting: Vec<Blocker>,
}

impl BlockerRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.waiting.len()
    }

    /// Registers a blocker for `threshold` and returns its latch.
    ///
    /// The caller has already checked that the threshold is not yet met.
    pub(crate) fn push(&mut self, threshold: usize) -> Latch {
        let done = Latch::new();
        self.waiting.push(Blocker {
            threshold,
            done: done.clone(),
        });
        done
    }

    /// Removes every blocker whose threshold is met by `pending` and queues
    /// its latch to be opened.
    pub(crate) fn satisfy(&mut self, pending: usize, batch: &mut FireBatch) -> usize {
        let before = self.waiting.len();
        self.waiting.retain(|blocker| {
            if pending >= blocker.threshold {
                batch.push(Fire::Open(blocker.done.clone()));
                false
            } else {
                true
            }
        });
        before - self.waiting.len()
    }
}

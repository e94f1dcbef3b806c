//! Single-shot fake timers.

use super::FakeClock;
use super::sleeper::SleeperKey;
use crate::channel::{Receiver, Sender, slot};
use crate::clock::Timer;
use crate::tracing_compat::debug;
use crate::types::Time;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Delivers its deadline on [`FakeTimer::c`]; armed on first request.
    Channel,
    /// Runs a callback; armed at creation and on every reset.
    Callback,
}

/// Timer handed out by [`FakeClock::new_timer`] and [`FakeClock::after_fn`].
///
/// The timer owns one sleeper record for its whole life. Stopping and
/// resetting edit that record in place under the clock lock.
pub struct FakeTimer {
    clock: FakeClock,
    key: SleeperKey,
    mode: Mode,
}

impl FakeTimer {
    pub(super) fn channel(clock: FakeClock, key: SleeperKey) -> Self {
        Self {
            clock,
            key,
            mode: Mode::Channel,
        }
    }

    pub(super) fn callback(clock: FakeClock, key: SleeperKey) -> Self {
        Self {
            clock,
            key,
            mode: Mode::Callback,
        }
    }

    /// Returns the expiry channel, arming the timer on first use.
    ///
    /// Repeated requests return the same channel. A stopped timer hands out
    /// its channel without arming it, so a pending value can still be
    /// drained. Callback timers never deliver here.
    #[must_use]
    pub fn c(&self) -> Receiver<Time> {
        if self.mode == Mode::Callback {
            return Receiver::never();
        }
        self.clock.with_state(|state, batch| {
            let Some(sleeper) = state.sleeper(self.key) else {
                return Receiver::never();
            };
            let rx = sleeper
                .slot
                .as_ref()
                .map_or_else(Receiver::never, Sender::subscribe);
            if !sleeper.stopped && !sleeper.is_pending() && !sleeper.woken {
                state.register(self.key, batch);
            }
            rx
        })
    }

    /// Prevents the timer from firing.
    ///
    /// Returns true only for the call that actually prevented a fire.
    pub fn stop(&self) -> bool {
        self.clock.with_state(|state, batch| {
            match state.sleeper_mut(self.key) {
                Some(sleeper) if !sleeper.stopped => sleeper.stopped = true,
                _ => return false,
            }
            if state.remove(self.key, batch) {
                debug!(key = self.key, "stopped pending fake timer");
                return true;
            }
            let now = state.now();
            state
                .sleeper(self.key)
                .is_some_and(|sleeper| !sleeper.woken && sleeper.deadline > now)
        })
    }

    /// Re-arms the timer to expire `d` after the current virtual instant.
    ///
    /// Returns whether the timer was pending. A channel timer gets a fresh
    /// channel and is armed again by the next [`c`](Self::c); a callback
    /// timer is armed immediately.
    pub fn reset(&self, d: Duration) -> bool {
        self.clock.with_state(|state, batch| {
            let was_pending = state.remove(self.key, batch);
            let deadline = state.now() + d;
            if let Some(sleeper) = state.sleeper_mut(self.key) {
                sleeper.deadline = deadline;
                sleeper.woken = false;
                sleeper.stopped = false;
                if let Some(current) = sleeper.slot.as_mut() {
                    *current = slot().0;
                }
            }
            debug!(key = self.key, %deadline, was_pending, "reset fake timer");
            if self.mode == Mode::Callback {
                state.register(self.key, batch);
            }
            was_pending
        })
    }
}

impl Timer for FakeTimer {
    fn c(&self) -> Receiver<Time> {
        Self::c(self)
    }

    fn stop(&self) -> bool {
        Self::stop(self)
    }

    fn reset(&self, d: Duration) -> bool {
        Self::reset(self, d)
    }
}

impl Drop for FakeTimer {
    fn drop(&mut self) {
        let key = self.key;
        self.clock.with_state(|state, _| state.disown(key));
    }
}

impl fmt::Debug for FakeTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeTimer")
            .field("key", &self.key)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

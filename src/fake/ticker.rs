//! Repeating fake tickers.

use super::FakeClock;
use super::sleeper::{Ownership, Sleeper, SleeperKey};
use crate::channel::{Receiver, slot};
use crate::clock::Ticker;
use crate::error::ClockError;
use crate::tracing_compat::debug;
use crate::types::Time;
use parking_lot::Mutex;
use std::fmt;
use std::time::Duration;

#[derive(Debug)]
struct TickerState {
    interval: Duration,
    next: Time,
    stopped: bool,
    /// Sleeper behind the most recently handed out channel.
    current: Option<SleeperKey>,
}

/// Ticker handed out by [`FakeClock::try_new_ticker`].
///
/// Ticks are driven by channel requests: each call to [`c`](Self::c)
/// schedules one tick at the rolling `next` deadline on a fresh channel and
/// moves `next` one interval on. A request made before the previous tick was
/// received discards that tick, the way a real ticker drops ticks for a slow
/// reader.
pub struct FakeTicker {
    clock: FakeClock,
    /// Always locked before the clock.
    state: Mutex<TickerState>,
}

impl FakeTicker {
    pub(super) fn new(clock: FakeClock, interval: Duration, next: Time) -> Self {
        Self {
            clock,
            state: Mutex::new(TickerState {
                interval,
                next,
                stopped: false,
                current: None,
            }),
        }
    }

    /// Returns a channel for the next tick.
    ///
    /// A stopped ticker returns a channel that never fires.
    #[must_use]
    pub fn c(&self) -> Receiver<Time> {
        let mut ticker = self.state.lock();
        if ticker.stopped {
            return Receiver::never();
        }
        let (tx, rx) = slot();
        let previous = ticker.current.take();
        let deadline = ticker.next;
        let key = self.clock.with_state(|state, batch| {
            if let Some(previous) = previous {
                state.release(previous, batch);
            }
            let key = state.insert(Sleeper::delivering(deadline, tx, Ownership::Held));
            state.register(key, batch);
            key
        });
        ticker.current = Some(key);
        ticker.next = deadline + ticker.interval;
        drop(ticker);
        rx
    }

    /// Stops the ticker and cancels the tick currently scheduled.
    pub fn stop(&self) {
        let mut ticker = self.state.lock();
        ticker.stopped = true;
        if let Some(current) = ticker.current.take() {
            self.clock.with_state(|state, batch| state.release(current, batch));
        }
        debug!("stopped fake ticker");
    }

    /// Restarts the ticker with period `d`, first due at `now + d`.
    ///
    /// # Panics
    ///
    /// Panics if `d` is zero.
    pub fn reset(&self, d: Duration) {
        if let Err(err) = self.try_reset(d) {
            panic!("{err}");
        }
    }

    /// Fallible form of [`reset`](Self::reset).
    pub fn try_reset(&self, d: Duration) -> Result<(), ClockError> {
        let interval = ClockError::check_interval(d)?;
        let mut ticker = self.state.lock();
        let current = ticker.current.take();
        let now = self.clock.with_state(|state, batch| {
            if let Some(current) = current {
                state.release(current, batch);
            }
            state.now()
        });
        ticker.stopped = false;
        ticker.interval = interval;
        ticker.next = now + interval;
        debug!(
            next = %ticker.next,
            interval_ns = crate::types::duration_to_nanos_saturating(interval),
            "reset fake ticker"
        );
        drop(ticker);
        Ok(())
    }
}

impl Ticker for FakeTicker {
    fn c(&self) -> Receiver<Time> {
        Self::c(self)
    }

    fn stop(&self) {
        Self::stop(self);
    }

    fn reset(&self, d: Duration) {
        Self::reset(self, d);
    }
}

impl Drop for FakeTicker {
    fn drop(&mut self) {
        if let Some(current) = self.state.get_mut().current.take() {
            self.clock.with_state(|state, _| state.disown(current));
        }
    }
}

impl fmt::Debug for FakeTicker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ticker = self.state.lock();
        f.debug_struct("FakeTicker")
            .field("interval", &ticker.interval)
            .field("next", &ticker.next)
            .field("stopped", &ticker.stopped)
            .finish_non_exhaustive()
    }
}

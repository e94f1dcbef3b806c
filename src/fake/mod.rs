//! Virtual-time clock for deterministic tests.
//!
//! A [`FakeClock`] never moves on its own. Code under test sleeps, waits on
//! timers and reads tickers through the [`Clock`] trait exactly as it would
//! against a [`RealClock`](crate::RealClock); the test driver waits until the
//! expected number of waiters is pending and then calls
//! [`advance`](FakeClock::advance), which fires everything that fell due
//! before it returns.
//!
//! # Example
//!
//! ```
//! use asupersync_clock::{FakeClock, Time};
//! use std::time::Duration;
//!
//! let clock = FakeClock::new();
//! let worker = {
//!     let clock = clock.clone();
//!     std::thread::spawn(move || {
//!         clock.sleep(Duration::from_secs(5));
//!         clock.now()
//!     })
//! };
//!
//! clock.block_until(1);
//! clock.advance(Duration::from_secs(5));
//! assert_eq!(worker.join().unwrap(), Time::from_secs(6));
//! ```
//!
//! All state lives behind one lock: the instant, the pending sleepers and the
//! blockers waiting on the pending count. Wake-ups are collected under that
//! lock and performed after it is released.

mod blocker;
mod builder;
mod sleeper;
mod state;
mod ticker;
mod timer;

pub use builder::FakeClockBuilder;
pub use ticker::FakeTicker;
pub use timer::FakeTimer;

use self::sleeper::{Ownership, Sleeper};
use self::state::{ClockState, FireBatch};
use crate::channel::{Latch, Receiver, slot};
use crate::clock::{Callback, Clock, FakeClockApi, Ticker, Timer};
use crate::config::ClockConfig;
use crate::error::ClockError;
use crate::types::Time;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

struct Shared {
    state: Mutex<ClockState>,
    callback_thread_name: String,
}

/// A clock whose time only moves when told to.
///
/// Cloning yields another handle to the same clock.
#[derive(Clone)]
pub struct FakeClock {
    shared: Arc<Shared>,
}

impl FakeClock {
    /// Creates a fake clock at one second past the Unix epoch.
    #[must_use]
    pub fn new() -> Self {
        Self::from_valid_config(ClockConfig::default())
    }

    /// Creates a fake clock at `start`.
    #[must_use]
    pub fn starting_at(start: Time) -> Self {
        Self::from_valid_config(ClockConfig {
            start,
            ..ClockConfig::default()
        })
    }

    /// Returns a builder for a configured fake clock.
    #[must_use]
    pub fn builder() -> FakeClockBuilder {
        FakeClockBuilder::new()
    }

    pub(crate) fn from_valid_config(config: ClockConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(ClockState::new(config.start)),
                callback_thread_name: config.callback_thread_name,
            }),
        }
    }

    /// Runs `f` under the clock lock, then performs the wake-ups it queued.
    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut ClockState, &mut FireBatch) -> R) -> R {
        let mut batch = FireBatch::new();
        let result = {
            let mut state = self.shared.state.lock();
            f(&mut *state, &mut batch)
        };
        if !batch.is_empty() {
            batch.dispatch(&self.shared.callback_thread_name);
        }
        result
    }

    /// Returns the current virtual instant.
    #[must_use]
    pub fn now(&self) -> Time {
        self.shared.state.lock().now()
    }

    /// Moves virtual time forward by `d`.
    ///
    /// Every sleeper whose deadline is reached fires before this returns.
    /// A zero duration does nothing.
    pub fn advance(&self, d: Duration) {
        self.with_state(|state, batch| state.advance(d, batch));
    }

    /// Moves virtual time forward to `t`.
    ///
    /// Instants at or before the current one are ignored.
    pub fn advance_to(&self, t: Time) {
        self.with_state(|state, batch| state.advance_to(t, batch));
    }

    /// Returns a latch that opens once at least `n` sleepers are pending.
    ///
    /// The latch is already open if that is true now.
    #[must_use]
    pub fn until(&self, n: usize) -> Latch {
        self.shared.state.lock().wait_for_count(n)
    }

    /// Blocks the calling thread until at least `n` sleepers are pending.
    pub fn block_until(&self, n: usize) {
        self.until(n).wait();
    }

    /// Number of sleepers currently waiting for a future instant.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.shared.state.lock().pending_count()
    }

    /// Number of [`until`](Self::until) requests not yet satisfied.
    #[must_use]
    pub fn blocker_count(&self) -> usize {
        self.shared.state.lock().blocker_count()
    }

    /// Returns a receiver delivered the deadline `now + d` once it is reached.
    #[must_use]
    pub fn after(&self, d: Duration) -> Receiver<Time> {
        let (tx, rx) = slot();
        self.with_state(|state, batch| {
            let deadline = state.now() + d;
            state.schedule_delivery(deadline, tx, batch);
        });
        rx
    }

    /// Blocks until virtual time has moved `d` past the call.
    pub fn sleep(&self, d: Duration) {
        self.after(d).recv();
    }

    /// Runs `f` on its own thread once virtual time reaches `now + d`.
    ///
    /// Dropping the returned timer does not cancel the call.
    pub fn after_fn(&self, d: Duration, f: Callback) -> FakeTimer {
        let key = self.with_state(|state, batch| {
            let deadline = state.now() + d;
            let key = state.insert(Sleeper::calling(deadline, f, Ownership::Held));
            state.register(key, batch);
            key
        });
        FakeTimer::callback(self.clone(), key)
    }

    /// Creates a timer expiring at `now + d`.
    ///
    /// The timer is armed lazily: it joins the pending registry the first
    /// time its channel is requested.
    #[must_use]
    pub fn new_timer(&self, d: Duration) -> FakeTimer {
        let (tx, _rx) = slot();
        let key = self.with_state(|state, _| {
            let deadline = state.now() + d;
            state.insert(Sleeper::delivering(deadline, tx, Ownership::Held))
        });
        FakeTimer::channel(self.clone(), key)
    }

    /// Creates a ticker with period `d`, first due at `now + d`.
    pub fn try_new_ticker(&self, d: Duration) -> Result<FakeTicker, ClockError> {
        let interval = ClockError::check_interval(d)?;
        let next = self.now() + interval;
        Ok(FakeTicker::new(self.clone(), interval, next))
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FakeClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("FakeClock")
            .field("now", &state.now())
            .field("pending", &state.pending_count())
            .field("blockers", &state.blocker_count())
            .finish()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Time {
        Self::now(self)
    }

    fn sleep(&self, d: Duration) {
        Self::sleep(self, d);
    }

    fn after(&self, d: Duration) -> Receiver<Time> {
        Self::after(self, d)
    }

    fn after_fn(&self, d: Duration, f: Callback) -> Box<dyn Timer> {
        Box::new(Self::after_fn(self, d, f))
    }

    fn new_timer(&self, d: Duration) -> Box<dyn Timer> {
        Box::new(Self::new_timer(self, d))
    }

    fn try_new_ticker(&self, d: Duration) -> Result<Box<dyn Ticker>, ClockError> {
        Self::try_new_ticker(self, d).map(|ticker| Box::new(ticker) as Box<dyn Ticker>)
    }
}

impl FakeClockApi for FakeClock {
    fn advance(&self, d: Duration) {
        Self::advance(self, d);
    }

    fn until(&self, n: usize) -> Latch {
        Self::until(self, n)
    }

    fn block_until(&self, n: usize) {
        Self::block_until(self, n);
    }
}

//! Wall-clock implementation of [`Clock`].
//!
//! Each pending wait is backed by a short-lived OS thread that parks until
//! its deadline, so nothing here needs an async runtime. Use it in production
//! and swap in a [`FakeClock`](crate::FakeClock) for tests.

mod ticker;
mod timer;

pub use ticker::RealTicker;
pub use timer::RealTimer;

use crate::channel::{Receiver, slot};
use crate::clock::{Callback, Clock, Ticker, Timer};
use crate::error::ClockError;
use crate::tracing_compat::warn;
use crate::types::Time;
use std::thread;
use std::time::{Duration, Instant};

const AFTER_THREAD_NAME: &str = "asupersync-clock-after";

/// Stand-in deadline for durations too large to add to an [`Instant`].
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

/// `start + d`, clamped to a far-future instant instead of overflowing.
pub(crate) fn deadline_after(start: Instant, d: Duration) -> Instant {
    start
        .checked_add(d)
        .unwrap_or_else(|| start + FAR_FUTURE)
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RealClock;

impl RealClock {
    /// Creates a handle to the system clock.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Clock for RealClock {
    fn now(&self) -> Time {
        Time::now()
    }

    fn sleep(&self, d: Duration) {
        if !d.is_zero() {
            thread::sleep(d);
        }
    }

    #[cfg_attr(not(feature = "tracing-integration"), allow(unused_variables))]
    fn after(&self, d: Duration) -> Receiver<Time> {
        let (tx, rx) = slot();
        if d.is_zero() {
            tx.offer(Time::now());
            return rx;
        }
        let spawned = thread::Builder::new()
            .name(AFTER_THREAD_NAME.to_string())
            .spawn(move || {
                thread::sleep(d);
                tx.offer(Time::now());
            });
        if let Err(err) = spawned {
            warn!(error = %err, "failed to spawn real clock after thread");
        }
        rx
    }

    fn after_fn(&self, d: Duration, f: Callback) -> Box<dyn Timer> {
        Box::new(RealTimer::with_callback(d, f))
    }

    fn new_timer(&self, d: Duration) -> Box<dyn Timer> {
        Box::new(RealTimer::new(d))
    }

    fn try_new_ticker(&self, d: Duration) -> Result<Box<dyn Ticker>, ClockError> {
        RealTicker::try_new(d).map(|ticker| Box::new(ticker) as Box<dyn Ticker>)
    }
}

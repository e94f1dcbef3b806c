//! Clock capability traits.
//!
//! Application code depends on [`Clock`] (usually as `Arc<dyn Clock>`) and
//! receives a [`RealClock`](crate::RealClock) in production or a
//! [`FakeClock`](crate::FakeClock) in tests. Tests additionally drive the fake
//! through [`FakeClockApi`].
//!
//! All durations are [`Duration`]s, so "negative" inputs cannot be expressed;
//! wherever a platform clock would clamp a negative duration to zero, these
//! traits treat [`Duration::ZERO`] the same way.

use crate::channel::{Latch, Receiver};
use crate::error::ClockError;
use crate::types::Time;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Callback run when an [`Clock::after_fn`] timer fires.
///
/// It is shared rather than boxed because a reset timer may run it again.
pub type Callback = Arc<dyn Fn() + Send + Sync + 'static>;

/// Time capabilities shared by the real and the fake clock.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Returns the current instant.
    fn now(&self) -> Time;

    /// Returns the time elapsed since `t`, or zero if `t` is in the future.
    fn since(&self, t: Time) -> Duration {
        self.now().duration_since(t)
    }

    /// Blocks the calling thread for at least `d`.
    ///
    /// A zero duration returns immediately.
    fn sleep(&self, d: Duration);

    /// Returns a receiver that is delivered the firing instant once `d` has
    /// elapsed.
    fn after(&self, d: Duration) -> Receiver<Time>;

    /// Runs `f` on its own thread once `d` has elapsed.
    ///
    /// The returned timer can stop or reschedule the call; its channel never
    /// fires.
    fn after_fn(&self, d: Duration, f: Callback) -> Box<dyn Timer>;

    /// Creates a single-shot timer that expires after `d`.
    fn new_timer(&self, d: Duration) -> Box<dyn Timer>;

    /// Creates a ticker with period `d`, rejecting a zero period.
    fn try_new_ticker(&self, d: Duration) -> Result<Box<dyn Ticker>, ClockError>;

    /// Creates a ticker with period `d`.
    ///
    /// # Panics
    ///
    /// Panics if `d` is zero.
    fn new_ticker(&self, d: Duration) -> Box<dyn Ticker> {
        match self.try_new_ticker(d) {
            Ok(ticker) => ticker,
            Err(err) => panic!("{err}"),
        }
    }

    /// Channel-only access to a ticker with period `d`.
    ///
    /// Unlike [`new_ticker`](Self::new_ticker), a zero period yields a
    /// [`Tick::never`] instead of panicking.
    fn tick(&self, d: Duration) -> Tick {
        if d.is_zero() {
            return Tick::never();
        }
        Tick::new(self.new_ticker(d))
    }
}

/// Controls available only on a virtual-time clock.
pub trait FakeClockApi: Clock {
    /// Moves virtual time forward by `d`, firing everything that falls due.
    ///
    /// A zero duration is a no-op.
    fn advance(&self, d: Duration);

    /// Returns a latch that opens once at least `n` waiters are pending on
    /// the clock.
    fn until(&self, n: usize) -> Latch;

    /// Blocks until at least `n` waiters are pending on the clock.
    fn block_until(&self, n: usize) {
        self.until(n).wait();
    }
}

/// A single event.
///
/// When the timer expires the expiry instant is delivered on [`c`](Self::c),
/// unless it was created by [`Clock::after_fn`].
///
/// `stop` and `reset` may be called from any thread, but not concurrently
/// with each other on the same timer.
pub trait Timer: Send + Sync + fmt::Debug {
    /// Returns the channel on which the expiry instant is delivered.
    fn c(&self) -> Receiver<Time>;

    /// Prevents the timer from firing.
    ///
    /// Returns true if this call stopped the timer, false if it had already
    /// expired or been stopped. The channel is not drained.
    fn stop(&self) -> bool;

    /// Re-arms the timer to expire `d` from now.
    ///
    /// Returns true if the timer was still active. Channel timers should only
    /// be reset once stopped or expired with their channel drained.
    fn reset(&self, d: Duration) -> bool;
}

/// Delivers ticks at a fixed interval.
pub trait Ticker: Send + Sync + fmt::Debug {
    /// Returns the channel on which ticks are delivered.
    ///
    /// Keep the returned receiver: implementations may hand out a fresh
    /// channel per call, and calling again before a tick is received can
    /// lose that tick.
    fn c(&self) -> Receiver<Time>;

    /// Turns the ticker off. No more ticks are delivered until a reset.
    fn stop(&self);

    /// Restarts the ticker with period `d`, measured from now.
    ///
    /// # Panics
    ///
    /// Panics if `d` is zero.
    fn reset(&self, d: Duration);
}

/// Channel-only handle returned by [`Clock::tick`].
///
/// Dropping it shuts the underlying ticker down.
#[derive(Debug)]
pub struct Tick {
    ticker: Option<Box<dyn Ticker>>,
}

impl Tick {
    /// Wraps a ticker.
    #[must_use]
    pub fn new(ticker: Box<dyn Ticker>) -> Self {
        Self {
            ticker: Some(ticker),
        }
    }

    /// A tick source that never fires.
    #[must_use]
    pub const fn never() -> Self {
        Self { ticker: None }
    }

    /// Returns true if this handle was created for a zero period.
    #[must_use]
    pub const fn is_never(&self) -> bool {
        self.ticker.is_none()
    }

    /// Returns the channel for the next tick.
    #[must_use]
    pub fn c(&self) -> Receiver<Time> {
        self.ticker
            .as_ref()
            .map_or_else(Receiver::never, |ticker| ticker.c())
    }
}

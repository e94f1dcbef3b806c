//! Wall-clock ticker driven by one background thread.

use super::deadline_after;
use crate::channel::{Receiver, Sender, slot};
use crate::clock::Ticker;
use crate::error::ClockError;
use crate::tracing_compat::{debug, warn};
use crate::types::Time;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const TICKER_THREAD_NAME: &str = "asupersync-clock-ticker";

#[derive(Debug)]
struct TickerState {
    interval: Duration,
    next: Instant,
    stopped: bool,
    shutdown: bool,
}

struct Shared {
    state: Mutex<TickerState>,
    changed: Condvar,
    slot: Sender<Time>,
}

impl Shared {
    fn drive(&self) {
        let mut state = self.state.lock();
        loop {
            if state.shutdown {
                return;
            }
            if state.stopped {
                self.changed.wait(&mut state);
                continue;
            }
            let now = Instant::now();
            if now < state.next {
                let next = state.next;
                self.changed.wait_until(&mut state, next);
                continue;
            }
            // Missed periods are skipped, not queued.
            while state.next <= now {
                state.next = deadline_after(state.next, state.interval);
            }
            MutexGuard::unlocked(&mut state, || {
                self.slot.offer(Time::now());
            });
        }
    }
}

/// Ticker returned by [`RealClock::new_ticker`](crate::RealClock).
///
/// Ticks land in a single stable slot; a tick arriving while the previous one
/// is still unread is dropped. Dropping the ticker ends its thread.
pub struct RealTicker {
    shared: Arc<Shared>,
    rx: Receiver<Time>,
}

impl RealTicker {
    /// Starts a ticker with period `d`.
    #[cfg_attr(not(feature = "tracing-integration"), allow(unused_variables))]
    pub fn try_new(d: Duration) -> Result<Self, ClockError> {
        let interval = ClockError::check_interval(d)?;
        let (tx, rx) = slot();
        let shared = Arc::new(Shared {
            state: Mutex::new(TickerState {
                interval,
                next: deadline_after(Instant::now(), interval),
                stopped: false,
                shutdown: false,
            }),
            changed: Condvar::new(),
            slot: tx,
        });
        let driver = Arc::clone(&shared);
        let spawned = thread::Builder::new()
            .name(TICKER_THREAD_NAME.to_string())
            .spawn(move || driver.drive());
        if let Err(err) = spawned {
            warn!(error = %err, "failed to spawn real ticker thread, ticker inert");
        }
        Ok(Self { shared, rx })
    }

    /// Returns the tick channel. The same channel is returned every time.
    #[must_use]
    pub fn c(&self) -> Receiver<Time> {
        self.rx.clone()
    }

    /// Pauses ticking until the next reset.
    pub fn stop(&self) {
        self.shared.state.lock().stopped = true;
        self.shared.changed.notify_all();
        debug!("stopped real ticker");
    }

    /// Restarts with period `d`, first tick `d` from now.
    ///
    /// # Panics
    ///
    /// Panics if `d` is zero.
    pub fn reset(&self, d: Duration) {
        let interval = match ClockError::check_interval(d) {
            Ok(interval) => interval,
            Err(err) => panic!("{err}"),
        };
        {
            let mut state = self.shared.state.lock();
            state.stopped = false;
            state.interval = interval;
            state.next = deadline_after(Instant::now(), interval);
        }
        self.shared.changed.notify_all();
        debug!(
            interval_ns = crate::types::duration_to_nanos_saturating(interval),
            "reset real ticker"
        );
    }
}

impl Ticker for RealTicker {
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

impl Drop for RealTicker {
    fn drop(&mut self) {
        self.shared.state.lock().shutdown = true;
        self.shared.changed.notify_all();
    }
}

impl fmt::Debug for RealTicker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("RealTicker")
            .field("interval", &state.interval)
            .field("stopped", &state.stopped)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{DELIVERY_TIMEOUT, init_test_logging};

    #[test]
    fn ticks_repeatedly_on_one_channel() {
        init_test_logging();
        let ticker = RealTicker::try_new(Duration::from_millis(5)).expect("positive");
        let rx = ticker.c();
        let first = rx.recv_timeout(DELIVERY_TIMEOUT).expect("first tick");
        let second = ticker.c().recv_timeout(DELIVERY_TIMEOUT).expect("second tick");
        assert!(second > first);
    }

    #[test]
    fn stop_then_reset_resumes() {
        let ticker = RealTicker::try_new(Duration::from_millis(5)).expect("positive");
        ticker.stop();
        // Let an in-flight tick land, then clear it.
        thread::sleep(Duration::from_millis(10));
        let _ = ticker.c().try_recv();
        assert!(ticker.c().recv_timeout(Duration::from_millis(30)).is_err());
        ticker.reset(Duration::from_millis(5));
        assert!(ticker.c().recv_timeout(DELIVERY_TIMEOUT).is_ok());
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert_eq!(
            RealTicker::try_new(Duration::ZERO).err(),
            Some(ClockError::NonPositiveInterval(Duration::ZERO))
        );
    }

    #[test]
    #[should_panic(expected = "non-positive interval for ticker")]
    fn zero_reset_panics() {
        RealTicker::try_new(Duration::from_secs(1))
            .expect("positive")
            .reset(Duration::ZERO);
    }
}

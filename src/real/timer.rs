//! Wall-clock timers backed by a waiter thread per arming.

use super::deadline_after;
use crate::channel::{Receiver, Sender, slot};
use crate::clock::{Callback, Timer};
use crate::tracing_compat::{debug, warn};
use crate::types::Time;
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const TIMER_THREAD_NAME: &str = "asupersync-clock-timer";

#[derive(Debug)]
struct TimerState {
    /// Bumped on every arm and disarm; a waiter only fires for its own.
    generation: u64,
    armed: bool,
    deadline: Instant,
}

enum Action {
    Deliver(Sender<Time>),
    Call(Callback),
}

struct Shared {
    state: Mutex<TimerState>,
    changed: Condvar,
    action: Action,
}

impl Shared {
    fn fire(&self) {
        match &self.action {
            Action::Deliver(slot) => {
                slot.offer(Time::now());
            }
            Action::Call(callback) => callback(),
        }
    }

    /// Parks until `generation`'s deadline, then fires unless superseded.
    fn wait(&self, generation: u64) {
        let mut state = self.state.lock();
        loop {
            if !state.armed || state.generation != generation {
                return;
            }
            let deadline = state.deadline;
            if Instant::now() >= deadline {
                state.armed = false;
                drop(state);
                self.fire();
                return;
            }
            self.changed.wait_until(&mut state, deadline);
        }
    }
}

/// Timer returned by [`RealClock::new_timer`](crate::RealClock) and
/// [`RealClock::after_fn`](crate::RealClock).
///
/// Its channel is stable across resets. Dropping the handle does not cancel
/// a pending expiry.
pub struct RealTimer {
    shared: Arc<Shared>,
    rx: Receiver<Time>,
}

impl RealTimer {
    /// Creates a timer delivering the wall-clock instant after `d`.
    #[must_use]
    pub fn new(d: Duration) -> Self {
        let (tx, rx) = slot();
        Self::armed(Action::Deliver(tx), rx, d)
    }

    /// Creates a timer that runs `f` after `d` on the waiter thread.
    #[must_use]
    pub fn with_callback(d: Duration, f: Callback) -> Self {
        Self::armed(Action::Call(f), Receiver::never(), d)
    }

    fn armed(action: Action, rx: Receiver<Time>, d: Duration) -> Self {
        let timer = Self {
            shared: Arc::new(Shared {
                state: Mutex::new(TimerState {
                    generation: 0,
                    armed: false,
                    deadline: Instant::now(),
                }),
                changed: Condvar::new(),
                action,
            }),
            rx,
        };
        timer.arm(d);
        timer
    }

    /// Arms for `d` from now and returns whether it was armed before.
    #[cfg_attr(not(feature = "tracing-integration"), allow(unused_variables))]
    fn arm(&self, d: Duration) -> bool {
        let mut state = self.shared.state.lock();
        let was_armed = state.armed;
        state.generation = state.generation.wrapping_add(1);
        state.armed = true;
        state.deadline = deadline_after(Instant::now(), d);
        let generation = state.generation;
        drop(state);
        self.shared.changed.notify_all();

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(TIMER_THREAD_NAME.to_string())
            .spawn(move || shared.wait(generation));
        if let Err(err) = spawned {
            warn!(error = %err, "failed to spawn real timer thread, timer disarmed");
            let mut state = self.shared.state.lock();
            if state.generation == generation {
                state.armed = false;
            }
        }
        was_armed
    }

    /// Returns the expiry channel. Callback timers never deliver.
    #[must_use]
    pub fn c(&self) -> Receiver<Time> {
        self.rx.clone()
    }

    /// Cancels a pending expiry. Returns whether the timer was armed.
    pub fn stop(&self) -> bool {
        let mut state = self.shared.state.lock();
        let was_armed = state.armed;
        state.armed = false;
        state.generation = state.generation.wrapping_add(1);
        drop(state);
        self.shared.changed.notify_all();
        debug!(was_armed, "stopped real timer");
        was_armed
    }

    /// Re-arms for `d` from now. Returns whether the timer was armed.
    pub fn reset(&self, d: Duration) -> bool {
        let was_armed = self.arm(d);
        debug!(was_armed, "reset real timer");
        was_armed
    }
}

impl Timer for RealTimer {
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

impl fmt::Debug for RealTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("RealTimer")
            .field("armed", &state.armed)
            .field("deadline", &state.deadline)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{DELIVERY_TIMEOUT, SILENCE_WINDOW, init_test_logging};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn fires_and_disarms() {
        init_test_logging();
        let timer = RealTimer::new(Duration::from_millis(5));
        assert!(timer.c().recv_timeout(DELIVERY_TIMEOUT).is_ok());
        assert!(!timer.stop(), "already expired");
    }

    #[test]
    fn stop_prevents_fire() {
        let timer = RealTimer::new(Duration::from_secs(60));
        assert!(timer.stop());
        assert!(!timer.stop());
        assert!(timer.c().recv_timeout(SILENCE_WINDOW).is_err());
    }

    #[test]
    fn reset_rearms_on_same_channel() {
        let timer = RealTimer::new(Duration::from_secs(60));
        let rx = timer.c();
        assert!(timer.reset(Duration::from_millis(5)));
        assert!(rx.recv_timeout(DELIVERY_TIMEOUT).is_ok());
        assert!(!timer.reset(Duration::from_secs(60)));
        assert!(timer.stop());
    }

    #[test]
    fn callback_runs_once() {
        let runs = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = slot();
        let counter = Arc::clone(&runs);
        let timer = RealTimer::with_callback(
            Duration::from_millis(5),
            Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                tx.offer(());
            }),
        );
        assert!(timer.c().is_never());
        assert!(rx.recv_timeout(DELIVERY_TIMEOUT).is_ok());
        thread::sleep(SILENCE_WINDOW);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}

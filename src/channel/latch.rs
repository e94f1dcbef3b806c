//! One-shot completion signal.

use parking_lot::{Condvar, Mutex};
use smallvec::SmallVec;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

#[derive(Default)]
struct LatchState {
    open: bool,
    wakers: SmallVec<[Waker; 1]>,
}

#[derive(Default)]
struct LatchInner {
    state: Mutex<LatchState>,
    opened: Condvar,
}

/// A signal that opens once and then stays open.
///
/// [`FakeClock::until`](crate::FakeClock::until) hands one out per request;
/// every clone observes the same signal, and waiting on an already-open
/// latch returns immediately.
#[derive(Clone, Default)]
pub struct Latch {
    inner: Arc<LatchInner>,
}

impl Latch {
    /// Creates a closed latch.
    #[must_use]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Creates a latch that is already open.
    #[must_use]
    pub(crate) fn opened() -> Self {
        let latch = Self::new();
        latch.inner.state.lock().open = true;
        latch
    }

    /// Opens the latch and wakes every waiter.
    ///
    /// Returns false if it was already open.
    pub(crate) fn open(&self) -> bool {
        let wakers = {
            let mut state = self.inner.state.lock();
            if state.open {
                return false;
            }
            state.open = true;
            std::mem::take(&mut state.wakers)
        };
        self.inner.opened.notify_all();
        for waker in wakers {
            waker.wake();
        }
        true
    }

    /// Returns true once the latch has been opened.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.inner.state.lock().open
    }

    /// Blocks the calling thread until the latch opens.
    pub fn wait(&self) {
        let mut state = self.inner.state.lock();
        while !state.open {
            self.inner.opened.wait(&mut state);
        }
    }

    /// Blocks for at most `timeout` of real time. Returns whether the latch
    /// is open.
    #[must_use]
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.inner.state.lock();
        while !state.open {
            if self.inner.opened.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        state.open
    }
}

impl fmt::Debug for Latch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Latch")
            .field("open", &self.is_open())
            .finish()
    }
}

impl Future for Latch {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.inner.state.lock();
        if state.open {
            return Poll::Ready(());
        }
        if !state.wakers.iter().any(|w| w.will_wake(cx.waker())) {
            state.wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn open_is_one_shot() {
        let latch = Latch::new();
        assert!(!latch.is_open());
        assert!(latch.open());
        assert!(!latch.open(), "second open reports already open");
        assert!(latch.is_open());
        latch.wait();
    }

    #[test]
    fn opened_latch_never_blocks() {
        let latch = Latch::opened();
        assert!(latch.wait_timeout(Duration::ZERO));
    }

    #[test]
    fn wait_timeout_on_closed_latch() {
        let latch = Latch::new();
        assert!(!latch.wait_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn clones_observe_the_same_signal() {
        let latch = Latch::new();
        let observer = latch.clone();
        let handle = thread::spawn(move || observer.wait());
        thread::sleep(Duration::from_millis(10));
        latch.open();
        handle.join().expect("observer thread");
    }
}

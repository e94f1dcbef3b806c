//! Capacity-1, non-blocking delivery slot.

use parking_lot::{Condvar, Mutex};
use smallvec::SmallVec;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::thread;
use std::time::{Duration, Instant};

/// Error returned by [`Receiver::try_recv`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryRecvError {
    /// Nothing has been delivered yet.
    Empty,
}

impl fmt::Display for TryRecvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "delivery slot is empty"),
        }
    }
}

impl std::error::Error for TryRecvError {}

/// Error returned by [`Receiver::recv_timeout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvTimeoutError {
    /// Nothing was delivered before the (real-time) timeout elapsed.
    Timeout,
}

impl fmt::Display for RecvTimeoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timed out waiting on delivery slot"),
        }
    }
}

impl std::error::Error for RecvTimeoutError {}

struct SlotState<T> {
    value: Option<T>,
    /// Wakers of futures polling this slot.
    wakers: SmallVec<[Waker; 1]>,
}

struct Shared<T> {
    state: Mutex<SlotState<T>>,
    filled: Condvar,
}

/// Creates a connected sender/receiver pair over an empty slot.
pub(crate) fn slot<T>() -> (Sender<T>, Receiver<T>) {
    let shared = Arc::new(Shared {
        state: Mutex::new(SlotState {
            value: None,
            wakers: SmallVec::new(),
        }),
        filled: Condvar::new(),
    });
    (
        Sender {
            shared: Arc::clone(&shared),
        },
        Receiver {
            shared: Some(shared),
        },
    )
}

/// Sending half of a delivery slot. Never blocks.
pub(crate) struct Sender<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Sender<T> {
    /// Stores `value` if the slot is empty. Returns false (and drops the
    /// value) when a previous delivery has not been consumed yet.
    pub(crate) fn offer(&self, value: T) -> bool {
        let wakers = {
            let mut state = self.shared.state.lock();
            if state.value.is_some() {
                return false;
            }
            state.value = Some(value);
            std::mem::take(&mut state.wakers)
        };
        self.shared.filled.notify_all();
        for waker in wakers {
            waker.wake();
        }
        true
    }

    /// Returns another receiver observing this slot.
    pub(crate) fn subscribe(&self) -> Receiver<T> {
        Receiver {
            shared: Some(Arc::clone(&self.shared)),
        }
    }
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for Sender<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sender")
            .field("full", &self.shared.state.lock().value.is_some())
            .finish()
    }
}

/// Receiving half of a clock delivery slot.
///
/// Clones observe the same slot; whichever receives first takes the value.
/// A receiver obtained from [`Receiver::never`] (for example from a stopped
/// ticker) never yields anything.
pub struct Receiver<T> {
    shared: Option<Arc<Shared<T>>>,
}

impl<T> Receiver<T> {
    /// Returns a receiver that is never delivered to.
    #[must_use]
    pub const fn never() -> Self {
        Self { shared: None }
    }

    /// Returns true if this receiver can never yield a value.
    #[must_use]
    pub const fn is_never(&self) -> bool {
        self.shared.is_none()
    }

    /// Returns true if a value is waiting to be received.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.shared
            .as_ref()
            .is_some_and(|shared| shared.state.lock().value.is_some())
    }

    /// Blocks the calling thread until a value is delivered.
    ///
    /// On a [`never`](Self::never) receiver this blocks forever.
    pub fn recv(&self) -> T {
        let Some(shared) = &self.shared else {
            loop {
                thread::park();
            }
        };
        let mut state = shared.state.lock();
        loop {
            if let Some(value) = state.value.take() {
                return value;
            }
            shared.filled.wait(&mut state);
        }
    }

    /// Blocks for at most `timeout` of real time waiting for a value.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<T, RecvTimeoutError> {
        let deadline = Instant::now() + timeout;
        let Some(shared) = &self.shared else {
            thread::sleep(timeout);
            return Err(RecvTimeoutError::Timeout);
        };
        let mut state = shared.state.lock();
        loop {
            if let Some(value) = state.value.take() {
                return Ok(value);
            }
            if shared.filled.wait_until(&mut state, deadline).timed_out() {
                return state.value.take().ok_or(RecvTimeoutError::Timeout);
            }
        }
    }

    /// Takes the delivered value without blocking.
    pub fn try_recv(&self) -> Result<T, TryRecvError> {
        self.shared
            .as_ref()
            .and_then(|shared| shared.state.lock().value.take())
            .ok_or(TryRecvError::Empty)
    }
}

impl<T> Clone for Receiver<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> fmt::Debug for Receiver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Receiver")
            .field("never", &self.is_never())
            .field("ready", &self.is_ready())
            .finish()
    }
}

impl<T> Future for Receiver<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let Some(shared) = &self.shared else {
            return Poll::Pending;
        };
        let mut state = shared.state.lock();
        if let Some(value) = state.value.take() {
            return Poll::Ready(value);
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
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::task::Wake;

    struct CountingWaker(AtomicUsize);

    impl Wake for CountingWaker {
        fn wake(self: Arc<Self>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn offer_fills_empty_slot_once() {
        let (tx, rx) = slot::<u32>();
        assert!(tx.offer(1));
        assert!(!tx.offer(2), "second offer into a full slot is dropped");
        assert_eq!(rx.try_recv(), Ok(1));
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
        assert!(tx.offer(3));
        assert_eq!(rx.recv(), 3);
    }

    #[test]
    fn recv_blocks_until_offer() {
        let (tx, rx) = slot::<&'static str>();
        let handle = thread::spawn(move || rx.recv());
        thread::sleep(Duration::from_millis(20));
        assert!(tx.offer("fired"));
        assert_eq!(handle.join().expect("receiver thread"), "fired");
    }

    #[test]
    fn recv_timeout_reports_timeout() {
        let (_tx, rx) = slot::<u8>();
        assert_eq!(
            rx.recv_timeout(Duration::from_millis(10)),
            Err(RecvTimeoutError::Timeout)
        );
    }

    #[test]
    fn never_receiver_stays_empty() {
        let rx = Receiver::<u8>::never();
        assert!(rx.is_never());
        assert!(!rx.is_ready());
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
        assert_eq!(
            rx.recv_timeout(Duration::from_millis(5)),
            Err(RecvTimeoutError::Timeout)
        );
    }

    #[test]
    fn subscribed_receivers_share_the_slot() {
        let (tx, first) = slot::<u8>();
        let second = tx.subscribe();
        assert!(tx.offer(7));
        assert!(second.is_ready());
        assert_eq!(first.try_recv(), Ok(7));
        assert!(!second.is_ready());
    }

    #[test]
    fn poll_registers_waker_and_offer_wakes_it() {
        let (tx, mut rx) = slot::<u8>();
        let counter = Arc::new(CountingWaker(AtomicUsize::new(0)));
        let waker = Waker::from(Arc::clone(&counter));
        let mut cx = Context::from_waker(&waker);

        assert!(Pin::new(&mut rx).poll(&mut cx).is_pending());
        assert!(Pin::new(&mut rx).poll(&mut cx).is_pending());
        assert!(tx.offer(9));
        assert_eq!(counter.0.load(Ordering::SeqCst), 1, "one registered waker");
        assert_eq!(Pin::new(&mut rx).poll(&mut cx), Poll::Ready(9));
    }
}

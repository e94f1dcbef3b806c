//! Smoke tests for the wall-clock implementation.

mod common;

use asupersync_clock::{Callback, Clock, RealClock, Time};
use common::{DELIVERY_TIMEOUT, SILENCE_WINDOW, init_test_logging};
use std::sync::Arc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[test]
fn sleep_blocks_for_at_least_the_duration() {
    init_test_logging();
    let started = Instant::now();
    RealClock.sleep(ms(15));
    assert!(started.elapsed() >= ms(15));
}

#[test]
fn timer_through_trait_object() {
    let clock: Arc<dyn Clock> = Arc::new(RealClock::new());
    let before = clock.now();
    let timer = clock.new_timer(ms(5));
    let fired = timer.c().recv_timeout(DELIVERY_TIMEOUT).expect("timer fires");
    assert!(fired >= before);
    assert!(!timer.stop());
}

#[test]
fn after_fn_runs_callback() {
    let (tx, rx) = mpsc::channel();
    let callback: Callback = Arc::new(move || {
        let _ = tx.send(Time::now());
    });
    let timer = RealClock.after_fn(ms(5), callback);
    assert!(rx.recv_timeout(DELIVERY_TIMEOUT).is_ok());
    assert!(timer.c().is_never());
}

#[test]
fn stopped_after_fn_never_runs() {
    let (tx, rx) = mpsc::channel::<()>();
    let callback: Callback = Arc::new(move || {
        let _ = tx.send(());
    });
    let timer = RealClock.after_fn(ms(30), callback);
    assert!(timer.stop());
    assert!(rx.recv_timeout(ms(60)).is_err());
}

#[test]
fn ticker_delivers_and_drops_backlog() {
    let ticker = RealClock.new_ticker(ms(2));
    let c = ticker.c();
    std::thread::sleep(ms(20));
    // Several periods elapsed, but only one tick waits in the slot.
    assert!(c.try_recv().is_ok());
    assert!(c.recv_timeout(DELIVERY_TIMEOUT).is_ok());
    ticker.stop();
}

#[test]
fn tick_handle_shuts_down_on_drop() {
    let tick = RealClock.tick(ms(2));
    let c = tick.c();
    assert!(c.recv_timeout(DELIVERY_TIMEOUT).is_ok());
    drop(tick);
    std::thread::sleep(ms(10));
    let _ = c.try_recv();
    assert!(c.recv_timeout(SILENCE_WINDOW).is_err());
}

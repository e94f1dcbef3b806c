//! Property tests for the fake clock's firing and blocker guarantees.

mod common;

use asupersync_clock::{FakeClock, Receiver, Time};
use common::{init_test_logging, secs, test_proptest_config};
use proptest::prelude::*;
use std::time::Duration;

fn arb_delays() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(0_u64..50, 1..24)
}

fn arb_steps() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(0_u64..20, 1..12)
}

// ============================================================================
// Exactly-once firing
// ============================================================================

proptest! {
    #![proptest_config(test_proptest_config(128))]

    /// Every due sleeper fires exactly once with its own deadline; nothing
    /// fires early.
    #[test]
    fn due_sleepers_fire_exactly_once(delays in arb_delays(), steps in arb_steps()) {
        init_test_logging();
        let clock = FakeClock::new();
        let start = clock.now();
        let waiting: Vec<(Time, Receiver<Time>)> = delays
            .iter()
            .map(|&ms| (start + Duration::from_millis(ms), clock.after(Duration::from_millis(ms))))
            .collect();
        let mut fired = 0_usize;
        let zero_delays = delays.iter().filter(|&&ms| ms == 0).count();
        prop_assert_eq!(clock.pending_count(), delays.len() - zero_delays);

        for step in steps {
            clock.advance(Duration::from_millis(step));
            let now = clock.now();
            for (deadline, rx) in &waiting {
                if *deadline <= now {
                    if let Ok(value) = rx.try_recv() {
                        prop_assert_eq!(value, *deadline);
                        fired += 1;
                    }
                    prop_assert!(rx.try_recv().is_err(), "second delivery");
                } else {
                    prop_assert!(!rx.is_ready(), "fired before its deadline");
                }
            }
            let due = waiting.iter().filter(|(deadline, _)| *deadline <= now).count();
            prop_assert_eq!(fired, due);
            prop_assert_eq!(clock.pending_count(), waiting.len() - due);
        }
    }

    /// Stop returns true at most once per timer, and only while it was
    /// still going to fire.
    #[test]
    fn stop_is_true_at_most_once(delay in 0_u64..10, advance in 0_u64..10, stops in 1_usize..5) {
        let clock = FakeClock::new();
        let timer = clock.new_timer(secs(delay));
        let _c = timer.c();
        clock.advance(secs(advance));
        let would_fire = advance < delay;
        let results: Vec<bool> = (0..stops).map(|_| timer.stop()).collect();
        prop_assert_eq!(results[0], would_fire);
        prop_assert!(results[1..].iter().all(|stopped| !stopped));
    }
}

// ============================================================================
// Blocker thresholds
// ============================================================================

proptest! {
    #![proptest_config(test_proptest_config(128))]

    /// A blocker opens as soon as the pending count reaches its threshold,
    /// never before.
    #[test]
    fn blockers_open_exactly_at_threshold(
        thresholds in prop::collection::vec(0_usize..10, 1..8),
        sleepers in 0_usize..10,
    ) {
        let clock = FakeClock::new();
        let latches: Vec<_> = thresholds.iter().map(|&n| (n, clock.until(n))).collect();
        let mut receivers = Vec::new();

        for registered in 0..=sleepers {
            for (threshold, latch) in &latches {
                prop_assert_eq!(latch.is_open(), *threshold <= registered);
            }
            receivers.push(clock.after(secs(1)));
        }
        let open = thresholds.iter().filter(|&&n| n <= sleepers + 1).count();
        prop_assert_eq!(clock.blocker_count(), thresholds.len() - open);
    }
}

// ============================================================================
// Named properties
// ============================================================================

#[test]
fn zero_duration_waits_never_register() {
    let clock = FakeClock::new();
    let rx = clock.after(Duration::ZERO);
    clock.sleep(Duration::ZERO);
    assert_eq!(clock.pending_count(), 0);
    assert_eq!(rx.try_recv(), Ok(clock.now()));
}

#[test]
fn until_resolves_immediately_when_already_met() {
    let clock = FakeClock::new();
    let _a = clock.after(secs(1));
    let _b = clock.after(secs(2));
    assert!(clock.until(2).is_open());
    assert!(clock.until(1).is_open());
    assert!(!clock.until(3).is_open());
    assert_eq!(clock.blocker_count(), 1);
}

#[test]
fn blocker_survives_advances_until_met() {
    let clock = FakeClock::new();
    let latch = clock.until(2);
    let _a = clock.after(secs(1));
    clock.advance(secs(1));
    assert!(!latch.is_open(), "fired sleeper no longer counts");
    let _b = clock.after(secs(1));
    assert!(!latch.is_open());
    let _c = clock.after(secs(1));
    assert!(latch.is_open());
}

#[test]
fn timer_scenario_stop_before_second_advance() {
    let clock = FakeClock::new();
    let timer = clock.new_timer(secs(2));
    let c = timer.c();
    clock.advance(secs(1));
    assert!(!c.is_ready());
    assert!(timer.stop());
    clock.advance(secs(1));
    assert!(!c.is_ready());
}

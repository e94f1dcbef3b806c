//! Test utilities shared by unit and integration tests.
//!
//! - Consistent tracing-based logging initialization
//! - Phase/section macros for readable test output
//! - Assertion macro that logs expected/actual before asserting
//! - Real-time guards for waiting on fake-clock deliveries

use crate::channel::{Latch, Receiver};
use crate::types::Time;
use std::sync::Once;
use std::time::Duration;
use tracing_subscriber::fmt::format::FmtSpan;

static INIT_LOGGING: Once = Once::new();

/// Real time allowed for a delivery that is expected to arrive.
pub const DELIVERY_TIMEOUT: Duration = Duration::from_millis(500);

/// Real time spent confirming that nothing arrives.
pub const SILENCE_WINDOW: Duration = Duration::from_millis(50);

/// Initialize test logging with trace-level output.
///
/// Safe to call multiple times; only initializes once.
pub fn init_test_logging() {
    init_test_logging_with_level(tracing::Level::TRACE);
}

/// Initialize test logging with a custom level.
///
/// The first call wins; later calls are no-ops.
pub fn init_test_logging_with_level(level: tracing::Level) {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_test_writer()
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(false)
            .try_init();
    });
}

/// Asserts that `rx` yields `expected` within [`DELIVERY_TIMEOUT`].
#[track_caller]
pub fn assert_delivered(rx: &Receiver<Time>, expected: Time) {
    match rx.recv_timeout(DELIVERY_TIMEOUT) {
        Ok(actual) => assert_eq!(actual, expected, "delivered instant"),
        Err(err) => panic!("expected delivery of {expected}: {err}"),
    }
}

/// Asserts that `rx` stays empty for [`SILENCE_WINDOW`].
#[track_caller]
pub fn assert_not_delivered(rx: &Receiver<Time>) {
    if let Ok(actual) = rx.recv_timeout(SILENCE_WINDOW) {
        panic!("unexpected delivery of {actual}");
    }
}

/// Asserts that `latch` opens within [`DELIVERY_TIMEOUT`].
#[track_caller]
pub fn assert_opens(latch: &Latch, what: &str) {
    assert!(latch.wait_timeout(DELIVERY_TIMEOUT), "timeout waiting for {what}");
}

/// Log a test phase transition with a visual separator.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        tracing::info!(phase = %$name, "========================================");
        tracing::info!(phase = %$name, "TEST PHASE: {}", $name);
        tracing::info!(phase = %$name, "========================================");
    };
}

/// Log a section within a test phase.
#[macro_export]
macro_rules! test_section {
    ($name:expr) => {
        tracing::debug!(section = %$name, "--- {} ---", $name);
    };
}

/// Log test completion with summary.
#[macro_export]
macro_rules! test_complete {
    ($name:expr) => {
        tracing::info!(test = %$name, "test completed successfully: {}", $name);
    };
    ($name:expr, $($key:ident = $value:expr),* $(,)?) => {
        tracing::info!(
            test = %$name,
            $($key = %$value,)*
            "test completed successfully: {}",
            $name
        );
    };
}

/// Log before assertions for context.
#[macro_export]
macro_rules! assert_with_log {
    ($cond:expr, $msg:expr, $expected:expr, $actual:expr) => {
        tracing::debug!(
            expected = ?$expected,
            actual = ?$actual,
            "Asserting: {}",
            $msg
        );
        assert!($cond, "{}: expected {:?}, got {:?}", $msg, $expected, $actual);
    };
}

//! Asupersync clock: a virtual-time clock for deterministic tests.
//!
//! # Overview
//!
//! Code that sleeps, waits on timers or reads tickers is hard to test against
//! the wall clock: tests either sleep for real or race. This crate puts all
//! of those operations behind the [`Clock`] trait and ships two
//! implementations:
//!
//! - [`RealClock`]: the system clock, backed by OS threads.
//! - [`FakeClock`]: a clock whose time only moves when a test calls
//!   [`advance`](FakeClock::advance). Every sleeper that falls due fires
//!   before `advance` returns, and [`until`](FakeClock::until) lets the test
//!   wait for the code under test to actually reach its waits first.
//!
//! # Module Structure
//!
//! - [`clock`]: the `Clock`, `FakeClockApi`, `Timer` and `Ticker` traits
//! - [`fake`]: the virtual-time engine
//! - [`real`]: the wall-clock implementation
//! - [`channel`]: capacity-1 delivery slots and one-shot latches
//! - [`types`]: the [`Time`] instant
//! - [`config`]: fake clock configuration
//! - [`error`](mod@error): error types
//! - [`tracing_compat`]: optional tracing integration
//!
//! # Example
//!
//! ```
//! use asupersync_clock::{FakeClock, Time};
//! use std::time::Duration;
//!
//! let clock = FakeClock::new();
//! let timer = clock.new_timer(Duration::from_secs(2));
//! let expired = timer.c();
//!
//! clock.advance(Duration::from_secs(1));
//! assert!(!expired.is_ready());
//! clock.advance(Duration::from_secs(1));
//! assert_eq!(expired.recv(), Time::from_secs(3));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_inception)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_possible_truncation)]

pub mod channel;
pub mod clock;
pub mod config;
pub mod error;
pub mod fake;
pub mod real;
pub mod tracing_compat;
pub mod types;

// ── Test-only modules ───────────────────────────────────────────────────
#[cfg(any(test, feature = "test-internals"))]
pub mod test_utils;

// Re-exports for convenient access to core types
pub use channel::{Latch, Receiver, RecvTimeoutError, TryRecvError};
pub use clock::{Callback, Clock, FakeClockApi, Tick, Ticker, Timer};
pub use config::{ClockConfig, ConfigError};
pub use error::ClockError;
pub use fake::{FakeClock, FakeClockBuilder, FakeTicker, FakeTimer};
pub use real::{RealClock, RealTicker, RealTimer};
pub use types::Time;

//! Builder for configured fake clocks.

use super::FakeClock;
use crate::config::{ClockConfig, ConfigError};
use crate::types::Time;
use std::time::SystemTime;

/// Builds a [`FakeClock`] from a [`ClockConfig`].
///
/// ```
/// use asupersync_clock::{FakeClock, Time};
///
/// let clock = FakeClock::builder()
///     .start(Time::from_secs(100))
///     .callback_thread_name("timeouts")
///     .build()
///     .unwrap();
/// assert_eq!(clock.now(), Time::from_secs(100));
/// ```
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct FakeClockBuilder {
    config: ClockConfig,
}

impl FakeClockBuilder {
    /// Starts from the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the starting virtual instant.
    pub fn start(mut self, start: Time) -> Self {
        self.config.start = start;
        self
    }

    /// Sets the starting virtual instant from a wall-clock value.
    ///
    /// Instants before the Unix epoch clamp to the epoch.
    pub fn start_at(self, start: SystemTime) -> Self {
        self.start(Time::from_system_time(start))
    }

    /// Sets the name of threads that run `after_fn` callbacks.
    pub fn callback_thread_name(mut self, name: impl Into<String>) -> Self {
        self.config.callback_thread_name = name.into();
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ClockConfig) -> Self {
        self.config = config;
        self
    }

    /// Validates the configuration and creates the clock.
    pub fn build(self) -> Result<FakeClock, ConfigError> {
        self.config.validate()?;
        Ok(FakeClock::from_valid_config(self.config))
    }
}

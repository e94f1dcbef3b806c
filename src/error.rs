//! Error types for clock construction misuse.

use std::time::Duration;

/// Errors raised when a clock primitive is constructed with invalid input.
///
/// [`Clock::new_ticker`](crate::Clock::new_ticker) turns these into a panic,
/// matching the platform ticker it stands in for;
/// [`Clock::try_new_ticker`](crate::Clock::try_new_ticker) returns them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ClockError {
    /// A repeating interval must be strictly positive.
    #[error("non-positive interval for ticker: {0:?}")]
    NonPositiveInterval(Duration),
}

impl ClockError {
    /// Validates a ticker interval.
    pub(crate) fn check_interval(interval: Duration) -> Result<Duration, Self> {
        if interval.is_zero() {
            Err(Self::NonPositiveInterval(interval))
        } else {
            Ok(interval)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_interval_is_rejected() {
        let err = ClockError::check_interval(Duration::ZERO).unwrap_err();
        assert_eq!(err, ClockError::NonPositiveInterval(Duration::ZERO));
        assert_eq!(err.to_string(), "non-positive interval for ticker: 0ns");
    }

    #[test]
    fn positive_interval_passes_through() {
        let interval = Duration::from_millis(5);
        assert_eq!(ClockError::check_interval(interval), Ok(interval));
    }
}

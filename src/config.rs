//! Fake clock configuration.
//!
//! [`ClockConfig`] is what [`FakeClockBuilder`](crate::FakeClockBuilder)
//! accumulates. With the `config-file` feature it can also be loaded from
//! TOML:
//!
//! ```toml
//! # nanoseconds since the Unix epoch
//! start = 1_000_000_000
//! callback_thread_name = "my-test-callbacks"
//! ```

use crate::types::Time;
use serde::{Deserialize, Serialize};

/// Default starting instant of a fake clock: one second past the Unix epoch.
pub const DEFAULT_START: Time = Time::from_secs(1);

/// Default name for threads that run fake-clock callbacks.
pub const DEFAULT_CALLBACK_THREAD_NAME: &str = "asupersync-clock-callback";

/// Errors produced while building or loading a clock configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A field holds a value the clock cannot use.
    #[error("invalid clock config: {0}")]
    Invalid(String),
    /// The configuration file could not be read.
    #[cfg(feature = "config-file")]
    #[error("failed to read clock config {path}: {source}")]
    Io {
        /// Path that was being read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The configuration text is not valid TOML for [`ClockConfig`].
    #[cfg(feature = "config-file")]
    #[error("failed to parse clock config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Settings for a [`FakeClock`](crate::FakeClock).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Virtual instant the clock starts at.
    pub start: Time,
    /// Name given to threads that run `after_fn` callbacks.
    pub callback_thread_name: String,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            start: DEFAULT_START,
            callback_thread_name: DEFAULT_CALLBACK_THREAD_NAME.to_string(),
        }
    }
}

impl ClockConfig {
    /// Checks that the configuration can be used to build a clock.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.callback_thread_name.is_empty() {
            return Err(ConfigError::Invalid(
                "callback_thread_name must not be empty".to_string(),
            ));
        }
        if self.callback_thread_name.contains('\0') {
            return Err(ConfigError::Invalid(
                "callback_thread_name must not contain NUL bytes".to_string(),
            ));
        }
        Ok(())
    }

    /// Parses and validates a TOML document.
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    #[cfg(feature = "config-file")]
    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_starts_one_second_past_epoch() {
        let config = ClockConfig::default();
        assert_eq!(config.start, Time::from_secs(1));
        assert_eq!(config.callback_thread_name, DEFAULT_CALLBACK_THREAD_NAME);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_thread_name_is_invalid() {
        let config = ClockConfig {
            callback_thread_name: String::new(),
            ..ClockConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("must not be empty"), "{err}");
    }

    #[test]
    fn nul_in_thread_name_is_invalid() {
        let config = ClockConfig {
            callback_thread_name: "bad\0name".to_string(),
            ..ClockConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn toml_overrides_fields_and_defaults_the_rest() {
        let config = ClockConfig::from_toml_str("start = 5000000000\n").expect("valid toml");
        assert_eq!(config.start, Time::from_secs(5));
        assert_eq!(config.callback_thread_name, DEFAULT_CALLBACK_THREAD_NAME);
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn toml_type_errors_surface_as_parse_errors() {
        let err = ClockConfig::from_toml_str("start = \"soon\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)), "{err}");
    }
}

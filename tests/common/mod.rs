//! Shared helpers for integration tests.

#![allow(dead_code)]

use proptest::test_runner::{Config as ProptestConfig, RngSeed};
use std::time::Duration;

pub use asupersync_clock::test_utils::{
    DELIVERY_TIMEOUT, SILENCE_WINDOW, assert_delivered, assert_not_delivered, assert_opens,
    init_test_logging,
};

/// Environment variable that pins the proptest seed.
pub const PROPTEST_SEED_ENV: &str = "ASUPERSYNC_CLOCK_PROPTEST_SEED";

/// Seed used on CI when none is given.
pub const DEFAULT_PROPTEST_SEED: u64 = 0x5EED_5EED;

/// Proptest configuration with a reproducible seed on CI.
pub fn test_proptest_config(cases: u32) -> ProptestConfig {
    let mut config = ProptestConfig::with_cases(cases);
    if let Some(seed) = read_proptest_seed() {
        config.rng_seed = RngSeed::Fixed(seed);
    }
    config
}

fn read_proptest_seed() -> Option<u64> {
    if let Ok(value) = std::env::var(PROPTEST_SEED_ENV) {
        return value.parse::<u64>().ok();
    }
    if std::env::var("CI").is_ok() {
        return Some(DEFAULT_PROPTEST_SEED);
    }
    None
}

/// Whole seconds as a [`Duration`].
pub const fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

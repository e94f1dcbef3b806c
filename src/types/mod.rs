//! Core value types shared by the fake and real clocks.

mod time;

pub(crate) use time::duration_to_nanos_saturating;
pub use time::Time;

//! Delivery primitives used by clocks to hand values to waiters.
//!
//! - [`Receiver`]: the receiving half of a capacity-1 slot. Clocks deliver the
//!   firing instant into it without ever blocking; a second delivery into a
//!   full slot is dropped, which is exactly how a slow ticker consumer loses
//!   ticks.
//! - [`Latch`]: a one-shot completion signal that stays open once opened and
//!   can be observed by any number of waiters.
//!
//! Both can be consumed synchronously (`recv`/`wait`) or polled as futures,
//! so neither the fake nor the real clock pulls in an executor.

mod latch;
mod slot;

pub use latch::Latch;
pub use slot::{Receiver, RecvTimeoutError, TryRecvError};

pub(crate) use slot::{Sender, slot};

//! Timer utilities.
//!
//! This module provides the timer queue the runtime drives and the
//! task-tree primitives built on it:
//! - [`Timers`] for registering single-shot callbacks,
//! - [`delay`] for a node that resolves after a duration.

mod delay;
mod timers;

#[doc(inline)]
pub use delay::delay;

#[doc(inline)]
pub use timers::{Clock, TimerHandle, Timers};

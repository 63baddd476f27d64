//! Core runtime components.
//!
//! This module contains the task tree and the machinery that walks it.
//!
//! It is responsible for:
//! - storing task nodes and their parent/child/sibling links,
//! - advancing nodes through their state machine with a single cursor,
//! - capturing tree positions so deferred callbacks attach work correctly,
//! - bundling a scheduler with a timer queue for synchronous entry points.
//!
//! Most users will interact with [`Scheduler`], [`Scope`] and
//! [`Future`](crate::Future) rather than the node-level types.

mod core;
mod driver;

pub(crate) mod builder;
pub(crate) mod context;
pub(crate) mod scheduler;

pub mod task;

pub use builder::{RuntimeBuilder, SchedulerBuilder};
pub use context::Scope;
pub use self::core::Runtime;
pub use scheduler::Scheduler;

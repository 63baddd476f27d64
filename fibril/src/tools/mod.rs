//! Helpers built on top of the task tree.
//!
//! The main entry point is [`Scope::action`](crate::Scope::action), which
//! turns a future-returning function into an [`Action`] whose every call
//! forks a node named after it.

mod action;

#[doc(inline)]
pub use action::Action;

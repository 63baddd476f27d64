//! # Fibril
//!
//! **Fibril** is a single-threaded cooperative task-tree scheduler for Rust,
//! with a composable [`Future`] abstraction built directly on top of it.
//!
//! Work is organised as a tree: every node is created inside a [`Scope`],
//! attaches as the last child of that scope's frame, and only completes once
//! all of its children have. One cursor walks the tree depth-first, so the
//! order in which bodies run is fully determined by the order in which work
//! was created.
//!
//! Fibril is built around a few guarantees:
//!
//! - **Structured concurrency**: a parent never commits before its children
//! - **Deterministic ordering**: siblings begin and commit in creation order
//! - **Fail-fast cancellation**: a rejection skips every sibling and
//!   descendant that has not started yet
//! - **Correct re-entry**: a body suspended on a timer or any other callback
//!   source resumes at the right place in the tree
//! - **Ergonomic macros** like `#[fibril::main]`, `#[fibril::test]`, `all!`
//!   and `race!`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fibril::time::delay;
//! use std::time::Duration;
//!
//! #[fibril::main]
//! fn main() {
//!     let timers = runtime.timers().clone();
//!
//!     let greeting = runtime.block_on(|cx| {
//!         delay(cx, &timers, Duration::from_millis(100)).map(|()| "Hello")
//!     });
//!
//!     println!("{greeting:?}");
//! }
//! ```
//!
//! ## Modules
//!
//! - [`time`] — Timer queue and the `delay` primitive
//! - [`task`] — Node identities, states and completions
//! - [`tools`] — Utilities like named actions
//!
//! ## Getting Started
//!
//! Add Fibril to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! fibril = { git = "https://github.com/Nebula-ecosystem/fibril", package = "fibril" }
//! ```

mod error;
mod future;
mod runtime;
mod utils;

pub mod time;
pub mod tools;

pub use error::BlockOnError;
pub use future::Future;
pub use runtime::task;
pub use runtime::task::{Completion, NodeId, State, Transition};
pub use runtime::{Runtime, RuntimeBuilder, Scheduler, SchedulerBuilder, Scope};

pub use fibril_macros::*;

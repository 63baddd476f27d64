//! Utilities for memory-efficient data structures.
//!
//! This module provides low-level utilities used internally by the scheduler.
//! In particular, it exposes the generational [`Arena`] that stores the task
//! tree, with stable indices and reuse of freed slots.

mod arena;

pub(crate) use arena::{Arena, Index};

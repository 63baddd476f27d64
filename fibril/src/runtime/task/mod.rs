//! Task nodes.
//!
//! This module defines the records the scheduler arranges into its tree:
//! - node identity and links,
//! - the node state machine,
//! - the resolve/reject continuation handed to node bodies,
//! - the `Work` implementations behind [`schedule`](crate::Scope::schedule)
//!   and [`fork`](crate::Scope::fork).
//!
//! Most users interact with this module through [`Scope`] and
//! [`Completion`]; the lower-level pieces are driven by the scheduler.

pub(crate) mod completion;
pub(crate) mod core;
pub(crate) mod state;

pub use completion::Completion;
pub use state::{State, Transition};

use crate::runtime::context::Scope;
use crate::utils::Index;

use std::fmt;
use std::rc::Rc;

/// Identifies one node of the task tree.
///
/// Ids are only meaningful to the scheduler that produced them. An id whose
/// node has been reclaimed never matches a node created later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) Index);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0.slot())
    }
}

/// The behaviour attached to a node.
///
/// The driver calls `begin` once when the node enters `Running`, `commit`
/// once after the node and its whole subtree settled, and `cancel` instead
/// of both when a rejection cascade skips the node.
pub(crate) trait Work<E> {
    fn begin(&mut self, scope: &Scope<E>);

    fn commit(&mut self, outcome: Result<(), E>);

    fn cancel(&mut self) {}
}

/// One record of the task tree.
pub(crate) struct Node<E> {
    pub(crate) name: Rc<str>,
    pub(crate) state: State,

    /// Back-link to the owning frame (`None` for forest roots).
    pub(crate) parent: Option<NodeId>,
    pub(crate) first_child: Option<NodeId>,

    /// Kept so appends stay O(1); children are only ever appended.
    pub(crate) last_child: Option<NodeId>,
    pub(crate) next_sibling: Option<NodeId>,

    /// Rejection reason, present once the node settled `Rejected`.
    pub(crate) error: Option<E>,

    /// Taken out while begin runs and dropped after commit or cancel.
    pub(crate) work: Option<Box<dyn Work<E>>>,
}

impl<E> Node<E> {
    pub(crate) fn new(name: Rc<str>, parent: Option<NodeId>, work: Box<dyn Work<E>>) -> Self {
        Self {
            name,
            state: State::Waiting,
            parent,
            first_child: None,
            last_child: None,
            next_sibling: None,
            error: None,
            work: Some(work),
        }
    }
}

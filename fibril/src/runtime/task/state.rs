use std::fmt;
use std::rc::Rc;

use super::NodeId;

/// Lifecycle state of a task node.
///
/// State machine:
/// ```text
/// Waiting → Running → Resolved ─┐
///    │         ├─────→ Rejected ─┴→ Committed
///    │         └──────────────────↗ (awaited input cancelled)
///    └──────────────────────────────↗ (cascade bail-out)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Created and attached, begin has not run yet.
    Waiting,

    /// Begin has run; the node has not settled.
    Running,

    /// Settled successfully; waiting for children before committing.
    Resolved,

    /// Settled with a rejection; waiting for children before committing.
    Rejected,

    /// Outcome delivered, or the node was cancelled.
    Committed,
}

impl State {
    /// Returns `true` once the node left `Running` through a settlement.
    pub const fn is_settled(self) -> bool {
        matches!(self, Self::Resolved | Self::Rejected)
    }

    /// Returns `true` once begin has been invoked (or skipped by a cascade).
    pub const fn has_started(self) -> bool {
        !matches!(self, Self::Waiting)
    }

    /// Returns `true` for the terminal state.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Committed)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Waiting => "WAITING",
            Self::Running => "RUNNING",
            Self::Resolved => "RESOLVED",
            Self::Rejected => "REJECTED",
            Self::Committed => "COMMITTED",
        };

        f.write_str(label)
    }
}

/// A single node state change, as reported to the diagnostics hook.
#[derive(Debug, Clone)]
pub struct Transition {
    /// Node that changed state.
    pub id: NodeId,

    /// Name given to the node at creation.
    pub name: Rc<str>,

    /// State before the change.
    pub from: State,

    /// State after the change.
    pub to: State,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} => {}", self.name, self.from, self.to)
    }
}

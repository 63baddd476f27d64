use crate::future::channel::Channel;
use crate::runtime::context::Scope;
use crate::runtime::scheduler::Shared;
use crate::runtime::task::NodeId;

use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// The resolve/reject continuation handed to a node body.
///
/// A `Completion` settles exactly once: the first call to [`resolve`],
/// [`reject`] or [`settle`] wins and every later call is ignored. It can be
/// cloned freely and moved into callbacks registered with a native
/// asynchronous primitive; when such a callback fires while the scheduler is
/// idle, settling restarts the walk at the node.
///
/// [`resolve`]: Self::resolve
/// [`reject`]: Self::reject
/// [`settle`]: Self::settle
pub struct Completion<T, E> {
    sink: Sink<T, E>,
}

enum Sink<T, E> {
    /// Settles a tree node; the value waits in `slot` until commit.
    Node {
        scheduler: Weak<Shared<E>>,
        id: NodeId,
        slot: Rc<RefCell<Option<T>>>,
    },

    /// Settles a bare channel (used by forked bodies).
    Channel(Channel<T, E>),
}

impl<T, E> Clone for Completion<T, E> {
    fn clone(&self) -> Self {
        let sink = match &self.sink {
            Sink::Node {
                scheduler,
                id,
                slot,
            } => Sink::Node {
                scheduler: scheduler.clone(),
                id: *id,
                slot: slot.clone(),
            },
            Sink::Channel(channel) => Sink::Channel(channel.clone()),
        };

        Self { sink }
    }
}

impl<T, E> Completion<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    /// Completion bound to the frame node of `scope`.
    pub(crate) fn for_frame(scope: &Scope<E>, slot: Rc<RefCell<Option<T>>>) -> Option<Self> {
        let id = scope.frame()?;

        Some(Self {
            sink: Sink::Node {
                scheduler: scope.scheduler().clone(),
                id,
                slot,
            },
        })
    }

    pub(crate) fn for_channel(channel: Channel<T, E>) -> Self {
        Self {
            sink: Sink::Channel(channel),
        }
    }

    /// Settles successfully with `value`.
    pub fn resolve(&self, value: T) {
        self.settle(Ok(value));
    }

    /// Settles with the rejection `error`.
    pub fn reject(&self, error: E) {
        self.settle(Err(error));
    }

    /// Settles with `outcome`, unless something settled first.
    pub fn settle(&self, outcome: Result<T, E>) {
        match &self.sink {
            Sink::Node {
                scheduler,
                id,
                slot,
            } => {
                let Some(shared) = scheduler.upgrade() else {
                    return;
                };

                if !shared.is_running(*id) {
                    return;
                }

                // The value must be in place before the node can commit.
                let outcome = outcome.map(|value| {
                    *slot.borrow_mut() = Some(value);
                });

                shared.settle(*id, outcome);
            }
            Sink::Channel(channel) => {
                channel.settle(outcome);
            }
        }
    }

    /// Gives up on the node: it commits as cancelled without settling.
    ///
    /// Used by nodes whose awaited input was cancelled.
    pub(crate) fn abandon(&self) {
        match &self.sink {
            Sink::Node { scheduler, id, .. } => {
                if let Some(shared) = scheduler.upgrade() {
                    shared.abandon(*id);
                }
            }
            Sink::Channel(channel) => {
                channel.cancel();
            }
        }
    }

    /// Returns `true` once this continuation can no longer change anything.
    pub fn is_settled(&self) -> bool {
        match &self.sink {
            Sink::Node { scheduler, id, .. } => scheduler
                .upgrade()
                .is_none_or(|shared| !shared.is_running(*id)),
            Sink::Channel(channel) => !channel.is_pending(),
        }
    }
}

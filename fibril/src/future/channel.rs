use std::cell::RefCell;
use std::mem;
use std::rc::Rc;

/// Called with the outcome on settlement, or with `None` on cancellation.
type Listener<T, E> = Box<dyn FnOnce(Option<Result<T, E>>)>;

/// Settlement state of a [`Channel`].
enum Slot<T, E> {
    /// Not settled yet; listeners run in registration order on settlement.
    Pending(Vec<Listener<T, E>>),

    Resolved(T),

    Rejected(E),

    /// The owning node was skipped by a rejection cascade.
    Cancelled,
}

/// A single-settlement completion channel.
///
/// The first call to [`settle`](Self::settle) wins; later calls return
/// `false` and change nothing. Listeners registered after settlement run
/// immediately with a copy of the outcome.
pub(crate) struct Channel<T, E> {
    slot: Rc<RefCell<Slot<T, E>>>,
}

impl<T, E> Clone for Channel<T, E> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<T, E> Channel<T, E> {
    pub(crate) fn new() -> Self {
        Self {
            slot: Rc::new(RefCell::new(Slot::Pending(Vec::new()))),
        }
    }

    pub(crate) fn is_pending(&self) -> bool {
        matches!(*self.slot.borrow(), Slot::Pending(_))
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        matches!(*self.slot.borrow(), Slot::Cancelled)
    }

    /// Marks the channel cancelled and runs the cancellation hooks.
    ///
    /// Settlement listeners are dropped without being called. Returns
    /// `false` if the channel had already settled.
    pub(crate) fn cancel(&self) -> bool {
        let listeners = {
            let mut slot = self.slot.borrow_mut();

            match mem::replace(&mut *slot, Slot::Cancelled) {
                Slot::Pending(listeners) => listeners,
                settled => {
                    *slot = settled;
                    return false;
                }
            }
        };

        for listener in listeners {
            listener(None);
        }

        true
    }

    /// Registers `hook` to run if the channel gets cancelled.
    ///
    /// Runs it right away if the channel already is; drops it once the
    /// channel settles.
    pub(crate) fn on_cancel(&self, hook: impl FnOnce() + 'static) {
        {
            let mut slot = self.slot.borrow_mut();

            match &mut *slot {
                Slot::Pending(listeners) => {
                    listeners.push(Box::new(move |outcome| {
                        if outcome.is_none() {
                            hook();
                        }
                    }));
                    return;
                }
                Slot::Cancelled => {}
                Slot::Resolved(_) | Slot::Rejected(_) => return,
            }
        }

        hook();
    }
}

impl<T, E> Channel<T, E>
where
    T: Clone,
    E: Clone,
{
    pub(crate) fn resolve(&self, value: T) -> bool {
        self.settle(Ok(value))
    }

    pub(crate) fn reject(&self, error: E) -> bool {
        self.settle(Err(error))
    }

    /// Settles the channel and runs every pending listener.
    pub(crate) fn settle(&self, outcome: Result<T, E>) -> bool {
        let listeners = {
            let mut slot = self.slot.borrow_mut();

            if !matches!(*slot, Slot::Pending(_)) {
                return false;
            }

            let settled = match &outcome {
                Ok(value) => Slot::Resolved(value.clone()),
                Err(error) => Slot::Rejected(error.clone()),
            };

            match mem::replace(&mut *slot, settled) {
                Slot::Pending(listeners) => listeners,
                _ => Vec::new(),
            }
        };

        for listener in listeners {
            listener(Some(outcome.clone()));
        }

        true
    }

    /// Registers `listener`, or runs it right away if already settled.
    ///
    /// A cancelled channel drops the listener without calling it.
    pub(crate) fn subscribe(&self, listener: impl FnOnce(Result<T, E>) + 'static) {
        let outcome = {
            let mut slot = self.slot.borrow_mut();

            match &mut *slot {
                Slot::Pending(listeners) => {
                    listeners.push(Box::new(move |outcome| {
                        if let Some(outcome) = outcome {
                            listener(outcome);
                        }
                    }));
                    return;
                }
                Slot::Resolved(value) => Ok(value.clone()),
                Slot::Rejected(error) => Err(error.clone()),
                Slot::Cancelled => return,
            }
        };

        listener(outcome);
    }

    pub(crate) fn peek(&self) -> Option<Result<T, E>> {
        match &*self.slot.borrow() {
            Slot::Resolved(value) => Some(Ok(value.clone())),
            Slot::Rejected(error) => Some(Err(error.clone())),
            Slot::Pending(_) | Slot::Cancelled => None,
        }
    }
}

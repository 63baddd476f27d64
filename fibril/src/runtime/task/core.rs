use super::{Completion, Work};
use crate::future::channel::Channel;
use crate::runtime::context::Scope;

use std::cell::RefCell;
use std::rc::Rc;

/// The work behind [`Scope::schedule`].
///
/// Begin runs the body with a completion bound to the node; commit moves the
/// settled value (or the node's rejection) into the public channel.
pub(crate) struct Task<T, E, F> {
    body: Option<F>,

    /// Value handed to `resolve`, parked here until the subtree commits.
    slot: Rc<RefCell<Option<T>>>,

    channel: Channel<T, E>,
}

impl<T, E, F> Task<T, E, F> {
    pub(crate) fn new(body: F, channel: Channel<T, E>) -> Self {
        Self {
            body: Some(body),
            slot: Rc::new(RefCell::new(None)),
            channel,
        }
    }
}

impl<T, E, F> Work<E> for Task<T, E, F>
where
    T: Clone + 'static,
    E: Clone + 'static,
    F: FnOnce(&Scope<E>, Completion<T, E>) -> Result<(), E>,
{
    fn begin(&mut self, scope: &Scope<E>) {
        let Some(body) = self.body.take() else {
            return;
        };
        let Some(done) = Completion::for_frame(scope, self.slot.clone()) else {
            return;
        };

        if let Err(error) = body(scope, done.clone()) {
            done.reject(error);
        }
    }

    fn commit(&mut self, outcome: Result<(), E>) {
        match outcome {
            Ok(()) => {
                if let Some(value) = self.slot.borrow_mut().take() {
                    self.channel.resolve(value);
                }
            }
            Err(error) => {
                self.channel.reject(error);
            }
        }
    }

    fn cancel(&mut self) {
        self.channel.cancel();
    }
}

/// The work behind [`Scope::fork`].
///
/// The fork node resolves as soon as its launch child is attached. Its
/// commit forwards whatever the body eventually reports into the public
/// channel.
pub(crate) struct Fork<T, E, F> {
    name: Rc<str>,
    body: Option<F>,

    /// Settled by the body, possibly long after this node committed.
    launched: Channel<T, E>,

    channel: Channel<T, E>,
}

impl<T, E, F> Fork<T, E, F> {
    pub(crate) fn new(name: Rc<str>, body: F, channel: Channel<T, E>) -> Self {
        Self {
            name,
            body: Some(body),
            launched: Channel::new(),
            channel,
        }
    }
}

impl<T, E, F> Work<E> for Fork<T, E, F>
where
    T: Clone + 'static,
    E: Clone + 'static,
    F: FnOnce(&Scope<E>, Completion<T, E>) -> Result<(), E> + 'static,
{
    fn begin(&mut self, scope: &Scope<E>) {
        let Some(body) = self.body.take() else {
            return;
        };

        let launch = Launch {
            body: Some(body),
            launched: self.launched.clone(),
        };
        let name: Rc<str> = Rc::from(format!("{}@launch", self.name));

        scope.attach(name, Box::new(launch));
        scope.settle_frame(Ok(()));
    }

    fn commit(&mut self, outcome: Result<(), E>) {
        match outcome {
            Ok(()) => {
                let channel = self.channel.clone();
                self.launched.subscribe(move |outcome| {
                    channel.settle(outcome);
                });

                let channel = self.channel.clone();
                self.launched.on_cancel(move || {
                    channel.cancel();
                });
            }
            Err(error) => {
                self.channel.reject(error);
            }
        }
    }

    fn cancel(&mut self) {
        self.channel.cancel();
    }
}

/// Child of a fork node: starts the body, resolves, and then detaches so
/// the fork node does not wait on the nodes the body scheduled.
struct Launch<T, E, F> {
    body: Option<F>,
    launched: Channel<T, E>,
}

impl<T, E, F> Work<E> for Launch<T, E, F>
where
    T: Clone + 'static,
    E: Clone + 'static,
    F: FnOnce(&Scope<E>, Completion<T, E>) -> Result<(), E>,
{
    fn begin(&mut self, scope: &Scope<E>) {
        if let Some(body) = self.body.take() {
            let done = Completion::for_channel(self.launched.clone());

            if let Err(error) = body(scope, done.clone()) {
                done.reject(error);
            }
        }

        scope.settle_frame(Ok(()));
        scope.detach_frame();
    }

    fn commit(&mut self, _outcome: Result<(), E>) {}

    fn cancel(&mut self) {
        self.launched.cancel();
    }
}

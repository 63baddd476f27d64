use crate::future::Future;
use crate::future::channel::Channel;
use crate::runtime::scheduler::Shared;
use crate::runtime::task::core::{Fork, Task};
use crate::runtime::task::{Completion, NodeId, Work};

use std::rc::{Rc, Weak};

/// A captured position in the task tree.
///
/// Every node body and every deferred continuation receives a `Scope` naming
/// its owning frame. Nodes created through the scope attach as the last child
/// of that frame, whatever the scheduler happens to be doing when the code
/// runs. The root scope (and any scope whose frame has already committed)
/// creates new forest roots instead.
///
/// Scopes hold the scheduler weakly: once the [`Scheduler`] is dropped, every
/// future created through a scope starts out cancelled.
///
/// [`Scheduler`]: crate::Scheduler
pub struct Scope<E> {
    scheduler: Weak<Shared<E>>,
    frame: Option<NodeId>,
}

impl<E> Clone for Scope<E> {
    fn clone(&self) -> Self {
        Self {
            scheduler: self.scheduler.clone(),
            frame: self.frame,
        }
    }
}

impl<E> Scope<E> {
    pub(crate) fn new(scheduler: Weak<Shared<E>>, frame: Option<NodeId>) -> Self {
        Self { scheduler, frame }
    }

    pub(crate) fn scheduler(&self) -> &Weak<Shared<E>> {
        &self.scheduler
    }

    /// The node new work attaches under, or `None` for the root scope.
    pub fn frame(&self) -> Option<NodeId> {
        self.frame
    }

    /// Returns `true` for the root scope.
    pub fn is_root(&self) -> bool {
        self.frame.is_none()
    }
}

impl<E: Clone + 'static> Scope<E> {
    /// Attaches a node running `work` under this scope's frame.
    ///
    /// Returns `None` if the scheduler is gone.
    pub(crate) fn attach(&self, name: Rc<str>, work: Box<dyn Work<E>>) -> Option<NodeId> {
        let shared = self.scheduler.upgrade()?;

        Some(shared.attach(self.frame, name, work))
    }

    /// Settles the frame node itself.
    pub(crate) fn settle_frame(&self, outcome: Result<(), E>) {
        if let (Some(shared), Some(frame)) = (self.scheduler.upgrade(), self.frame) {
            shared.settle(frame, outcome);
        }
    }

    /// Turns the frame node into a forest root, releasing its parent.
    pub(crate) fn detach_frame(&self) {
        if let (Some(shared), Some(frame)) = (self.scheduler.upgrade(), self.frame) {
            shared.detach(frame);
        }
    }

    /// Schedules `body` as a new node.
    ///
    /// The body runs when the walk reaches the node: immediately for a root
    /// created while the scheduler is idle, otherwise after every earlier
    /// sibling committed. It settles the node through the [`Completion`],
    /// now or from a later callback; returning `Err` rejects the node.
    ///
    /// The node commits once it settled and all the nodes its body scheduled
    /// have committed. The returned future settles on commit.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fibril::Scheduler;
    ///
    /// let scheduler = Scheduler::<&str>::new();
    /// let answer = scheduler.schedule("answer", |_, done| {
    ///     done.resolve(42);
    ///     Ok(())
    /// });
    ///
    /// assert_eq!(answer.peek(), Some(Ok(42)));
    /// ```
    pub fn schedule<T, F>(&self, name: &str, body: F) -> Future<T, E>
    where
        T: Clone + 'static,
        F: FnOnce(&Scope<E>, Completion<T, E>) -> Result<(), E> + 'static,
    {
        let name: Rc<str> = Rc::from(name);
        let channel = Channel::new();
        let task = Task::new(body, channel.clone());

        if self.attach(name.clone(), Box::new(task)).is_none() {
            channel.cancel();
        }

        Future::new(name, channel, self.clone())
    }

    /// Starts `body` without making the walk wait for its result.
    ///
    /// The body starts right away in a launch node. Once it returns, the
    /// launch node is split off into a forest root of its own, so the fork
    /// node commits and later siblings begin while the nodes the body
    /// scheduled are still in flight. The returned future settles with
    /// whatever the body reports through its [`Completion`].
    ///
    /// A rejection reported by the body, or by a node it scheduled, settles
    /// the returned future only; it never reaches the fork node's parent.
    pub fn fork<T, F>(&self, name: &str, body: F) -> Future<T, E>
    where
        T: Clone + 'static,
        F: FnOnce(&Scope<E>, Completion<T, E>) -> Result<(), E> + 'static,
    {
        let name: Rc<str> = Rc::from(name);
        let channel = Channel::new();
        let fork = Fork::new(name.clone(), body, channel.clone());

        if self.attach(name.clone(), Box::new(fork)).is_none() {
            channel.cancel();
        }

        Future::new(name, channel, self.clone())
    }

    /// A future over a node that resolves with `value` as soon as it runs.
    pub fn resolved<T>(&self, value: T) -> Future<T, E>
    where
        T: Clone + 'static,
    {
        self.schedule("resolved", move |_, done| {
            done.resolve(value);
            Ok(())
        })
    }

    /// A future over a node that rejects with `error` as soon as it runs.
    pub fn rejected<T>(&self, error: E) -> Future<T, E>
    where
        T: Clone + 'static,
    {
        self.schedule("rejected", move |_, _| Err(error))
    }

    /// Binds a deferred continuation to this scope.
    ///
    /// The returned closure runs `f` with this scope, whenever and from
    /// wherever it is eventually called (a timer, an external completion).
    /// If the scheduler is idle afterwards, the walk restarts at the owning
    /// frame so anything `f` attached there gets to run.
    pub fn bind<R, F>(&self, f: F) -> impl FnOnce() -> R + 'static
    where
        F: FnOnce(&Scope<E>) -> R + 'static,
    {
        let scope = self.clone();

        move || {
            let out = f(&scope);

            if let (Some(shared), Some(frame)) = (scope.scheduler.upgrade(), scope.frame) {
                shared.wake(frame);
            }

            out
        }
    }
}

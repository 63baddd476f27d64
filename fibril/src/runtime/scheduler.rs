use super::builder::SchedulerBuilder;
use super::context::Scope;
use super::driver::{Step, TransitionHook, Tree};
use super::task::{Completion, NodeId, State, Work};
use crate::future::Future;

use std::cell::RefCell;
use std::rc::Rc;

/// State shared by a scheduler and every scope and completion it issued.
pub(crate) struct Shared<E> {
    tree: RefCell<Tree<E>>,
}

impl<E: Clone + 'static> Shared<E> {
    pub(crate) fn attach(
        self: &Rc<Self>,
        frame: Option<NodeId>,
        name: Rc<str>,
        work: Box<dyn Work<E>>,
    ) -> NodeId {
        let (id, wake) = self.tree.borrow_mut().attach(frame, name, work);
        self.wake(wake);
        id
    }

    pub(crate) fn is_running(&self, id: NodeId) -> bool {
        self.tree.borrow().state(id) == Some(State::Running)
    }

    pub(crate) fn settle(self: &Rc<Self>, id: NodeId, outcome: Result<(), E>) {
        let settled = self.tree.borrow_mut().settle(id, outcome);

        if settled {
            self.wake(id);
        }
    }

    /// Turns `id` into a forest root and lets its old parent move on.
    pub(crate) fn detach(self: &Rc<Self>, id: NodeId) {
        let parent = self.tree.borrow_mut().detach(id);

        if let Some(parent) = parent {
            self.wake(parent);
        }
    }

    /// Commits a suspended node as cancelled.
    pub(crate) fn abandon(self: &Rc<Self>, id: NodeId) {
        let (work, parent) = self.tree.borrow_mut().abandon(id);

        if let Some(mut work) = work {
            work.cancel();
        }

        if let Some(parent) = parent {
            self.wake(parent);
        }
    }

    /// Resumes the walk at `id`, or queues it if the walk is busy.
    pub(crate) fn wake(self: &Rc<Self>, id: NodeId) {
        let idle = self.tree.borrow_mut().wake(id);

        if idle {
            self.drive();
        }
    }

    /// Runs the walk until it parks with nothing left in the wake queue.
    ///
    /// The tree is borrowed only inside [`Tree::step`]; begin, commit and
    /// cancel run with the borrow released so they can schedule and settle.
    fn drive(self: &Rc<Self>) {
        loop {
            let step = self.tree.borrow_mut().step();

            match step {
                Step::Begin(id, mut work) => {
                    let scope = Scope::new(Rc::downgrade(self), Some(id));
                    work.begin(&scope);

                    let abandoned = self.tree.borrow_mut().restore(id, work);

                    if let Some(mut work) = abandoned {
                        work.cancel();
                    }
                }
                Step::Commit(mut work, outcome, skipped) => {
                    work.commit(outcome);

                    for mut work in skipped {
                        work.cancel();
                    }
                }
                Step::Cancel(works) => {
                    for mut work in works {
                        work.cancel();
                    }
                }
                Step::Continue => {}
                Step::Idle => break,
            }
        }
    }
}

/// A single-threaded cooperative task-tree scheduler.
///
/// `Scheduler` owns the task forest and the walk cursor. Work enters through
/// [`schedule`](Self::schedule) and [`fork`](Self::fork) (or the same
/// methods on a [`Scope`]); the walk runs synchronously inside those calls
/// and inside completion callbacks, and parks whenever every reachable node
/// is waiting on an outside event.
///
/// `E` is the rejection type shared by every node of this scheduler.
///
/// Dropping the scheduler drops the whole forest; scopes and completions
/// that outlive it become inert.
///
/// # Examples
///
/// ```rust
/// use fibril::Scheduler;
///
/// let scheduler = Scheduler::<&str>::new();
///
/// let total = scheduler
///     .resolved(20)
///     .map(|n| n + 1)
///     .map(|n| n * 2);
///
/// assert_eq!(total.peek(), Some(Ok(42)));
/// ```
pub struct Scheduler<E> {
    shared: Rc<Shared<E>>,
}

impl<E: Clone + 'static> Scheduler<E> {
    /// Creates a scheduler with the default configuration.
    pub fn new() -> Self {
        SchedulerBuilder::new().build()
    }

    pub(crate) fn from_parts(capacity: usize, hook: Option<TransitionHook>) -> Self {
        let shared = Shared {
            tree: RefCell::new(Tree::new(capacity, hook)),
        };

        Self {
            shared: Rc::new(shared),
        }
    }

    /// The root scope: work scheduled through it starts new forest roots.
    pub fn root(&self) -> Scope<E> {
        Scope::new(Rc::downgrade(&self.shared), None)
    }

    /// Schedules `body` as a new forest root. See [`Scope::schedule`].
    pub fn schedule<T, F>(&self, name: &str, body: F) -> Future<T, E>
    where
        T: Clone + 'static,
        F: FnOnce(&Scope<E>, Completion<T, E>) -> Result<(), E> + 'static,
    {
        self.root().schedule(name, body)
    }

    /// Forks `body` as a new forest root. See [`Scope::fork`].
    pub fn fork<T, F>(&self, name: &str, body: F) -> Future<T, E>
    where
        T: Clone + 'static,
        F: FnOnce(&Scope<E>, Completion<T, E>) -> Result<(), E> + 'static,
    {
        self.root().fork(name, body)
    }

    /// See [`Scope::resolved`].
    pub fn resolved<T: Clone + 'static>(&self, value: T) -> Future<T, E> {
        self.root().resolved(value)
    }

    /// See [`Scope::rejected`].
    pub fn rejected<T: Clone + 'static>(&self, error: E) -> Future<T, E> {
        self.root().rejected(error)
    }

    /// See [`Scope::all`].
    pub fn all<T, I>(&self, futures: I) -> Future<Vec<T>, E>
    where
        T: Clone + 'static,
        I: IntoIterator<Item = Future<T, E>>,
    {
        self.root().all(futures)
    }

    /// See [`Scope::race`].
    pub fn race<T, I>(&self, futures: I) -> Future<T, E>
    where
        T: Clone + 'static,
        I: IntoIterator<Item = Future<T, E>>,
    {
        self.root().race(futures)
    }

    /// Number of nodes currently held in the arena.
    ///
    /// A tree is released as a whole once its root commits, so this drops
    /// back to zero when every root has committed.
    pub fn live_nodes(&self) -> usize {
        self.shared.tree.borrow().live_nodes()
    }

    /// Returns `true` while the walk is parked.
    pub fn is_idle(&self) -> bool {
        self.shared.tree.borrow().is_idle()
    }

    /// Current state of a node, or `None` once it has been reclaimed.
    pub fn state(&self, id: NodeId) -> Option<State> {
        self.shared.tree.borrow().state(id)
    }

    /// Name of a live node.
    pub fn name(&self, id: NodeId) -> Option<Rc<str>> {
        self.shared.tree.borrow().name(id)
    }

    /// Live children of a node, in creation (and execution) order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.shared.tree.borrow().children(id)
    }
}

impl<E: Clone + 'static> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for Scheduler<E> {
    /// Returns another handle to the same scheduler.
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;

    type Log = Rc<RefCell<Vec<String>>>;

    fn record(log: &Log, entry: impl Into<String>) {
        log.borrow_mut().push(entry.into());
    }

    #[test]
    fn nested_children_begin_in_creation_order() {
        let scheduler = Scheduler::<&str>::new();
        let log = Log::default();

        let inner = log.clone();
        let parent = scheduler.schedule("parent", move |cx, done| {
            for name in ["a", "b", "c"] {
                let log = inner.clone();
                cx.schedule(name, move |_, done| {
                    record(&log, name);
                    done.resolve(());
                    Ok(())
                });
            }
            done.resolve(());
            Ok(())
        });

        assert_eq!(*log.borrow(), ["a", "b", "c"]);
        assert_eq!(parent.peek(), Some(Ok(())));
        assert_eq!(scheduler.live_nodes(), 0);
        assert!(scheduler.is_idle());
    }

    #[test]
    fn parent_commits_after_children() {
        let scheduler = Scheduler::<&str>::new();
        let log = Log::default();

        let outer = log.clone();
        let parent = scheduler.schedule("parent", move |cx, done| {
            let inner = outer.clone();
            cx.schedule("child", move |_, done| {
                done.resolve(());
                Ok(())
            })
            .on_settle(move |_| record(&inner, "child committed"));

            done.resolve(());
            Ok(())
        });

        let observed = log.clone();
        parent.on_settle(move |_| record(&observed, "parent committed"));

        assert_eq!(*log.borrow(), ["child committed", "parent committed"]);
    }

    #[test]
    fn suspended_node_resumes_on_late_settlement() {
        let scheduler = Scheduler::<&str>::new();
        let pending = Rc::new(RefCell::new(None));

        let slot = pending.clone();
        let waiting = scheduler.schedule("waiting", move |_, done| {
            *slot.borrow_mut() = Some(done);
            Ok(())
        });

        assert_eq!(waiting.peek(), None);
        assert_eq!(scheduler.live_nodes(), 1);

        let done = pending.borrow_mut().take();
        if let Some(done) = done {
            done.resolve(5);
            done.resolve(6);
        }

        assert_eq!(waiting.peek(), Some(Ok(5)));
        assert_eq!(scheduler.live_nodes(), 0);
    }

    #[test]
    fn body_error_rejects_node() {
        let scheduler = Scheduler::<&str>::new();
        let failing = scheduler.schedule::<(), _>("failing", |_, _| Err("err"));

        assert_eq!(failing.peek(), Some(Err("err")));
    }

    #[test]
    fn dropped_scheduler_yields_cancelled_futures() {
        let scheduler = Scheduler::<&str>::new();
        let root = scheduler.root();
        drop(scheduler);

        let orphan = root.resolved(1);
        assert!(orphan.is_cancelled());
    }
}

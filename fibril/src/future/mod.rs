//! Composable handles over a node's eventual settlement.
//!
//! A [`Future`] never mutates its antecedent. Every derived future
//! ([`map`](Future::map), [`chain`](Future::chain), [`ap`](Future::ap)) is a
//! new node in the task tree whose body waits on the antecedent's channel, so
//! derived work is ordered, cancelled and reclaimed like any other node.
//!
//! [`Scope::all`] and [`Scope::race`] are the exception: like
//! [`Future::zip`], they combine channels directly and create no node.

pub(crate) mod channel;
mod combinators;

use crate::runtime::context::Scope;
use channel::Channel;

use std::fmt;
use std::rc::Rc;

/// A handle over the outcome of one task node.
///
/// The outcome is either a value `T` or a rejection `E`. Cloning a future
/// clones the handle, not the work: every clone observes the same node.
///
/// A future created through a [`Scope`] remembers it; derived futures attach
/// their node in that same scope.
///
/// # Examples
///
/// ```rust
/// use fibril::Scheduler;
///
/// let scheduler = Scheduler::<String>::new();
///
/// let greeting = scheduler
///     .resolved("world")
///     .map(|who| format!("hello, {who}"));
///
/// assert_eq!(greeting.peek(), Some(Ok("hello, world".to_string())));
/// ```
pub struct Future<T, E> {
    name: Rc<str>,
    channel: Channel<T, E>,
    scope: Scope<E>,
}

impl<T, E> Clone for Future<T, E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            channel: self.channel.clone(),
            scope: self.scope.clone(),
        }
    }
}

impl<T, E> fmt::Debug for Future<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.channel.is_cancelled() {
            "cancelled"
        } else if self.channel.is_pending() {
            "pending"
        } else {
            "settled"
        };

        f.debug_struct("Future")
            .field("name", &self.name)
            .field("state", &state)
            .finish()
    }
}

impl<T, E> Future<T, E> {
    pub(crate) fn new(name: Rc<str>, channel: Channel<T, E>, scope: Scope<E>) -> Self {
        Self {
            name,
            channel,
            scope,
        }
    }

    /// Name of the node behind this future.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The scope this future was created in.
    pub fn scope(&self) -> &Scope<E> {
        &self.scope
    }

    /// Returns `true` if the node was skipped by a rejection cascade, or
    /// if a future this one waits on was.
    ///
    /// A cancelled future never settles. Nodes derived from it commit as
    /// cancelled too, so their tree is reclaimed like any other.
    pub fn is_cancelled(&self) -> bool {
        self.channel.is_cancelled()
    }

    pub(crate) fn on_cancel<F>(&self, hook: F)
    where
        F: FnOnce() + 'static,
    {
        self.channel.on_cancel(hook);
    }
}

impl<T, E> Future<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    /// The outcome, once settled.
    pub fn peek(&self) -> Option<Result<T, E>> {
        self.channel.peek()
    }

    pub fn is_settled(&self) -> bool {
        !self.channel.is_pending() && !self.channel.is_cancelled()
    }

    /// Calls `listener` with the outcome once the future settles.
    ///
    /// Runs immediately if it already has. A listener only observes: it is
    /// not a node, so nothing it schedules is ordered after this future. Use
    /// [`map`](Self::map) or [`chain`](Self::chain) for that.
    pub fn on_settle<F>(&self, listener: F)
    where
        F: FnOnce(Result<T, E>) + 'static,
    {
        self.channel.subscribe(listener);
    }

    /// Transforms the resolved value with `f`.
    ///
    /// The new node waits for this future. A rejection is forwarded
    /// unchanged and `f` never runs.
    pub fn map<R, F>(&self, f: F) -> Future<R, E>
    where
        R: Clone + 'static,
        F: FnOnce(T) -> R + 'static,
    {
        let antecedent = self.channel.clone();

        self.scope
            .schedule(&format!("{}.map", self.name), move |_, done| {
                let cancelled = done.clone();
                antecedent.on_cancel(move || cancelled.abandon());

                antecedent.subscribe(move |outcome| done.settle(outcome.map(f)));
                Ok(())
            })
    }

    /// Continues with the future returned by `f`.
    ///
    /// `f` receives the chain node's own scope, so the futures it creates
    /// are children of the chain node: the chain only commits after them,
    /// and their rejection becomes the chain's rejection.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fibril::Scheduler;
    ///
    /// let scheduler = Scheduler::<&str>::new();
    ///
    /// let doubled = scheduler
    ///     .resolved(21)
    ///     .chain(|cx, n| cx.resolved(n * 2));
    ///
    /// assert_eq!(doubled.peek(), Some(Ok(42)));
    /// ```
    pub fn chain<R, F>(&self, f: F) -> Future<R, E>
    where
        R: Clone + 'static,
        F: FnOnce(&Scope<E>, T) -> Future<R, E> + 'static,
    {
        let antecedent = self.channel.clone();

        self.scope
            .schedule(&format!("{}.chain", self.name), move |cx, done| {
                let cx = cx.clone();

                let cancelled = done.clone();
                antecedent.on_cancel(move || cancelled.abandon());

                antecedent.subscribe(move |outcome| match outcome {
                    Ok(value) => {
                        let inner = f(&cx, value);

                        let cancelled = done.clone();
                        inner.on_cancel(move || cancelled.abandon());
                        inner.on_settle(move |outcome| done.settle(outcome));
                    }
                    Err(error) => done.reject(error),
                });

                Ok(())
            })
    }

    /// Pairs this future with `other`.
    ///
    /// Resolves once both resolve and rejects with the first rejection.
    /// Cancelled if either side is cancelled first. No node is created.
    pub fn zip<U>(&self, other: &Future<U, E>) -> Future<(T, U), E>
    where
        U: Clone + 'static,
    {
        let channel = combinators::join(&self.channel, &other.channel);
        let name: Rc<str> = Rc::from(format!("{}&{}", self.name, other.name));

        Future::new(name, channel, self.scope.clone())
    }

    /// Channel-level map used by the `all!` and `race!` macros.
    #[doc(hidden)]
    pub fn __project<R, F>(&self, f: F) -> Future<R, E>
    where
        R: Clone + 'static,
        F: FnOnce(T) -> R + 'static,
    {
        let channel = Channel::new();
        let out = channel.clone();

        self.channel.subscribe(move |outcome| {
            out.settle(outcome.map(f));
        });

        let out = channel.clone();
        self.channel.on_cancel(move || {
            out.cancel();
        });

        Future::new(self.name.clone(), channel, self.scope.clone())
    }
}

impl<F, E> Future<F, E>
where
    F: Clone + 'static,
    E: Clone + 'static,
{
    /// Applies the function this future resolves to onto `value`.
    ///
    /// The new node waits for both sides. It rejects as soon as either side
    /// rejects, without waiting for the other.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fibril::Scheduler;
    ///
    /// let scheduler = Scheduler::<&str>::new();
    ///
    /// let add_one = scheduler.resolved(|n: i32| n + 1);
    /// let result = add_one.ap(&scheduler.resolved(41));
    ///
    /// assert_eq!(result.peek(), Some(Ok(42)));
    /// ```
    pub fn ap<A, R>(&self, value: &Future<A, E>) -> Future<R, E>
    where
        A: Clone + 'static,
        R: Clone + 'static,
        F: FnOnce(A) -> R,
    {
        let both = combinators::join(&self.channel, &value.channel);

        self.scope
            .schedule(&format!("{}.ap", self.name), move |_, done| {
                let cancelled = done.clone();
                both.on_cancel(move || cancelled.abandon());

                both.subscribe(move |outcome| done.settle(outcome.map(|(f, a)| f(a))));
                Ok(())
            })
    }
}

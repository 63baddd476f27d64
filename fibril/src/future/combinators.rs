use super::Future;
use super::channel::Channel;
use crate::runtime::context::Scope;

use std::cell::{Cell, RefCell};
use std::mem;
use std::rc::Rc;

/// Resolves with both values, or rejects with the first rejection.
///
/// A side that gets cancelled before that cancels the join.
pub(super) fn join<A, B, E>(left: &Channel<A, E>, right: &Channel<B, E>) -> Channel<(A, B), E>
where
    A: Clone + 'static,
    B: Clone + 'static,
    E: Clone + 'static,
{
    let out = Channel::new();
    let values: Rc<RefCell<(Option<A>, Option<B>)>> = Rc::new(RefCell::new((None, None)));

    let (sink, slot) = (out.clone(), values.clone());
    left.subscribe(move |outcome| match outcome {
        Ok(value) => {
            slot.borrow_mut().0 = Some(value);
            complete_join(&sink, &slot);
        }
        Err(error) => {
            sink.reject(error);
        }
    });

    let (sink, slot) = (out.clone(), values);
    right.subscribe(move |outcome| match outcome {
        Ok(value) => {
            slot.borrow_mut().1 = Some(value);
            complete_join(&sink, &slot);
        }
        Err(error) => {
            sink.reject(error);
        }
    });

    let sink = out.clone();
    left.on_cancel(move || {
        sink.cancel();
    });

    let sink = out.clone();
    right.on_cancel(move || {
        sink.cancel();
    });

    out
}

fn complete_join<A, B, E>(out: &Channel<(A, B), E>, values: &RefCell<(Option<A>, Option<B>)>)
where
    A: Clone,
    B: Clone,
    E: Clone,
{
    let pair = {
        let mut values = values.borrow_mut();

        if values.0.is_none() || values.1.is_none() {
            return;
        }

        values.0.take().zip(values.1.take())
    };

    if let Some(pair) = pair {
        out.resolve(pair);
    }
}

impl<E: Clone + 'static> Scope<E> {
    /// Resolves with every member's value, in member order.
    ///
    /// Rejects with the first rejection observed, without waiting for the
    /// other members, and is cancelled if a member is cancelled first. An
    /// empty list resolves with an empty `Vec`. No node is created for the
    /// combination.
    ///
    /// Members scheduled in the same frame are siblings: when one of them
    /// rejects, the members queued behind it are skipped by the cascade and
    /// never begin. Members living in other trees keep running.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fibril::Scheduler;
    ///
    /// let scheduler = Scheduler::<&str>::new();
    /// let cx = scheduler.root();
    ///
    /// let sum = cx
    ///     .all([cx.resolved(1), cx.resolved(2), cx.resolved(3)])
    ///     .map(|values| values.iter().sum::<i32>());
    ///
    /// assert_eq!(sum.peek(), Some(Ok(6)));
    /// ```
    pub fn all<T, I>(&self, futures: I) -> Future<Vec<T>, E>
    where
        T: Clone + 'static,
        I: IntoIterator<Item = Future<T, E>>,
    {
        let members: Vec<Future<T, E>> = futures.into_iter().collect();
        let out = Channel::new();

        if members.is_empty() {
            out.resolve(Vec::new());
        }

        let values: Rc<RefCell<Vec<Option<T>>>> =
            Rc::new(RefCell::new(vec![None; members.len()]));
        let remaining = Rc::new(Cell::new(members.len()));

        for (index, member) in members.iter().enumerate() {
            let (out, values, remaining) = (out.clone(), values.clone(), remaining.clone());
            let cancel_out = out.clone();

            member.channel.subscribe(move |outcome| match outcome {
                Ok(value) => {
                    values.borrow_mut()[index] = Some(value);
                    remaining.set(remaining.get() - 1);

                    if remaining.get() == 0 {
                        let collected = mem::take(&mut *values.borrow_mut());
                        out.resolve(collected.into_iter().flatten().collect());
                    }
                }
                Err(error) => {
                    out.reject(error);
                }
            });

            member.on_cancel(move || {
                cancel_out.cancel();
            });
        }

        Future::new(Rc::from("all"), out, self.clone())
    }

    /// Settles like whichever member settles first, resolved or rejected.
    ///
    /// The other members run to completion; their outcome is discarded. A
    /// cancelled member is ignored. An empty list never settles.
    pub fn race<T, I>(&self, futures: I) -> Future<T, E>
    where
        T: Clone + 'static,
        I: IntoIterator<Item = Future<T, E>>,
    {
        let out = Channel::new();

        for member in futures {
            let out = out.clone();

            member.channel.subscribe(move |outcome| {
                out.settle(outcome);
            });
        }

        Future::new(Rc::from("race"), out, self.clone())
    }
}

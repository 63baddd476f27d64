use crate::future::Future;
use crate::runtime::context::Scope;

use std::fmt;
use std::rc::Rc;

type Handler<A, T, E> = Rc<dyn Fn(&Scope<E>, A) -> Future<T, E>>;

/// A named operation whose every call forks a node.
///
/// Created by [`Scope::action`]. Calls attach in the scope the action was
/// created in, whatever scope the caller is running in, and never hold up
/// later siblings.
pub struct Action<A, T, E> {
    name: Rc<str>,
    scope: Scope<E>,
    handler: Handler<A, T, E>,
}

impl<A, T, E> Clone for Action<A, T, E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            scope: self.scope.clone(),
            handler: self.handler.clone(),
        }
    }
}

impl<A, T, E> fmt::Debug for Action<A, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action").field("name", &self.name).finish()
    }
}

impl<A, T, E> Action<A, T, E>
where
    A: 'static,
    T: Clone + 'static,
    E: Clone + 'static,
{
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Forks a node running the action with `arg`.
    ///
    /// The returned future settles with the future the handler returned.
    pub fn call(&self, arg: A) -> Future<T, E> {
        let handler = self.handler.clone();

        self.scope.fork(&self.name, move |cx, done| {
            let handled = handler(cx, arg);

            let cancelled = done.clone();
            handled.on_cancel(move || cancelled.abandon());
            handled.on_settle(move |outcome| done.settle(outcome));
            Ok(())
        })
    }
}

impl<E: Clone + 'static> Scope<E> {
    /// Wraps `handler` into an [`Action`] bound to this scope.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fibril::Scheduler;
    ///
    /// let scheduler = Scheduler::<&str>::new();
    /// let double = scheduler.root().action("double", |cx, n: i32| cx.resolved(n * 2));
    ///
    /// assert_eq!(double.call(21).peek(), Some(Ok(42)));
    /// ```
    pub fn action<A, T, F>(&self, name: &str, handler: F) -> Action<A, T, E>
    where
        A: 'static,
        T: Clone + 'static,
        F: Fn(&Scope<E>, A) -> Future<T, E> + 'static,
    {
        Action {
            name: Rc::from(name),
            scope: self.clone(),
            handler: Rc::new(handler),
        }
    }
}

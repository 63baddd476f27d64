use super::Timers;
use crate::future::Future;
use crate::runtime::context::Scope;

use std::time::Duration;

/// Creates a node that resolves once `duration` has elapsed on `timers`.
///
/// The node suspends until the timer fires. Its later siblings wait for it,
/// like they would for any other node; use [`Scope::fork`] around a delay to
/// let them proceed.
///
/// # Examples
///
/// ```rust
/// use fibril::Scheduler;
/// use fibril::time::{Timers, delay};
/// use std::time::Duration;
///
/// let scheduler = Scheduler::<&str>::new();
/// let timers = Timers::default();
///
/// let later = delay(&scheduler.root(), &timers, Duration::from_millis(10)).map(|()| "later");
/// assert_eq!(later.peek(), None);
///
/// timers.run();
/// assert_eq!(later.peek(), Some(Ok("later")));
/// ```
pub fn delay<E>(scope: &Scope<E>, timers: &Timers, duration: Duration) -> Future<(), E>
where
    E: Clone + 'static,
{
    let timers = timers.clone();

    scope.schedule("delay", move |_, done| {
        timers.set_timeout(duration, move || done.resolve(()));
        Ok(())
    })
}

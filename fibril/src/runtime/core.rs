use super::context::Scope;
use super::scheduler::Scheduler;
use crate::error::BlockOnError;
use crate::future::Future;
use crate::time::Timers;

/// A scheduler bundled with the timer queue that drives it.
///
/// `Runtime` is the synchronous entry point: [`block_on`](Self::block_on)
/// creates a root future and keeps firing timers until it settles.
///
/// # Examples
///
/// ```rust
/// use fibril::RuntimeBuilder;
/// use fibril::time::delay;
/// use std::time::Duration;
///
/// let runtime = RuntimeBuilder::new().build::<&str>();
/// let timers = runtime.timers().clone();
///
/// let value = runtime.block_on(move |scope| {
///     delay(scope, &timers, Duration::from_secs(1)).map(|()| "done")
/// });
///
/// assert_eq!(value, Ok("done"));
/// ```
pub struct Runtime<E> {
    scheduler: Scheduler<E>,
    timers: Timers,
}

impl<E: Clone + 'static> Runtime<E> {
    pub(crate) fn from_parts(scheduler: Scheduler<E>, timers: Timers) -> Self {
        Self { scheduler, timers }
    }

    pub fn scheduler(&self) -> &Scheduler<E> {
        &self.scheduler
    }

    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    /// Builds a root future with `f` and drives it to settlement.
    ///
    /// Timers are fired one at a time until the future settles. If the timer
    /// queue runs dry first, the future can never settle and
    /// [`BlockOnError::Stalled`] is returned.
    pub fn block_on<T, F>(&self, f: F) -> Result<T, BlockOnError<E>>
    where
        T: Clone + 'static,
        F: FnOnce(&Scope<E>) -> Future<T, E>,
    {
        let future = f(&self.scheduler.root());
        self.wait(&future)
    }

    /// Fires timers until `future` settles.
    pub fn wait<T>(&self, future: &Future<T, E>) -> Result<T, BlockOnError<E>>
    where
        T: Clone + 'static,
    {
        loop {
            if let Some(outcome) = future.peek() {
                return outcome.map_err(|error| BlockOnError::Rejected {
                    name: future.name().to_string(),
                    error,
                });
            }

            if future.is_cancelled() {
                return Err(BlockOnError::Cancelled {
                    name: future.name().to_string(),
                });
            }

            if !self.timers.turn() {
                return Err(BlockOnError::Stalled {
                    name: future.name().to_string(),
                });
            }
        }
    }

    /// Fires every pending timer, including the ones scheduled meanwhile.
    ///
    /// Returns how many timers fired.
    pub fn run(&self) -> usize {
        self.timers.run()
    }
}

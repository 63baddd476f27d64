use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::trace;

/// Time source of a [`Timers`] queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Clock {
    /// Time only moves when a timer fires or [`Timers::advance`] is called.
    /// Firing jumps straight to the deadline, so programs run instantly and
    /// deterministically.
    #[default]
    Virtual,

    /// Wall-clock time. Firing a timer sleeps the thread until its deadline.
    System,
}

/// An entry in the timer queue.
///
/// Entries are ordered by deadline, then by registration order, so timers
/// sharing a deadline fire first-in first-out.
struct TimerEntry {
    /// Offset from the queue's epoch at which the timer fires.
    deadline: Duration,

    /// Registration sequence number.
    seq: u64,

    callback: Box<dyn FnOnce()>,

    /// Set once the timer fired or was cancelled.
    done: Rc<Cell<bool>>,
}

impl Eq for TimerEntry {}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Ord for TimerEntry {
    /// Reversed, so that a `BinaryHeap<TimerEntry>` pops the earliest
    /// deadline first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct TimerQueue {
    clock: Clock,

    /// Origin of the system clock.
    epoch: Instant,

    /// Current time of the virtual clock.
    elapsed: Duration,

    heap: BinaryHeap<TimerEntry>,
    next_seq: u64,
}

impl TimerQueue {
    fn now(&self) -> Duration {
        match self.clock {
            Clock::Virtual => self.elapsed,
            Clock::System => self.epoch.elapsed(),
        }
    }

    /// Drops cancelled entries sitting at the top of the heap.
    fn prune(&mut self) {
        while self.heap.peek().is_some_and(|entry| entry.done.get()) {
            self.heap.pop();
        }
    }

    fn next_deadline(&mut self) -> Option<Duration> {
        self.prune();
        self.heap.peek().map(|entry| entry.deadline)
    }

    /// Moves the clock up to `deadline`.
    fn reach(&mut self, deadline: Duration) {
        match self.clock {
            Clock::Virtual => self.elapsed = self.elapsed.max(deadline),
            Clock::System => {
                let now = self.epoch.elapsed();

                if deadline > now {
                    thread::sleep(deadline - now);
                }
            }
        }
    }
}

/// A single-threaded timer queue.
///
/// `Timers` is the native asynchronous primitive shipped with the crate: a
/// source of single-shot callbacks fired in deadline order. Callbacks run
/// from [`turn`](Self::turn), outside of any scheduler walk, which is exactly
/// the situation a task body suspended on a timer expects to be resumed in.
///
/// Cloning returns another handle to the same queue.
///
/// # Examples
///
/// ```rust
/// use fibril::time::Timers;
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use std::time::Duration;
///
/// let timers = Timers::default();
/// let fired = Rc::new(Cell::new(false));
///
/// let flag = fired.clone();
/// timers.set_timeout(Duration::from_secs(5), move || flag.set(true));
///
/// assert!(timers.turn());
/// assert!(fired.get());
/// assert_eq!(timers.now(), Duration::from_secs(5));
/// ```
#[derive(Clone)]
pub struct Timers {
    queue: Rc<RefCell<TimerQueue>>,
}

impl Timers {
    pub fn new(clock: Clock) -> Self {
        let queue = TimerQueue {
            clock,
            epoch: Instant::now(),
            elapsed: Duration::ZERO,
            heap: BinaryHeap::new(),
            next_seq: 0,
        };

        Self {
            queue: Rc::new(RefCell::new(queue)),
        }
    }

    pub fn clock(&self) -> Clock {
        self.queue.borrow().clock
    }

    /// Time elapsed since the queue was created.
    pub fn now(&self) -> Duration {
        self.queue.borrow().now()
    }

    /// Registers `callback` to fire once `after` has elapsed.
    pub fn set_timeout<F>(&self, after: Duration, callback: F) -> TimerHandle
    where
        F: FnOnce() + 'static,
    {
        let mut queue = self.queue.borrow_mut();

        let done = Rc::new(Cell::new(false));
        let deadline = queue.now() + after;
        let seq = queue.next_seq;
        queue.next_seq += 1;

        queue.heap.push(TimerEntry {
            deadline,
            seq,
            callback: Box::new(callback),
            done: done.clone(),
        });

        trace!(?deadline, seq, "timer set");
        TimerHandle { done }
    }

    /// Number of timers that have neither fired nor been cancelled.
    pub fn pending(&self) -> usize {
        self.queue
            .borrow()
            .heap
            .iter()
            .filter(|entry| !entry.done.get())
            .count()
    }

    /// Fires the next timer, moving the clock to its deadline first.
    ///
    /// Returns `false` if no timer is pending.
    pub fn turn(&self) -> bool {
        let entry = {
            let mut queue = self.queue.borrow_mut();
            queue.prune();

            let Some(entry) = queue.heap.pop() else {
                return false;
            };

            queue.reach(entry.deadline);
            entry
        };

        entry.done.set(true);
        trace!(deadline = ?entry.deadline, seq = entry.seq, "timer fired");

        (entry.callback)();
        true
    }

    /// Moves the clock forward by `by`, firing every timer due meanwhile.
    ///
    /// Timers registered by the fired callbacks are fired too if they fall
    /// within the window. Returns how many timers fired.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now() + by;
        let mut fired = 0;

        loop {
            let due = self
                .queue
                .borrow_mut()
                .next_deadline()
                .is_some_and(|deadline| deadline <= target);

            if !due || !self.turn() {
                break;
            }

            fired += 1;
        }

        self.queue.borrow_mut().reach(target);
        fired
    }

    /// Fires timers until none is pending. Returns how many fired.
    pub fn run(&self) -> usize {
        let mut fired = 0;

        while self.turn() {
            fired += 1;
        }

        fired
    }
}

impl Default for Timers {
    fn default() -> Self {
        Self::new(Clock::default())
    }
}

impl fmt::Debug for Timers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timers")
            .field("clock", &self.clock())
            .field("now", &self.now())
            .field("pending", &self.pending())
            .finish()
    }
}

/// Handle to a registered timer.
///
/// Dropping the handle does not cancel the timer.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    done: Rc<Cell<bool>>,
}

impl TimerHandle {
    /// Prevents the timer from firing.
    ///
    /// Returns `false` if it already fired or was cancelled.
    pub fn cancel(&self) -> bool {
        !self.done.replace(true)
    }

    /// Returns `true` once the timer fired or was cancelled.
    pub fn is_done(&self) -> bool {
        self.done.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<&'static str>>>, impl Fn(&'static str) -> Box<dyn FnOnce()>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();

        let make = move |tag: &'static str| -> Box<dyn FnOnce()> {
            let sink = sink.clone();
            Box::new(move || sink.borrow_mut().push(tag))
        };

        (log, make)
    }

    #[test]
    fn fires_in_deadline_order_fifo_on_ties() {
        let timers = Timers::default();
        let (log, make) = recorder();

        timers.set_timeout(Duration::from_millis(30), make("c"));
        timers.set_timeout(Duration::from_millis(10), make("a"));
        timers.set_timeout(Duration::from_millis(30), make("d"));
        timers.set_timeout(Duration::from_millis(10), make("b"));

        assert_eq!(timers.run(), 4);
        assert_eq!(*log.borrow(), ["a", "b", "c", "d"]);
        assert_eq!(timers.now(), Duration::from_millis(30));
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let timers = Timers::default();
        let (log, make) = recorder();

        let handle = timers.set_timeout(Duration::from_millis(5), make("cancelled"));
        timers.set_timeout(Duration::from_millis(10), make("kept"));

        assert!(handle.cancel());
        assert!(!handle.cancel());
        assert_eq!(timers.pending(), 1);

        timers.run();
        assert_eq!(*log.borrow(), ["kept"]);
    }

    #[test]
    fn advance_fires_only_due_timers() {
        let timers = Timers::default();
        let (log, make) = recorder();

        timers.set_timeout(Duration::from_millis(10), make("early"));
        timers.set_timeout(Duration::from_millis(50), make("late"));

        assert_eq!(timers.advance(Duration::from_millis(20)), 1);
        assert_eq!(timers.now(), Duration::from_millis(20));
        assert_eq!(*log.borrow(), ["early"]);
        assert_eq!(timers.pending(), 1);
    }

    #[test]
    fn callbacks_can_schedule_more_timers() {
        let timers = Timers::default();
        let (log, make) = recorder();

        let inner = timers.clone();
        let late = make("second");
        timers.set_timeout(Duration::from_millis(10), move || {
            inner.set_timeout(Duration::from_millis(10), late);
        });

        assert_eq!(timers.run(), 2);
        assert_eq!(*log.borrow(), ["second"]);
        assert_eq!(timers.now(), Duration::from_millis(20));
    }

    #[test]
    fn empty_queue_does_not_turn() {
        let timers = Timers::default();

        assert!(!timers.turn());
        assert_eq!(timers.now(), Duration::ZERO);
    }
}

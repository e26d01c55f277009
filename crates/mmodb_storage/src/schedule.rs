//! Periodic task scheduling collaborator.
//!
//! Backends never own a thread. They register a task with whatever
//! [`Scheduler`] the host supplies and the host decides when it runs.

use parking_lot::Mutex;
use std::fmt;
use std::time::Duration;

/// A periodic task. Runs on whichever thread drives the scheduler.
pub type Task = Box<dyn FnMut() + Send>;

/// Handle for a registered periodic task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    /// Returns the raw handle value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// Registers tasks to run at a fixed interval.
///
/// Implementations may skip or delay an invocation under load; a task must
/// tolerate running late.
pub trait Scheduler: Send + Sync {
    /// Registers `task` to run roughly every `interval`.
    fn schedule_interval(&self, interval: Duration, task: Task) -> TimerId;

    /// Unregisters a task. Returns `false` if the handle was unknown.
    fn cancel(&self, id: TimerId) -> bool;
}

struct Timer {
    id: TimerId,
    interval: Duration,
    remaining: Duration,
    task: Task,
}

#[derive(Default)]
struct TimerTable {
    timers: Vec<Timer>,
    next_id: u64,
}

/// Cooperative scheduler driven by the host's event loop.
///
/// Nothing runs until the host calls [`advance`](Self::advance) or
/// [`fire_all`](Self::fire_all). Tasks run on the calling thread while the
/// timer table is locked, so a task must not register or cancel timers.
///
/// # Example
///
/// ```rust
/// use mmodb_storage::{ManualScheduler, Scheduler};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let scheduler = ManualScheduler::new();
/// let ticks = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&ticks);
/// scheduler.schedule_interval(
///     Duration::from_secs(60),
///     Box::new(move || {
///         counter.fetch_add(1, Ordering::SeqCst);
///     }),
/// );
///
/// scheduler.advance(Duration::from_secs(30));
/// assert_eq!(ticks.load(Ordering::SeqCst), 0);
/// scheduler.advance(Duration::from_secs(30));
/// assert_eq!(ticks.load(Ordering::SeqCst), 1);
/// ```
#[derive(Default)]
pub struct ManualScheduler {
    table: Mutex<TimerTable>,
}

impl ManualScheduler {
    /// Creates a scheduler with no timers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the clock forward by `elapsed` and runs every due task once.
    ///
    /// A task that is overdue by several intervals still runs only once;
    /// its countdown restarts from the full interval. Returns the number of
    /// tasks that ran.
    pub fn advance(&self, elapsed: Duration) -> usize {
        let mut table = self.table.lock();
        let mut fired = 0;
        for timer in &mut table.timers {
            if elapsed >= timer.remaining {
                (timer.task)();
                timer.remaining = timer.interval;
                fired += 1;
            } else {
                timer.remaining -= elapsed;
            }
        }
        fired
    }

    /// Runs every registered task now and restarts all countdowns.
    pub fn fire_all(&self) -> usize {
        let mut table = self.table.lock();
        for timer in &mut table.timers {
            (timer.task)();
            timer.remaining = timer.interval;
        }
        table.timers.len()
    }

    /// Number of registered tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.lock().timers.len()
    }

    /// Whether no task is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_interval(&self, interval: Duration, task: Task) -> TimerId {
        let mut table = self.table.lock();
        table.next_id += 1;
        let id = TimerId(table.next_id);
        table.timers.push(Timer {
            id,
            interval,
            remaining: interval,
            task,
        });
        tracing::debug!(%id, ?interval, "registered periodic task");
        id
    }

    fn cancel(&self, id: TimerId) -> bool {
        let mut table = self.table.lock();
        let before = table.timers.len();
        table.timers.retain(|timer| timer.id != id);
        before != table.timers.len()
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("timers", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_task(counter: &Arc<AtomicUsize>) -> Task {
        let counter = Arc::clone(counter);
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn task_fires_after_interval() {
        let scheduler = ManualScheduler::new();
        let hits = Arc::new(AtomicUsize::new(0));
        scheduler.schedule_interval(Duration::from_millis(100), counting_task(&hits));

        assert_eq!(scheduler.advance(Duration::from_millis(99)), 0);
        assert_eq!(scheduler.advance(Duration::from_millis(1)), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn overdue_task_runs_once() {
        let scheduler = ManualScheduler::new();
        let hits = Arc::new(AtomicUsize::new(0));
        scheduler.schedule_interval(Duration::from_millis(10), counting_task(&hits));

        scheduler.advance(Duration::from_secs(5));
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        scheduler.advance(Duration::from_millis(9));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cancelled_task_never_runs() {
        let scheduler = ManualScheduler::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let id = scheduler.schedule_interval(Duration::from_millis(10), counting_task(&hits));

        assert!(scheduler.cancel(id));
        assert!(!scheduler.cancel(id));
        assert!(scheduler.is_empty());

        scheduler.fire_all();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn fire_all_runs_every_task() {
        let scheduler = ManualScheduler::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let a = scheduler.schedule_interval(Duration::from_secs(1), counting_task(&hits));
        let b = scheduler.schedule_interval(Duration::from_secs(2), counting_task(&hits));

        assert_ne!(a, b);
        assert_eq!(scheduler.len(), 2);
        assert_eq!(scheduler.fire_all(), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}

#![forbid(unsafe_code)]

//! Single-threaded queue of delayed tasks.
//!
//! A [`DeferredQueue`] is a shared handle (clones refer to the same queue).
//! Tasks are scheduled with a delay relative to the queue's [`Clock`] and run
//! when the host calls [`DeferredQueue::run_due`], typically once per event
//! loop iteration.
//!
//! # Invariants
//!
//! 1. A task runs at most once, and never before its deadline.
//! 2. Due tasks run in deadline order; ties run in schedule order.
//! 3. A cancelled task never runs.
//! 4. No internal borrow is held while a task runs, so tasks may schedule
//!    or cancel other tasks. Tasks scheduled during `run_due` wait for the
//!    next call even if already due.
//!
//! # Failure Modes
//!
//! - Task panic: propagates to the caller of `run_due()`. Tasks that were
//!   due in the same batch but had not run yet are dropped.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use web_time::{Duration, Instant};

use crate::clock::{Clock, SystemClock};

/// Identifier for a scheduled task, unique within its queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    /// Get the raw ID value.
    #[inline]
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }
}

struct PendingTask {
    id: TaskId,
    deadline: Instant,
    task: Box<dyn FnOnce()>,
}

struct QueueInner {
    clock: Rc<dyn Clock>,
    next_id: u64,
    tasks: Vec<PendingTask>,
}

/// Shared queue of delayed tasks.
#[derive(Clone)]
pub struct DeferredQueue {
    inner: Rc<RefCell<QueueInner>>,
}

impl DeferredQueue {
    /// Create a queue driven by the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    /// Create a queue driven by `clock`.
    #[must_use]
    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        Self {
            inner: Rc::new(RefCell::new(QueueInner {
                clock: Rc::new(clock),
                next_id: 1,
                tasks: Vec::new(),
            })),
        }
    }

    /// Current time according to the queue's clock.
    #[must_use]
    pub fn now(&self) -> Instant {
        self.inner.borrow().clock.now()
    }

    /// Schedule `task` to run once `delay` has elapsed.
    pub fn schedule(&self, delay: Duration, task: impl FnOnce() + 'static) -> TaskId {
        let mut inner = self.inner.borrow_mut();
        let id = TaskId(inner.next_id);
        inner.next_id += 1;
        let deadline = inner.clock.now() + delay;
        inner.tasks.push(PendingTask {
            id,
            deadline,
            task: Box::new(task),
        });
        tracing::trace!(task_id = id.0, ?delay, "deferred task scheduled");
        id
    }

    /// Cancel a pending task.
    ///
    /// Returns `true` if the task was pending and is now removed.
    pub fn cancel(&self, id: TaskId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let Some(idx) = inner.tasks.iter().position(|t| t.id == id) else {
            return false;
        };
        // Drop the closure outside the borrow: it may own handles to this queue.
        let removed = inner.tasks.remove(idx);
        drop(inner);
        drop(removed);
        true
    }

    /// Run every task whose deadline has passed.
    ///
    /// Returns the number of tasks run.
    pub fn run_due(&self) -> usize {
        let due = {
            let mut inner = self.inner.borrow_mut();
            let now = inner.clock.now();
            let (mut due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut inner.tasks)
                .into_iter()
                .partition(|t| t.deadline <= now);
            inner.tasks = pending;
            due.sort_by_key(|t| (t.deadline, t.id));
            due
        };

        let count = due.len();
        for pending in due {
            tracing::trace!(task_id = pending.id.0, "deferred task running");
            (pending.task)();
        }
        count
    }

    /// Number of tasks waiting to run.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.borrow().tasks.len()
    }

    /// Whether `id` is still waiting to run.
    #[must_use]
    pub fn is_pending(&self, id: TaskId) -> bool {
        self.inner.borrow().tasks.iter().any(|t| t.id == id)
    }

    /// Earliest deadline among pending tasks.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.inner.borrow().tasks.iter().map(|t| t.deadline).min()
    }

    /// Drop every pending task without running it.
    pub fn clear(&self) {
        let tasks = std::mem::take(&mut self.inner.borrow_mut().tasks);
        drop(tasks);
    }
}

impl Default for DeferredQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DeferredQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredQueue")
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::cell::Cell;
    use tracing_test::traced_test;

    fn queue() -> (DeferredQueue, ManualClock) {
        let clock = ManualClock::new();
        (DeferredQueue::with_clock(clock.clone()), clock)
    }

    #[test]
    fn task_waits_for_deadline() {
        let (queue, clock) = queue();
        let ran = Rc::new(Cell::new(false));
        let r = Rc::clone(&ran);
        queue.schedule(Duration::from_millis(500), move || r.set(true));

        assert_eq!(queue.run_due(), 0);
        clock.advance_ms(499);
        assert_eq!(queue.run_due(), 0);
        assert!(!ran.get());

        clock.advance_ms(1);
        assert_eq!(queue.run_due(), 1);
        assert!(ran.get());
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn task_runs_once() {
        let (queue, clock) = queue();
        let runs = Rc::new(Cell::new(0));
        let r = Rc::clone(&runs);
        queue.schedule(Duration::ZERO, move || r.set(r.get() + 1));

        clock.advance_ms(10);
        queue.run_due();
        queue.run_due();
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn due_tasks_run_in_deadline_then_schedule_order() {
        let (queue, clock) = queue();
        let log = Rc::new(RefCell::new(Vec::new()));

        for (name, delay) in [("late", 30), ("early", 10), ("tie-a", 20), ("tie-b", 20)] {
            let l = Rc::clone(&log);
            queue.schedule(Duration::from_millis(delay), move || l.borrow_mut().push(name));
        }

        clock.advance_ms(100);
        assert_eq!(queue.run_due(), 4);
        assert_eq!(*log.borrow(), vec!["early", "tie-a", "tie-b", "late"]);
    }

    #[test]
    fn cancelled_task_never_runs() {
        let (queue, clock) = queue();
        let ran = Rc::new(Cell::new(false));
        let r = Rc::clone(&ran);
        let id = queue.schedule(Duration::from_millis(5), move || r.set(true));

        assert!(queue.is_pending(id));
        assert!(queue.cancel(id));
        assert!(!queue.cancel(id), "second cancel is a no-op");
        assert!(!queue.is_pending(id));

        clock.advance_ms(10);
        assert_eq!(queue.run_due(), 0);
        assert!(!ran.get());
    }

    #[test]
    fn task_may_schedule_more_work() {
        let (queue, clock) = queue();
        let ran = Rc::new(Cell::new(0));

        let q = queue.clone();
        let r = Rc::clone(&ran);
        queue.schedule(Duration::ZERO, move || {
            r.set(r.get() + 1);
            let r2 = Rc::clone(&r);
            q.schedule(Duration::ZERO, move || r2.set(r2.get() + 1));
        });

        assert_eq!(queue.run_due(), 1);
        assert_eq!(ran.get(), 1);
        assert_eq!(queue.pending(), 1, "nested task waits for the next run");

        clock.advance_ms(1);
        assert_eq!(queue.run_due(), 1);
        assert_eq!(ran.get(), 2);
    }

    #[test]
    fn next_deadline_tracks_earliest() {
        let (queue, _clock) = queue();
        assert!(queue.next_deadline().is_none());

        let start = queue.now();
        queue.schedule(Duration::from_millis(300), || {});
        queue.schedule(Duration::from_millis(100), || {});
        assert_eq!(
            queue.next_deadline(),
            Some(start + Duration::from_millis(100))
        );
    }

    #[test]
    #[traced_test]
    fn far_deadline_logs_full_delay() {
        let (queue, clock) = queue();
        let delay = Duration::from_secs(u64::MAX / 1_000 + 1);
        let id = queue.schedule(delay, || {});

        assert!(logs_contain("delay=18446744073709552s"));
        clock.advance_ms(u64::MAX / 2);
        assert_eq!(queue.run_due(), 0);
        assert!(queue.is_pending(id));
    }

    #[test]
    fn clear_drops_everything() {
        let (queue, clock) = queue();
        let ran = Rc::new(Cell::new(false));
        let r = Rc::clone(&ran);
        queue.schedule(Duration::ZERO, move || r.set(true));

        queue.clear();
        clock.advance_ms(1);
        assert_eq!(queue.run_due(), 0);
        assert!(!ran.get());
    }
}

//! A scheduler that can be stepped and inspected.

use promissory_core::{Job, LocalTask, Scheduler, SchedulerHandle};
use promissory_runtime::{LocalExecutor, RuntimeError};
use std::cell::Cell;
use std::future::Future;
use std::rc::Rc;

#[derive(Default)]
struct Counters {
    deferred: Cell<u64>,
    spawned: Cell<u64>,
}

/// Deterministic scheduler for tests.
///
/// Delegates to a [`LocalExecutor`] and counts how much work was handed to
/// it, so tests can assert that something happened on a later turn rather
/// than inline.
///
/// # Example
///
/// ```
/// use promissory_core::Deferred;
/// use promissory_testing::StepScheduler;
///
/// let scheduler = StepScheduler::new();
/// let value = Deferred::<i32>::new(&scheduler.handle(), |settle| {
///     settle.resolve(1);
///     Ok(())
/// });
///
/// assert!(value.is_pending());
/// assert_eq!(scheduler.deferred_jobs(), 1);
///
/// scheduler.step();
/// assert_eq!(value.outcome(), Some(Ok(1)));
/// ```
#[derive(Clone, Default)]
pub struct StepScheduler {
    executor: LocalExecutor,
    counters: Rc<Counters>,
}

impl StepScheduler {
    /// Create a scheduler with nothing queued.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scheduler handle for creating deferred values.
    #[must_use]
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle::new(self.clone())
    }

    /// Run one turn. Returns `false` when nothing was queued.
    pub fn step(&self) -> bool {
        self.executor.turn()
    }

    /// Run turns until nothing is queued and return how many ran.
    pub fn run_all(&self) -> u64 {
        self.executor.run_until_stalled()
    }

    /// Drive `future` to completion.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Stalled`] if `future` can never complete.
    pub fn block_on<F>(&self, future: F) -> Result<F::Output, RuntimeError>
    where
        F: Future + 'static,
        F::Output: 'static,
    {
        self.executor.block_on(future)
    }

    /// Turns run so far.
    #[must_use]
    pub fn turns(&self) -> u64 {
        self.executor.turns()
    }

    /// Jobs handed to [`Scheduler::defer`] so far.
    #[must_use]
    pub fn deferred_jobs(&self) -> u64 {
        self.counters.deferred.get()
    }

    /// Tasks handed to [`Scheduler::spawn`] so far.
    #[must_use]
    pub fn spawned_tasks(&self) -> u64 {
        self.counters.spawned.get()
    }

    /// Check whether the next [`step`](Self::step) would run something.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        !self.executor.has_ready_work()
    }

    /// The underlying executor.
    #[must_use]
    pub const fn executor(&self) -> &LocalExecutor {
        &self.executor
    }
}

impl Scheduler for StepScheduler {
    fn defer(&self, job: Job) {
        self.counters.deferred.set(self.counters.deferred.get() + 1);
        self.executor.defer(job);
    }

    fn spawn(&self, task: LocalTask) {
        self.counters.spawned.set(self.counters.spawned.get() + 1);
        self.executor.spawn(task);
    }
}

impl std::fmt::Debug for StepScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepScheduler")
            .field("executor", &self.executor)
            .field("deferred_jobs", &self.deferred_jobs())
            .field("spawned_tasks", &self.spawned_tasks())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promissory_core::Deferred;

    #[test]
    fn test_counts_defers_and_spawns() {
        let scheduler = StepScheduler::new();
        let handle = scheduler.handle();

        handle.defer(|| {});
        handle.spawn(async {});

        assert_eq!(scheduler.deferred_jobs(), 1);
        assert_eq!(scheduler.spawned_tasks(), 1);
        assert_eq!(scheduler.run_all(), 2);
        assert!(scheduler.is_idle());
    }

    #[test]
    fn test_executor_runs_on_step_not_inline() {
        let scheduler = StepScheduler::new();
        let value = Deferred::<&'static str>::new(&scheduler.handle(), |settle| {
            settle.resolve("done");
            Ok(())
        });

        assert!(value.is_pending());
        assert!(scheduler.step());
        assert_eq!(value.outcome(), Some(Ok("done")));
        assert!(!scheduler.step());
    }
}

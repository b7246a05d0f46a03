//! Minimal scheduler for the unit tests of this crate.

use crate::scheduler::{Job, LocalTask, Scheduler, SchedulerHandle};
use futures::executor::{LocalPool, LocalSpawner};
use futures::task::LocalSpawnExt;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

/// Deferred jobs go to a FIFO queue; tasks go to a `LocalPool`.
#[derive(Clone)]
pub(crate) struct TestScheduler {
    jobs: Rc<RefCell<VecDeque<Job>>>,
    pool: Rc<RefCell<LocalPool>>,
    spawner: LocalSpawner,
    rejected: Rc<Cell<usize>>,
}

impl TestScheduler {
    pub(crate) fn new() -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Self {
            jobs: Rc::new(RefCell::new(VecDeque::new())),
            pool: Rc::new(RefCell::new(pool)),
            spawner,
            rejected: Rc::new(Cell::new(0)),
        }
    }

    pub(crate) fn handle(&self) -> SchedulerHandle {
        SchedulerHandle::new(self.clone())
    }

    /// Tasks the pool refused to accept.
    pub(crate) fn rejected_tasks(&self) -> usize {
        self.rejected.get()
    }

    /// Run jobs and tasks until neither can make progress.
    pub(crate) fn run(&self) {
        loop {
            let job = self.jobs.borrow_mut().pop_front();
            if let Some(job) = job {
                job();
                continue;
            }
            self.pool.borrow_mut().run_until_stalled();
            if self.jobs.borrow().is_empty() {
                return;
            }
        }
    }
}

impl Scheduler for TestScheduler {
    fn defer(&self, job: Job) {
        self.jobs.borrow_mut().push_back(job);
    }

    fn spawn(&self, task: LocalTask) {
        if let Err(error) = self.spawner.spawn_local(task) {
            self.rejected.set(self.rejected.get() + 1);
            tracing::warn!(%error, "test pool rejected a task");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_runs_on_pool() {
        let scheduler = TestScheduler::new();
        let ran = Rc::new(Cell::new(false));
        let flag = Rc::clone(&ran);

        scheduler.handle().spawn(async move { flag.set(true) });
        scheduler.run();

        assert!(ran.get());
        assert_eq!(scheduler.rejected_tasks(), 0);
    }

    #[test]
    fn test_spawn_after_pool_shutdown_is_counted() {
        let scheduler = TestScheduler::new();
        // Replacing the pool drops the one the spawner feeds.
        *scheduler.pool.borrow_mut() = LocalPool::new();

        scheduler.handle().spawn(async {});

        assert_eq!(scheduler.rejected_tasks(), 1);
    }
}

//! Scheduler backed by a tokio [`LocalSet`].
//!
//! Deferred values are `!Send`, so their jobs and tasks are spawned with
//! [`LocalSet::spawn_local`] and make progress while the local set is driven
//! (`run_until`, `block_on`, or awaiting the set). Tasks can use tokio I/O and
//! timers, which is what the reqwest transport needs.
//!
//! # Example
//!
//! ```ignore
//! use promissory_runtime::TokioScheduler;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let scheduler = TokioScheduler::new();
//!     let client = Client::new(scheduler.handle(), ReqwestTransport::new()?);
//!
//!     let response = scheduler
//!         .run_until(client.get("https://example.com", RequestOptions::default()).wait())
//!         .await?;
//! }
//! ```

use promissory_core::{Job, LocalTask, Scheduler, SchedulerHandle};
use std::fmt;
use std::future::Future;
use std::rc::Rc;
use tokio::runtime::Runtime;
use tokio::task::LocalSet;

/// [`Scheduler`] that spawns onto a shared tokio [`LocalSet`].
#[derive(Clone, Default)]
pub struct TokioScheduler {
    local: Rc<LocalSet>,
}

impl TokioScheduler {
    /// Create a scheduler with a fresh local set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scheduler handle for creating deferred values on this local set.
    #[must_use]
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle::new(self.clone())
    }

    /// The underlying local set.
    #[must_use]
    pub fn local_set(&self) -> &LocalSet {
        &self.local
    }

    /// Drive the local set until `future` completes.
    ///
    /// Must be awaited from within a tokio runtime.
    pub async fn run_until<F: Future>(&self, future: F) -> F::Output {
        self.local.run_until(future).await
    }

    /// Block the current thread on `runtime` until `future` completes,
    /// driving the local set meanwhile.
    pub fn block_on<F: Future>(&self, runtime: &Runtime, future: F) -> F::Output {
        self.local.block_on(runtime, future)
    }
}

impl Scheduler for TokioScheduler {
    fn defer(&self, job: Job) {
        // Detached: completion is observed through the deferred value.
        drop(self.local.spawn_local(async move { job() }));
    }

    fn spawn(&self, task: LocalTask) {
        drop(self.local.spawn_local(task));
    }
}

impl fmt::Debug for TokioScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioScheduler").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Panics: test failures
mod tests {
    use super::*;
    use promissory_core::{Deferred, Rejection};
    use std::time::Duration;

    #[tokio::test]
    async fn test_executor_runs_inside_local_set() {
        let scheduler = TokioScheduler::new();
        let deferred = Deferred::<i32>::new(&scheduler.handle(), |settle| {
            settle.resolve(8);
            Ok(())
        });

        let result = scheduler.run_until(deferred.wait()).await;
        assert_eq!(result, Ok(8));
    }

    #[tokio::test]
    async fn test_task_can_use_tokio_timers() {
        let scheduler = TokioScheduler::new();
        let delayed = Deferred::<&'static str>::spawn(&scheduler.handle(), async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok("slept")
        });

        let result = scheduler.run_until(async move { delayed.await }).await;
        assert_eq!(result, Ok("slept"));
    }

    #[tokio::test]
    async fn test_rejection_reaches_awaiting_task() {
        let scheduler = TokioScheduler::new();
        let failing = Deferred::<i32>::new(&scheduler.handle(), |_| Err(Rejection::from("nope")));

        let result = scheduler.run_until(failing.wait()).await;
        assert_eq!(result, Err(Rejection::from("nope")));
    }

    #[test]
    fn test_block_on_with_runtime() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let scheduler = TokioScheduler::new();
        let value = Deferred::<u8>::resolved(&scheduler.handle(), 1).then(|v| Ok(v + 1));

        let result = scheduler.block_on(&runtime, value.wait());
        assert_eq!(result, Ok(2));
    }
}

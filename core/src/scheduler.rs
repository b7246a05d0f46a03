//! Scheduling capability injected into every deferred value.
//!
//! The engine never reaches for a global executor. Everything it needs from
//! the host is expressed by [`Scheduler`]:
//!
//! - [`Scheduler::defer`] runs a closure on a later scheduling turn, never
//!   inline with the caller
//! - [`Scheduler::spawn`] drives a cooperative task to completion; the task
//!   suspends and resumes through its [`Waker`](std::task::Waker)
//!
//! Production code uses the executors in `promissory-runtime`; tests can plug in
//! a deterministic fake and step through turns one at a time.

use futures::future::LocalBoxFuture;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

/// A closure queued to run on a later turn.
pub type Job = Box<dyn FnOnce() + 'static>;

/// A `!Send` cooperative task.
pub type LocalTask = LocalBoxFuture<'static, ()>;

/// Host concurrency primitive used by the deferred value engine.
///
/// Implementations are single-threaded: jobs and tasks interleave on one
/// thread and only switch at explicit suspension points.
///
/// # Examples
///
/// ```ignore
/// struct QueueScheduler { jobs: RefCell<VecDeque<Job>> }
///
/// impl Scheduler for QueueScheduler {
///     fn defer(&self, job: Job) {
///         self.jobs.borrow_mut().push_back(job);
///     }
///
///     fn spawn(&self, task: LocalTask) {
///         // hand the task to an executor that polls it
///     }
/// }
/// ```
pub trait Scheduler {
    /// Run `job` on a later scheduling turn.
    ///
    /// Must never invoke `job` before returning. Jobs deferred from the same
    /// thread run in the order they were deferred.
    fn defer(&self, job: Job);

    /// Drive `task` until it completes.
    fn spawn(&self, task: LocalTask);
}

/// Shared handle to a [`Scheduler`].
///
/// Cheap to clone. Every [`Deferred`](crate::Deferred) carries one so that
/// continuations registered after settlement can be dispatched on a fresh turn.
#[derive(Clone)]
pub struct SchedulerHandle(Rc<dyn Scheduler>);

impl SchedulerHandle {
    /// Wrap a scheduler in a new handle.
    #[must_use]
    pub fn new<S: Scheduler + 'static>(scheduler: S) -> Self {
        Self(Rc::new(scheduler))
    }

    /// Run `job` on a later turn.
    pub fn defer(&self, job: impl FnOnce() + 'static) {
        self.0.defer(Box::new(job));
    }

    /// Drive `task` as a cooperative task.
    pub fn spawn(&self, task: impl Future<Output = ()> + 'static) {
        self.0.spawn(Box::pin(task));
    }
}

impl<S: Scheduler + 'static> From<Rc<S>> for SchedulerHandle {
    fn from(scheduler: Rc<S>) -> Self {
        Self(scheduler)
    }
}

impl fmt::Debug for SchedulerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SchedulerHandle(..)")
    }
}

//! Deterministic single-threaded executor.
//!
//! [`LocalExecutor`] owns one FIFO run queue. Each turn either runs one
//! deferred job or polls one woken task, so the interleaving of cooperative
//! tasks is fully determined by the order in which work was queued. It has no
//! I/O reactor; use [`TokioScheduler`](crate::TokioScheduler) for tasks that
//! wait on sockets or timers.
//!
//! # Example
//!
//! ```ignore
//! use promissory_core::Deferred;
//! use promissory_runtime::LocalExecutor;
//!
//! let executor = LocalExecutor::new();
//! let scheduler = executor.handle();
//!
//! let sum = Deferred::<i32>::new(&scheduler, |settle| {
//!     settle.resolve(2 + 2);
//!     Ok(())
//! });
//!
//! assert_eq!(executor.block_on(sum.wait())?, Ok(4));
//! ```

use crate::error::RuntimeError;
use futures::task::{ArcWake, waker};
use promissory_core::{Job, LocalTask, Scheduler, SchedulerHandle};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::future::Future;
use std::rc::Rc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::Context;

type TaskId = u64;

enum Runnable {
    Job(Job),
    Poll(TaskId),
}

/// Queue of task ids whose wakers fired.
///
/// Wakers must be `Send + Sync`, so this is the only piece of executor state
/// behind a mutex.
type WokenQueue = Arc<Mutex<VecDeque<TaskId>>>;

fn lock(queue: &Mutex<VecDeque<TaskId>>) -> MutexGuard<'_, VecDeque<TaskId>> {
    queue.lock().unwrap_or_else(PoisonError::into_inner)
}

struct TaskWaker {
    id: TaskId,
    woken: WokenQueue,
}

impl ArcWake for TaskWaker {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        lock(&arc_self.woken).push_back(arc_self.id);
    }
}

#[derive(Default)]
struct Shared {
    ready: RefCell<VecDeque<Runnable>>,
    tasks: RefCell<HashMap<TaskId, LocalTask>>,
    woken: WokenQueue,
    next_task: Cell<TaskId>,
    turns: Cell<u64>,
}

/// Deterministic single-threaded executor and [`Scheduler`].
///
/// Cheap to clone; clones share the same run queue.
#[derive(Clone, Default)]
pub struct LocalExecutor {
    shared: Rc<Shared>,
}

impl LocalExecutor {
    /// Create an executor with an empty run queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scheduler handle for creating deferred values on this executor.
    #[must_use]
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle::new(self.clone())
    }

    /// Run a single turn.
    ///
    /// Returns `false` when there was nothing to run.
    pub fn turn(&self) -> bool {
        self.collect_woken();

        let next = self.shared.ready.borrow_mut().pop_front();
        let Some(runnable) = next else {
            return false;
        };

        self.shared.turns.set(self.shared.turns.get() + 1);
        match runnable {
            Runnable::Job(job) => job(),
            Runnable::Poll(id) => self.poll_task(id),
        }
        true
    }

    /// Run turns until the run queue is empty.
    ///
    /// Returns the number of turns run.
    pub fn run_until_stalled(&self) -> u64 {
        let mut turns = 0;
        while self.turn() {
            turns += 1;
        }
        tracing::trace!(turns, pending_tasks = self.pending_tasks(), "executor stalled");
        turns
    }

    /// Drive `future` to completion, running other queued work as needed.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Stalled`] if the run queue empties while
    /// `future` is still pending, i.e. nothing left could ever wake it.
    pub fn block_on<F>(&self, future: F) -> Result<F::Output, RuntimeError>
    where
        F: Future + 'static,
        F::Output: 'static,
    {
        let output = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&output);
        self.spawn(Box::pin(async move {
            *sink.borrow_mut() = Some(future.await);
        }));

        loop {
            if let Some(value) = output.borrow_mut().take() {
                return Ok(value);
            }
            if !self.turn() {
                tracing::warn!(pending_tasks = self.pending_tasks(), "executor stalled before completion");
                return Err(RuntimeError::Stalled {
                    pending_tasks: self.pending_tasks(),
                });
            }
        }
    }

    /// Number of spawned tasks that have not completed.
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.shared.tasks.borrow().len()
    }

    /// Total number of turns run since creation.
    #[must_use]
    pub fn turns(&self) -> u64 {
        self.shared.turns.get()
    }

    /// Check whether there is work queued for the next turn.
    #[must_use]
    pub fn has_ready_work(&self) -> bool {
        self.collect_woken();
        !self.shared.ready.borrow().is_empty()
    }

    fn collect_woken(&self) {
        let woken: Vec<TaskId> = lock(&self.shared.woken).drain(..).collect();
        if !woken.is_empty() {
            self.shared
                .ready
                .borrow_mut()
                .extend(woken.into_iter().map(Runnable::Poll));
        }
    }

    fn poll_task(&self, id: TaskId) {
        // Completed tasks may still have stale wake-ups queued.
        let task = self.shared.tasks.borrow_mut().remove(&id);
        let Some(mut task) = task else {
            return;
        };

        let waker = waker(Arc::new(TaskWaker {
            id,
            woken: Arc::clone(&self.shared.woken),
        }));
        let mut cx = Context::from_waker(&waker);

        if task.as_mut().poll(&mut cx).is_pending() {
            self.shared.tasks.borrow_mut().insert(id, task);
        } else {
            tracing::trace!(task = id, "task completed");
        }
    }
}

impl Scheduler for LocalExecutor {
    fn defer(&self, job: Job) {
        self.shared.ready.borrow_mut().push_back(Runnable::Job(job));
    }

    fn spawn(&self, task: LocalTask) {
        let id = self.shared.next_task.get();
        self.shared.next_task.set(id + 1);
        self.shared.tasks.borrow_mut().insert(id, task);
        self.shared.ready.borrow_mut().push_back(Runnable::Poll(id));
    }
}

impl fmt::Debug for LocalExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalExecutor")
            .field("ready", &self.shared.ready.borrow().len())
            .field("pending_tasks", &self.pending_tasks())
            .field("turns", &self.turns())
            .finish()
    }
}

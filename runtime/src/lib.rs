//! # Promissory Runtime
//!
//! Schedulers that drive promissory deferred values.
//!
//! ## Core Components
//!
//! - **`LocalExecutor`**: deterministic single-threaded run queue; one job or
//!   one task poll per turn, no I/O reactor
//! - **`TokioScheduler`**: spawns onto a tokio `LocalSet`, for tasks that
//!   perform real I/O
//!
//! Both implement [`promissory_core::Scheduler`] and hand out
//! [`SchedulerHandle`](promissory_core::SchedulerHandle)s.
//!
//! ## Example
//!
//! ```ignore
//! use promissory_core::Deferred;
//! use promissory_runtime::LocalExecutor;
//!
//! let executor = LocalExecutor::new();
//! let scheduler = executor.handle();
//!
//! let doubled = Deferred::<i32>::resolved(&scheduler, 21).then(|n| Ok(n * 2));
//!
//! assert_eq!(executor.block_on(doubled.wait())?, Ok(42));
//! ```

/// Deterministic single-threaded executor
pub mod local;

/// Scheduler backed by a tokio `LocalSet`
pub mod tokio_scheduler;

/// Error types for the executors
pub mod error {
    use thiserror::Error;

    /// Errors that can occur while driving an executor
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum RuntimeError {
        /// The run queue emptied while the driven future was still pending
        ///
        /// Nothing left in the executor could ever wake the future, typically
        /// because it awaits a deferred value that is never settled.
        #[error("Executor stalled with {pending_tasks} tasks still pending")]
        Stalled {
            /// Spawned tasks that had not completed
            pending_tasks: usize,
        },
    }
}

pub use error::RuntimeError;
pub use local::LocalExecutor;
pub use tokio_scheduler::TokioScheduler;

//! # Promissory Core
//!
//! Deferred values with chained continuations for single-threaded cooperative
//! schedulers.
//!
//! ## Core Concepts
//!
//! - **Deferred**: a single-settlement container for a future outcome
//! - **Settle**: the producer handle that resolves or rejects a deferred value
//! - **Subscription**: a queued continuation linking a parent to the child
//!   returned by a chaining call
//! - **Scheduler**: the injected host capability that runs work on later
//!   turns and drives cooperative tasks
//!
//! ## Guarantees
//!
//! - A deferred value settles at most once; later attempts are no-ops
//! - Executors never run inline with the call that creates the value
//! - Continuations fire in registration order
//! - Failures in executors and handlers become rejections and never escape
//!
//! ## Example
//!
//! ```ignore
//! use promissory_core::{Deferred, Rejection};
//!
//! let scheduler = executor.handle();
//!
//! let greeting = Deferred::<String>::new(&scheduler, |settle| {
//!     settle.resolve("hello".to_string());
//!     Ok(())
//! })
//! .then(|text| Ok(text.to_uppercase()))
//! .catch(|error| Ok(format!("failed: {error}")));
//!
//! // From inside a cooperative task:
//! let text = greeting.await?;
//! ```

pub mod deferred;
pub mod error;
pub mod scheduler;

#[cfg(test)]
mod testing;

pub use deferred::{Deferred, DeferredState, Settle, Settled};
pub use error::Rejection;
pub use scheduler::{Job, LocalTask, Scheduler, SchedulerHandle};

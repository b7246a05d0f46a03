//! The deferred value engine.
//!
//! A [`Deferred`] is a single-settlement container for a future outcome. It
//! starts `Pending` and moves to `Resolved` or `Rejected` exactly once; every
//! later settlement attempt is ignored.
//!
//! Consumers register continuations with [`Deferred::chain`] (and its sugar
//! [`then`](Deferred::then), [`catch`](Deferred::catch),
//! [`finally`](Deferred::finally)), each of which returns a new child
//! `Deferred`. Continuations registered while pending are queued and run in
//! registration order during the settlement drain; continuations registered
//! after settlement are dispatched on the next scheduling turn.
//!
//! Inside a cooperative task a `Deferred` can simply be `.await`ed.
//!
//! # Example
//!
//! ```ignore
//! let scheduler = executor.handle();
//!
//! let answer = Deferred::<i32>::new(&scheduler, |settle| {
//!     settle.resolve(41);
//!     Ok(())
//! })
//! .then(|value| Ok(value + 1))
//! .finally(|| {
//!     tracing::info!("computation finished");
//!     Ok(())
//! });
//!
//! assert_eq!(executor.block_on(answer.wait())?, Ok(42));
//! ```

use crate::error::Rejection;
use crate::scheduler::SchedulerHandle;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};
use tracing::{debug, trace};

/// Lifecycle state of a [`Deferred`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredState {
    /// Not settled yet
    Pending,

    /// Settled with a value
    Resolved,

    /// Settled with an error
    Rejected,
}

impl DeferredState {
    /// Check whether the value has settled
    #[must_use]
    pub const fn is_settled(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for DeferredState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Resolved => write!(f, "resolved"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// A queued continuation.
///
/// Owns the matching handlers and the child's [`Settle`] handle, erased into a
/// single dispatch closure so that children of different value types can share
/// one queue.
type Subscription<T, E> = Box<dyn FnOnce(Result<T, E>)>;

struct Inner<T, E>
where
    T: 'static,
    E: 'static,
{
    outcome: Option<Result<T, E>>,
    queue: VecDeque<Subscription<T, E>>,
}

impl<T: 'static, E: 'static> Drop for Inner<T, E> {
    fn drop(&mut self) {
        // A pending chain owns its children through the queue; release them
        // one link at a time.
        let queue = std::mem::take(&mut self.queue);
        if !queue.is_empty() {
            run_drain(Box::new(move || drop(queue)));
        }
    }
}

/// Deferred work of a settlement: running a drained queue, or dropping one.
type Drain = Box<dyn FnOnce()>;

thread_local! {
    static DRAINS: RefCell<VecDeque<Drain>> = const { RefCell::new(VecDeque::new()) };
    static DRAINING: Cell<bool> = const { Cell::new(false) };
}

struct DrainGuard;

impl Drop for DrainGuard {
    fn drop(&mut self) {
        let _ = DRAINING.try_with(|draining| draining.set(false));
    }
}

/// Run `drain` now, or after the drain already running on this thread.
///
/// Settling a child from inside a subscription queues the child's drain
/// instead of recursing, so chains of any length settle in constant stack
/// depth. Each value's subscriptions still run in registration order, and the
/// outermost call returns only once every queued drain has run.
fn run_drain(drain: Drain) {
    let Ok(already_draining) = DRAINING.try_with(|draining| draining.replace(true)) else {
        drain();
        return;
    };

    if already_draining {
        let mut drain = Some(drain);
        let queued = DRAINS.try_with(|drains| {
            if let Some(drain) = drain.take() {
                drains.borrow_mut().push_back(drain);
            }
        });
        if queued.is_err() {
            if let Some(drain) = drain {
                drain();
            }
        }
        return;
    }

    let _guard = DrainGuard;
    drain();
    while let Some(next) = DRAINS
        .try_with(|drains| drains.borrow_mut().pop_front())
        .ok()
        .flatten()
    {
        next();
    }
}

/// Producer side of a [`Deferred`].
///
/// Handed to executors. Cloning is allowed; only the first call to
/// [`resolve`](Settle::resolve) or [`reject`](Settle::reject) across all
/// clones has an effect.
pub struct Settle<T, E = Rejection>
where
    T: 'static,
    E: 'static,
{
    inner: Rc<RefCell<Inner<T, E>>>,
}

impl<T: 'static, E: 'static> Clone for Settle<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: 'static, E: 'static> fmt::Debug for Settle<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settle")
            .field("settled", &self.inner.borrow().outcome.is_some())
            .finish()
    }
}

impl<T: Clone + 'static, E: Clone + 'static> Settle<T, E> {
    /// Resolve with `value`.
    ///
    /// Returns `false` if the value had already settled, in which case
    /// nothing happens.
    pub fn resolve(&self, value: T) -> bool {
        self.settle(Ok(value))
    }

    /// Reject with `error`.
    ///
    /// Returns `false` if the value had already settled, in which case
    /// nothing happens.
    pub fn reject(&self, error: E) -> bool {
        self.settle(Err(error))
    }

    /// Settle with an outcome, resolving on `Ok` and rejecting on `Err`.
    ///
    /// The queued subscriptions are taken out of the cell before any handler
    /// runs, so handlers may chain on (or try to settle) this same value.
    /// Called from inside a handler, the subscriptions run once that handler's
    /// drain finishes rather than inline.
    pub fn settle(&self, outcome: Result<T, E>) -> bool {
        let queue = {
            let mut inner = self.inner.borrow_mut();
            if inner.outcome.is_some() {
                debug!("ignoring settlement of an already settled deferred value");
                return false;
            }
            inner.outcome = Some(outcome.clone());
            std::mem::take(&mut inner.queue)
        };

        trace!(
            resolved = outcome.is_ok(),
            subscriptions = queue.len(),
            "deferred value settled"
        );

        if !queue.is_empty() {
            run_drain(Box::new(move || {
                for subscription in queue {
                    subscription(outcome.clone());
                }
            }));
        }
        true
    }
}

/// A single-settlement container for a future outcome.
///
/// Cheap to clone: clones share the same state. Not `Send`; a `Deferred` lives
/// on the thread of the scheduler that created it.
pub struct Deferred<T, E = Rejection>
where
    T: 'static,
    E: 'static,
{
    inner: Rc<RefCell<Inner<T, E>>>,
    scheduler: SchedulerHandle,
}

impl<T: 'static, E: 'static> Clone for Deferred<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
            scheduler: self.scheduler.clone(),
        }
    }
}

impl<T: 'static, E: 'static> fmt::Debug for Deferred<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        let state = match &inner.outcome {
            None => DeferredState::Pending,
            Some(Ok(_)) => DeferredState::Resolved,
            Some(Err(_)) => DeferredState::Rejected,
        };
        f.debug_struct("Deferred")
            .field("state", &state)
            .field("queued", &inner.queue.len())
            .finish()
    }
}

impl<T: Clone + 'static, E: Clone + 'static> Deferred<T, E> {
    /// Create a pending value together with its producer handle.
    ///
    /// No executor is scheduled; the caller settles through the returned
    /// [`Settle`] whenever it likes.
    #[must_use]
    pub fn pending(scheduler: &SchedulerHandle) -> (Self, Settle<T, E>) {
        let inner = Rc::new(RefCell::new(Inner {
            outcome: None,
            queue: VecDeque::new(),
        }));
        let settle = Settle {
            inner: Rc::clone(&inner),
        };
        (
            Self {
                inner,
                scheduler: scheduler.clone(),
            },
            settle,
        )
    }

    /// Create a value whose `executor` runs on a fresh scheduling turn.
    ///
    /// The executor receives the producer handle. Returning `Err` rejects the
    /// value with that error, unless the executor already settled it.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let parsed = Deferred::<u16>::new(&scheduler, move |settle| {
    ///     let port = text.parse::<u16>().map_err(|e| Rejection::new(e.to_string()))?;
    ///     settle.resolve(port);
    ///     Ok(())
    /// });
    /// ```
    pub fn new<F>(scheduler: &SchedulerHandle, executor: F) -> Self
    where
        F: FnOnce(Settle<T, E>) -> Result<(), E> + 'static,
    {
        let (deferred, settle) = Self::pending(scheduler);
        scheduler.defer(move || {
            if let Err(error) = executor(settle.clone()) {
                trace!("deferred executor failed");
                settle.reject(error);
            }
        });
        deferred
    }

    /// Create a value settled by the output of a cooperative task.
    ///
    /// The task is handed to the scheduler and suspends wherever it awaits;
    /// this is how side-effecting async work is wrapped as a deferred value.
    pub fn spawn<F>(scheduler: &SchedulerHandle, task: F) -> Self
    where
        F: Future<Output = Result<T, E>> + 'static,
    {
        let (deferred, settle) = Self::pending(scheduler);
        scheduler.spawn(async move {
            settle.settle(task.await);
        });
        deferred
    }

    /// Create a value that is already resolved.
    #[must_use]
    pub fn resolved(scheduler: &SchedulerHandle, value: T) -> Self {
        let (deferred, settle) = Self::pending(scheduler);
        settle.resolve(value);
        deferred
    }

    /// Create a value that is already rejected.
    #[must_use]
    pub fn rejected(scheduler: &SchedulerHandle, error: E) -> Self {
        let (deferred, settle) = Self::pending(scheduler);
        settle.reject(error);
        deferred
    }

    /// Resolve once every input resolves, with the values in input order.
    ///
    /// Rejects with the first rejection observed. An empty input resolves
    /// immediately with an empty vector.
    pub fn all<I>(scheduler: &SchedulerHandle, deferreds: I) -> Deferred<Vec<T>, E>
    where
        I: IntoIterator<Item = Self>,
    {
        let deferreds: Vec<Self> = deferreds.into_iter().collect();
        let (combined, settle) = Deferred::pending(scheduler);
        if deferreds.is_empty() {
            settle.resolve(Vec::new());
            return combined;
        }

        let collected = Rc::new(RefCell::new(Collected {
            values: std::iter::repeat_with(|| None).take(deferreds.len()).collect(),
            remaining: deferreds.len(),
        }));

        for (index, deferred) in deferreds.into_iter().enumerate() {
            let collected = Rc::clone(&collected);
            let settle = settle.clone();
            deferred.subscribe(Box::new(move |outcome| match outcome {
                Ok(value) => {
                    let finished = collected.borrow_mut().record(index, value);
                    if let Some(values) = finished {
                        settle.resolve(values);
                    }
                },
                Err(error) => {
                    settle.reject(error);
                },
            }));
        }
        combined
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> DeferredState {
        match &self.inner.borrow().outcome {
            None => DeferredState::Pending,
            Some(Ok(_)) => DeferredState::Resolved,
            Some(Err(_)) => DeferredState::Rejected,
        }
    }

    /// Check whether the value is still pending.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.inner.borrow().outcome.is_none()
    }

    /// The settled outcome, if any.
    #[must_use]
    pub fn outcome(&self) -> Option<Result<T, E>> {
        self.inner.borrow().outcome.clone()
    }

    /// The scheduler this value dispatches late continuations on.
    #[must_use]
    pub const fn scheduler(&self) -> &SchedulerHandle {
        &self.scheduler
    }

    /// Register handlers for both outcomes and return the child value.
    ///
    /// Exactly one handler runs per settlement. An `Ok` return resolves the
    /// child, an `Err` return rejects it; a failing handler never escapes to
    /// the caller.
    pub fn chain<U, R, J>(&self, on_resolve: R, on_reject: J) -> Deferred<U, E>
    where
        U: Clone + 'static,
        R: FnOnce(T) -> Result<U, E> + 'static,
        J: FnOnce(E) -> Result<U, E> + 'static,
    {
        let (child, settle) = Deferred::pending(&self.scheduler);
        self.subscribe(Box::new(move |outcome| {
            let next = match outcome {
                Ok(value) => on_resolve(value),
                Err(error) => on_reject(error),
            };
            settle.settle(next);
        }));
        child
    }

    /// Register a resolution handler; rejections pass through unchanged.
    pub fn then<U, R>(&self, on_resolve: R) -> Deferred<U, E>
    where
        U: Clone + 'static,
        R: FnOnce(T) -> Result<U, E> + 'static,
    {
        self.chain(on_resolve, Err)
    }

    /// Register a resolution handler that produces another deferred value.
    ///
    /// The child adopts the outcome of the returned value, so a rejection of
    /// the nested computation rejects the child.
    pub fn then_deferred<U, R>(&self, on_resolve: R) -> Deferred<U, E>
    where
        U: Clone + 'static,
        R: FnOnce(T) -> Deferred<U, E> + 'static,
    {
        let (child, settle) = Deferred::pending(&self.scheduler);
        self.subscribe(Box::new(move |outcome| match outcome {
            Ok(value) => {
                on_resolve(value).subscribe(Box::new(move |nested| {
                    settle.settle(nested);
                }));
            },
            Err(error) => {
                settle.reject(error);
            },
        }));
        child
    }

    /// Register a rejection handler; resolutions pass through unchanged.
    pub fn catch<J>(&self, on_reject: J) -> Self
    where
        J: FnOnce(E) -> Result<T, E> + 'static,
    {
        self.chain(Ok, on_reject)
    }

    /// Run `on_finally` once the value settles, whatever the outcome.
    ///
    /// The original outcome is preserved: a rejection stays a rejection and a
    /// resolution keeps its value. If the finalizer itself fails, the child
    /// rejects with the finalizer's error.
    pub fn finally<F>(&self, on_finally: F) -> Self
    where
        F: FnOnce() -> Result<(), E> + 'static,
    {
        let (child, settle) = Self::pending(&self.scheduler);
        self.subscribe(Box::new(move |outcome| {
            let next = match on_finally() {
                Ok(()) => outcome,
                Err(error) => Err(error),
            };
            settle.settle(next);
        }));
        child
    }

    /// Future that completes with the settled outcome.
    ///
    /// Equivalent to `.await`ing a clone of this value.
    #[must_use]
    pub fn wait(&self) -> Settled<T, E> {
        self.clone().into_future()
    }

    fn subscribe(&self, subscription: Subscription<T, E>) {
        let mut inner = self.inner.borrow_mut();
        if let Some(outcome) = inner.outcome.clone() {
            drop(inner);
            trace!("deferred value already settled, dispatching on next turn");
            self.scheduler.defer(move || subscription(outcome));
        } else {
            inner.queue.push_back(subscription);
        }
    }
}

struct Collected<T> {
    values: Vec<Option<T>>,
    remaining: usize,
}

impl<T> Collected<T> {
    fn record(&mut self, index: usize, value: T) -> Option<Vec<T>> {
        self.values[index] = Some(value);
        self.remaining -= 1;
        if self.remaining > 0 {
            return None;
        }
        Some(std::mem::take(&mut self.values).into_iter().flatten().collect())
    }
}

struct WaitSlot<T, E> {
    outcome: Option<Result<T, E>>,
    waker: Option<Waker>,
}

/// Future returned by awaiting a [`Deferred`].
///
/// Suspends only the awaiting task. If the value has already settled, the
/// first poll completes with the payload; otherwise a subscription is
/// registered that records the outcome and wakes the task.
pub struct Settled<T, E = Rejection>
where
    T: 'static,
    E: 'static,
{
    deferred: Deferred<T, E>,
    slot: Option<Rc<RefCell<WaitSlot<T, E>>>>,
}

impl<T: 'static, E: 'static> fmt::Debug for Settled<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settled")
            .field("deferred", &self.deferred)
            .field("subscribed", &self.slot.is_some())
            .finish()
    }
}

impl<T: Clone + 'static, E: Clone + 'static> Future for Settled<T, E> {
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if let Some(slot) = &this.slot {
            let mut slot = slot.borrow_mut();
            return match slot.outcome.take() {
                Some(outcome) => Poll::Ready(outcome),
                None => {
                    slot.waker = Some(cx.waker().clone());
                    Poll::Pending
                },
            };
        }

        if let Some(outcome) = this.deferred.outcome() {
            return Poll::Ready(outcome);
        }

        let slot = Rc::new(RefCell::new(WaitSlot {
            outcome: None,
            waker: Some(cx.waker().clone()),
        }));
        let resume = Rc::clone(&slot);
        this.deferred.subscribe(Box::new(move |outcome| {
            let waker = {
                let mut slot = resume.borrow_mut();
                slot.outcome = Some(outcome);
                slot.waker.take()
            };
            if let Some(waker) = waker {
                waker.wake();
            }
        }));
        this.slot = Some(slot);
        Poll::Pending
    }
}

impl<T: Clone + 'static, E: Clone + 'static> IntoFuture for Deferred<T, E> {
    type Output = Result<T, E>;
    type IntoFuture = Settled<T, E>;

    fn into_future(self) -> Self::IntoFuture {
        Settled {
            deferred: self,
            slot: None,
        }
    }
}

//! Deferred values driven by the runtime schedulers.

#![allow(clippy::unwrap_used)]

use promissory_core::{Deferred, Rejection};
use promissory_runtime::{LocalExecutor, RuntimeError, TokioScheduler};
use promissory_testing::StepScheduler;
use promissory_testing::helpers::init_test_tracing;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

#[test]
fn test_chain_computes_through_then() {
    init_test_tracing();
    let executor = LocalExecutor::new();

    let value = Deferred::<i32>::new(&executor.handle(), |settle| {
        settle.resolve(5);
        Ok(())
    })
    .then(|n| Ok(n * 2));

    assert_eq!(executor.block_on(value.wait()).unwrap(), Ok(10));
}

#[test]
fn test_executor_is_not_inline() {
    let scheduler = StepScheduler::new();
    let ran = Rc::new(RefCell::new(false));
    let flag = Rc::clone(&ran);

    let value = Deferred::<()>::new(&scheduler.handle(), move |settle| {
        *flag.borrow_mut() = true;
        settle.resolve(());
        Ok(())
    });

    assert!(!*ran.borrow());
    assert!(value.is_pending());

    scheduler.run_all();
    assert!(*ran.borrow());
    assert_eq!(value.outcome(), Some(Ok(())));
}

#[test]
fn test_rejection_skips_then_and_reaches_catch() {
    let executor = LocalExecutor::new();
    let calls = Rc::new(RefCell::new(Vec::new()));

    let log = Rc::clone(&calls);
    let recovered = Deferred::<i32>::rejected(&executor.handle(), Rejection::new("boom"))
        .then(move |n| {
            log.borrow_mut().push("then");
            Ok(n)
        })
        .catch(|error| {
            assert_eq!(error.message(), "boom");
            Ok(-1)
        });

    assert_eq!(executor.block_on(recovered.wait()).unwrap(), Ok(-1));
    assert!(calls.borrow().is_empty());
}

#[test]
fn test_failing_handler_rejects_child_only() {
    let executor = LocalExecutor::new();
    let parent = Deferred::<i32>::resolved(&executor.handle(), 1);
    let child = parent.then(|_| Err::<i32, _>(Rejection::new("handler failed")));

    executor.run_until_stalled();

    assert_eq!(parent.outcome(), Some(Ok(1)));
    assert_eq!(child.outcome(), Some(Err(Rejection::new("handler failed"))));
}

#[test]
fn test_finally_preserves_outcome() {
    let executor = LocalExecutor::new();
    let cleaned = Rc::new(RefCell::new(0));

    let counter = Rc::clone(&cleaned);
    let rejected = Deferred::<i32>::rejected(&executor.handle(), Rejection::new("nope")).finally(move || {
        *counter.borrow_mut() += 1;
        Ok(())
    });
    let counter = Rc::clone(&cleaned);
    let resolved = Deferred::<i32>::resolved(&executor.handle(), 3).finally(move || {
        *counter.borrow_mut() += 1;
        Ok(())
    });

    executor.run_until_stalled();

    assert_eq!(rejected.outcome(), Some(Err(Rejection::new("nope"))));
    assert_eq!(resolved.outcome(), Some(Ok(3)));
    assert_eq!(*cleaned.borrow(), 2);
}

#[test]
fn test_await_suspends_only_the_awaiting_task() {
    let executor = LocalExecutor::new();
    let handle = executor.handle();
    let (gate, open) = Deferred::<&'static str>::pending(&handle);
    let log = Rc::new(RefCell::new(Vec::new()));

    let waiter_log = Rc::clone(&log);
    let waiter = Deferred::<(), Rejection>::spawn(&handle, async move {
        waiter_log.borrow_mut().push("waiting");
        let word = gate.await?;
        waiter_log.borrow_mut().push(word);
        Ok(())
    });

    let other_log = Rc::clone(&log);
    handle.spawn(async move {
        other_log.borrow_mut().push("independent");
    });

    executor.run_until_stalled();
    assert_eq!(*log.borrow(), vec!["waiting", "independent"]);
    assert!(waiter.is_pending());

    open.resolve("opened");
    executor.run_until_stalled();
    assert_eq!(*log.borrow(), vec!["waiting", "independent", "opened"]);
    assert_eq!(waiter.outcome(), Some(Ok(())));
}

#[test]
fn test_await_of_rejection_yields_error() {
    let executor = LocalExecutor::new();
    let handle = executor.handle();
    let failing = Deferred::<i32>::new(&handle, |_settle| Err(Rejection::new("executor failed")));

    let observed = executor.block_on(async move { failing.await }).unwrap();
    assert_eq!(observed, Err(Rejection::new("executor failed")));
}

#[test]
fn test_never_settled_value_stalls() {
    let executor = LocalExecutor::new();
    let (never, _settle) = Deferred::<i32>::pending(&executor.handle());

    let result = executor.block_on(never.wait());
    assert!(matches!(result, Err(RuntimeError::Stalled { .. })));
}

#[test]
fn test_all_on_step_scheduler_keeps_input_order() {
    let scheduler = StepScheduler::new();
    let handle = scheduler.handle();
    let (slow, finish_slow) = Deferred::<i32>::pending(&handle);
    let fast = Deferred::<i32>::resolved(&handle, 2);

    let both = Deferred::all(&handle, [slow, fast]);
    scheduler.run_all();
    assert!(both.is_pending());

    finish_slow.resolve(1);
    scheduler.run_all();
    assert_eq!(both.outcome(), Some(Ok(vec![1, 2])));
}

#[tokio::test(flavor = "current_thread")]
async fn test_tokio_scheduler_awaits_timer_backed_values() {
    init_test_tracing();
    let scheduler = TokioScheduler::new();
    let handle = scheduler.handle();

    let delayed = Deferred::<u64>::spawn(&handle, async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        Ok(7)
    })
    .then(|n| Ok(n + 1));

    let outcome = scheduler.run_until(delayed.wait()).await;
    assert_eq!(outcome, Ok(8));
}

#[test]
fn test_tokio_scheduler_block_on() {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let scheduler = TokioScheduler::new();

    let value = Deferred::<&'static str>::new(&scheduler.handle(), |settle| {
        settle.resolve("tokio");
        Ok(())
    });

    assert_eq!(scheduler.block_on(&runtime, value.wait()), Ok("tokio"));
}

#[test]
fn test_tokio_scheduler_under_tokio_test_runtime() {
    let scheduler = TokioScheduler::new();
    let handle = scheduler.handle();
    let (value, settle) = Deferred::<i32>::pending(&handle);

    handle.spawn(async move {
        tokio::task::yield_now().await;
        settle.resolve(3);
    });

    let outcome = tokio_test::block_on(scheduler.run_until(value.wait()));
    assert_eq!(outcome, Ok(3));
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Jobs and tasks queued in any mix run in the order they were queued.
        #[test]
        fn local_executor_is_fifo(kinds in prop::collection::vec(any::<bool>(), 0..24)) {
            let executor = LocalExecutor::new();
            let handle = executor.handle();
            let log = Rc::new(RefCell::new(Vec::new()));

            for (index, is_task) in kinds.iter().copied().enumerate() {
                let log = Rc::clone(&log);
                if is_task {
                    handle.spawn(async move { log.borrow_mut().push(index) });
                } else {
                    handle.defer(move || log.borrow_mut().push(index));
                }
            }

            prop_assert_eq!(executor.run_until_stalled(), kinds.len() as u64);
            prop_assert_eq!(log.borrow().clone(), (0..kinds.len()).collect::<Vec<_>>());
            prop_assert_eq!(executor.pending_tasks(), 0);
        }
    }
}

#[test]
fn test_deep_chain_on_local_executor() {
    let executor = LocalExecutor::new();
    let (root, settle) = Deferred::<u64>::pending(&executor.handle());

    let mut tail = root;
    for _ in 0..100_000 {
        tail = tail.then(|n| Ok(n + 1));
    }

    settle.resolve(0);
    assert_eq!(executor.block_on(tail.wait()).unwrap(), Ok(100_000));
}

//! Property tests for settlement and dispatch order.

#![allow(clippy::unwrap_used)]

use promissory_core::{Deferred, DeferredState};
use promissory_http::{Body, Query, RawResponse, Response, is_failure_status, merge_query};
use promissory_testing::StepScheduler;
use promissory_testing::properties::{
    Attempt, handler_counts, plain_query_pairs, settlement_attempts, status_codes,
};
use proptest::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

proptest! {
    /// Only the first attempt takes effect, whatever follows it.
    #[test]
    fn first_settlement_wins(attempts in settlement_attempts()) {
        let scheduler = StepScheduler::new();
        let (value, settle) = Deferred::<i32, String>::pending(&scheduler.handle());

        let accepted: Vec<bool> = attempts.iter().cloned().map(|a| settle.settle(a)).collect();

        prop_assert!(accepted[0]);
        prop_assert!(accepted[1..].iter().all(|accepted| !accepted));
        prop_assert_eq!(value.outcome(), Some(attempts[0].clone()));

        let expected = if attempts[0].is_ok() { DeferredState::Resolved } else { DeferredState::Rejected };
        prop_assert_eq!(value.state(), expected);
    }

    /// Each registered handler runs exactly once, in registration order.
    #[test]
    fn handlers_run_once_in_registration_order(count in handler_counts(), attempt in settlement_attempts()) {
        let scheduler = StepScheduler::new();
        let (value, settle) = Deferred::<i32, String>::pending(&scheduler.handle());
        let log = Rc::new(RefCell::new(Vec::new()));

        for index in 0..count {
            let log = Rc::clone(&log);
            let _child = value.chain(
                {
                    let log = Rc::clone(&log);
                    move |_| {
                        log.borrow_mut().push(index);
                        Ok(())
                    }
                },
                move |_| {
                    log.borrow_mut().push(index);
                    Ok(())
                },
            );
        }

        for a in attempt {
            settle.settle(a);
        }
        scheduler.run_all();

        prop_assert_eq!(log.borrow().clone(), (0..count).collect::<Vec<_>>());
    }

    /// Handlers registered after settlement still see the outcome, but never inline.
    #[test]
    fn late_handlers_dispatch_on_a_later_turn(attempt in settlement_attempts()) {
        let scheduler = StepScheduler::new();
        let first: Attempt = attempt[0].clone();
        let value = match first.clone() {
            Ok(v) => Deferred::<i32, String>::resolved(&scheduler.handle(), v),
            Err(e) => Deferred::<i32, String>::rejected(&scheduler.handle(), e),
        };

        let seen = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&seen);
        let _child = value.chain(
            {
                let sink = Rc::clone(&sink);
                move |v| {
                    *sink.borrow_mut() = Some(Ok(v));
                    Ok(())
                }
            },
            move |e| {
                *sink.borrow_mut() = Some(Err(e));
                Ok(())
            },
        );

        prop_assert!(seen.borrow().is_none());
        scheduler.run_all();
        prop_assert_eq!(seen.borrow().clone(), Some(first));
    }

    /// `success` mirrors the failure range for every status.
    #[test]
    fn success_flag_mirrors_status_class(status in status_codes()) {
        let response: Response = RawResponse::new(status, "x", "").into_response(Body::Text(String::new()));
        prop_assert_eq!(response.success, !is_failure_status(status));
        prop_assert_eq!(is_failure_status(status), (400..=511).contains(&status));
    }

    /// A URL query always beats the options query.
    #[test]
    fn url_query_wins(url_pairs in plain_query_pairs(), option_pairs in plain_query_pairs()) {
        let url_query: Query = url_pairs.into_iter().collect();
        let option_query: Query = option_pairs.into_iter().collect();
        prop_assert_eq!(merge_query(Some(url_query.clone()), Some(option_query.clone())), Some(url_query));
        prop_assert_eq!(merge_query(None, Some(option_query.clone())), Some(option_query));
    }
}

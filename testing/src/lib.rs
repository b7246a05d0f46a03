//! # Promissory Testing
//!
//! Testing utilities and helpers for promissory deferred values and HTTP
//! requests.
//!
//! This crate provides:
//! - A counting, step-by-step scheduler for observing turn order
//! - A scripted transport that records every request it receives
//! - Response fixtures
//! - Property-based testing strategies
//!
//! ## Example
//!
//! ```ignore
//! use promissory_http::{Client, RequestOptions};
//! use promissory_testing::{StepScheduler, fixtures, mocks::MockTransport};
//!
//! #[test]
//! fn not_found_rejects() {
//!     let scheduler = StepScheduler::new();
//!     let transport = MockTransport::new();
//!     transport.push_response(fixtures::status(404, "Not Found"));
//!
//!     let client = Client::new(scheduler.handle(), transport.clone());
//!     let outcome = scheduler.block_on(client.get("http://h/x", RequestOptions::new()).wait());
//!
//!     assert_eq!(outcome.unwrap().unwrap_err().to_string(), "Not Found");
//!     assert_eq!(transport.requests().len(), 1);
//! }
//! ```

pub mod scheduler;

pub use scheduler::StepScheduler;

/// Mock implementations of the transport seam.
pub mod mocks {
    use futures::FutureExt;
    use futures::channel::oneshot;
    use futures::future::LocalBoxFuture;
    use promissory_http::{RawResponse, RequestDescriptor, Transport, TransportError};
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    type Exchange = Result<RawResponse, TransportError>;

    enum Scripted {
        Ready(Exchange),
        Gated(oneshot::Receiver<Exchange>),
    }

    #[derive(Default)]
    struct State {
        script: VecDeque<Scripted>,
        requests: Vec<RequestDescriptor>,
    }

    /// Scripted transport for tests.
    ///
    /// Responses are handed out in the order they were pushed, one per
    /// request. Every request is recorded. A request arriving when the script
    /// is empty fails with [`TransportError::Connect`].
    ///
    /// Clones share the same script and request log, so keep a clone around
    /// after moving one into a client.
    ///
    /// # Example
    ///
    /// ```
    /// use promissory_testing::{fixtures, mocks::MockTransport};
    ///
    /// let transport = MockTransport::new();
    /// transport.push_response(fixtures::ok_text("hello"));
    /// assert_eq!(transport.remaining(), 1);
    /// assert!(transport.requests().is_empty());
    /// ```
    #[derive(Clone, Default)]
    pub struct MockTransport {
        state: Rc<RefCell<State>>,
    }

    impl MockTransport {
        /// Create a transport with an empty script.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a response for the next unanswered request.
        pub fn push_response(&self, response: RawResponse) {
            self.push(Scripted::Ready(Ok(response)));
        }

        /// Queue a transport failure for the next unanswered request.
        pub fn push_error(&self, error: TransportError) {
            self.push(Scripted::Ready(Err(error)));
        }

        /// Queue an exchange that stays in flight until the returned sender
        /// is used.
        ///
        /// Dropping the sender fails the exchange with
        /// [`TransportError::Connect`].
        #[must_use]
        pub fn push_gated(&self) -> oneshot::Sender<Result<RawResponse, TransportError>> {
            let (sender, receiver) = oneshot::channel();
            self.push(Scripted::Gated(receiver));
            sender
        }

        /// Requests received so far, in arrival order.
        #[must_use]
        pub fn requests(&self) -> Vec<RequestDescriptor> {
            self.state.borrow().requests.clone()
        }

        /// Most recent request, if any.
        #[must_use]
        pub fn last_request(&self) -> Option<RequestDescriptor> {
            self.state.borrow().requests.last().cloned()
        }

        /// Number of scripted exchanges not yet consumed.
        #[must_use]
        pub fn remaining(&self) -> usize {
            self.state.borrow().script.len()
        }

        fn push(&self, scripted: Scripted) {
            self.state.borrow_mut().script.push_back(scripted);
        }
    }

    impl Transport for MockTransport {
        fn send(&self, request: RequestDescriptor) -> LocalBoxFuture<'static, Exchange> {
            let next = {
                let mut state = self.state.borrow_mut();
                state.requests.push(request.clone());
                state.script.pop_front()
            };

            match next {
                Some(Scripted::Ready(exchange)) => futures::future::ready(exchange).boxed_local(),
                Some(Scripted::Gated(receiver)) => async move {
                    receiver.await.unwrap_or_else(|_| {
                        Err(TransportError::Connect("gated exchange was dropped".to_string()))
                    })
                }
                .boxed_local(),
                None => futures::future::ready(Err(TransportError::Connect(format!(
                    "no scripted response for {} {}",
                    request.method, request.url
                ))))
                .boxed_local(),
            }
        }
    }

    impl std::fmt::Debug for MockTransport {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            let state = self.state.borrow();
            f.debug_struct("MockTransport")
                .field("remaining", &state.script.len())
                .field("requests", &state.requests.len())
                .finish()
        }
    }
}

/// Canned transport responses.
pub mod fixtures {
    use promissory_http::RawResponse;
    use serde_json::Value;

    /// `200 OK` with a plain text body.
    #[must_use]
    pub fn ok_text(body: &str) -> RawResponse {
        RawResponse::new(200, "OK", body).with_header("content-type", "text/plain")
    }

    /// `200 OK` with `value` serialized as the body.
    #[must_use]
    pub fn ok_json(value: &Value) -> RawResponse {
        RawResponse::new(200, "OK", value.to_string()).with_header("content-type", "application/json")
    }

    /// Empty response with the given status and reason phrase.
    #[must_use]
    pub fn status(status: u16, message: &str) -> RawResponse {
        RawResponse::new(status, message, "")
    }
}

/// Test helpers and utilities.
pub mod helpers {
    use tracing_subscriber::EnvFilter;

    /// Install a `tracing` subscriber that writes through the test harness.
    ///
    /// Honors `RUST_LOG`. Safe to call from every test; only the first call
    /// installs anything.
    pub fn init_test_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;

    /// One attempt to settle a deferred value: `Ok` resolves, `Err` rejects.
    pub type Attempt = Result<i32, String>;

    /// Non-empty sequences of settlement attempts.
    pub fn settlement_attempts() -> impl Strategy<Value = Vec<Attempt>> {
        prop::collection::vec(
            prop_oneof![any::<i32>().prop_map(Ok), "[a-z]{1,12}".prop_map(Err)],
            1..8,
        )
    }

    /// Number of handlers to register on a single value.
    pub fn handler_counts() -> impl Strategy<Value = usize> {
        0usize..16
    }

    /// Status codes in the range a transport can report.
    pub fn status_codes() -> impl Strategy<Value = u16> {
        100u16..600
    }

    /// Query parameters that need no escaping.
    pub fn plain_query_pairs() -> impl Strategy<Value = Vec<(String, String)>> {
        prop::collection::vec(("[a-z]{1,8}", "[a-z0-9]{0,8}"), 1..5)
    }
}

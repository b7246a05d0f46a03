//! The request orchestrator.

use crate::error::RequestError;
use crate::request::{Call, Method, RequestDescriptor, RequestOptions};
use crate::response::{Body, RawResponse, Response, is_failure_status};
use crate::transport::Transport;
use promissory_core::{Deferred, SchedulerHandle};
use serde_json::Value;
use std::fmt;
use std::rc::Rc;

/// Issues requests through a [`Transport`] and settles deferred values with
/// the outcome.
///
/// Every request performs exactly one transport call, inside a cooperative
/// task on the client's scheduler. Statuses in `400..=511` reject with
/// [`RequestError::Status`]; every other status resolves with a
/// [`Response`].
///
/// # Example
///
/// ```ignore
/// let client = Client::new(scheduler.handle(), ReqwestTransport::new()?);
///
/// let names = client
///     .get("https://api.example.com/users", RequestOptions::new().convert_json(true))
///     .then(|response| Ok(response.json().cloned()))
///     .catch(|error| {
///         tracing::warn!(%error, "lookup failed");
///         Ok(None)
///     });
/// ```
#[derive(Clone)]
pub struct Client {
    scheduler: SchedulerHandle,
    transport: Rc<dyn Transport>,
}

impl Client {
    /// Create a client that runs requests on `scheduler` through `transport`.
    #[must_use]
    pub fn new(scheduler: SchedulerHandle, transport: impl Transport + 'static) -> Self {
        Self {
            scheduler,
            transport: Rc::new(transport),
        }
    }

    /// The scheduler requests run on.
    #[must_use]
    pub const fn scheduler(&self) -> &SchedulerHandle {
        &self.scheduler
    }

    /// Issue a request.
    ///
    /// Accepts any [`Call`] shape: a bare URL (`GET`), a URL with options
    /// (`GET`), or an explicit method, URL, and options.
    ///
    /// The returned value rejects with [`RequestError::InvalidUrl`] for a
    /// malformed URL, [`RequestError::Transport`] when the exchange fails,
    /// [`RequestError::Status`] for failure statuses, and
    /// [`RequestError::Decode`] when `convert_json` is set and the body is not
    /// valid JSON.
    pub fn request(&self, call: impl Into<Call>) -> Deferred<Response, RequestError> {
        let (method, url, options) = call.into().into_parts();

        let descriptor = match RequestDescriptor::new(method, &url, options) {
            Ok(descriptor) => descriptor,
            Err(error) => {
                tracing::debug!(%method, %url, %error, "Rejecting request with invalid URL");
                return Deferred::rejected(&self.scheduler, error);
            },
        };

        let convert_json = descriptor.convert_json;
        let transport = Rc::clone(&self.transport);
        let exchange = Deferred::<RawResponse, RequestError>::spawn(&self.scheduler, async move {
            tracing::debug!(method = %descriptor.method, url = %descriptor.url, "Sending request");
            let raw = transport.send(descriptor).await.map_err(|error| {
                tracing::debug!(%error, "Transport failed");
                RequestError::from(error)
            })?;

            tracing::debug!(status = raw.status, "Received response");
            if is_failure_status(raw.status) {
                return Err(RequestError::Status {
                    status: raw.status,
                    message: raw.message,
                });
            }
            Ok(raw)
        });

        let scheduler = self.scheduler.clone();
        exchange.then_deferred(move |mut raw: RawResponse| {
            let text = std::mem::take(&mut raw.body);
            if convert_json {
                decode_json(&scheduler, text).then(move |value| Ok(raw.into_response(Body::Json(value))))
            } else {
                Deferred::resolved(&scheduler, raw.into_response(Body::Text(text)))
            }
        })
    }

    /// `GET url`
    pub fn get(&self, url: impl Into<String>, options: RequestOptions) -> Deferred<Response, RequestError> {
        self.request(Call::Full(Method::Get, url.into(), options))
    }

    /// `POST url`
    pub fn post(&self, url: impl Into<String>, options: RequestOptions) -> Deferred<Response, RequestError> {
        self.request(Call::Full(Method::Post, url.into(), options))
    }

    /// `PUT url`
    pub fn put(&self, url: impl Into<String>, options: RequestOptions) -> Deferred<Response, RequestError> {
        self.request(Call::Full(Method::Put, url.into(), options))
    }

    /// `DELETE url`
    pub fn delete(&self, url: impl Into<String>, options: RequestOptions) -> Deferred<Response, RequestError> {
        self.request(Call::Full(Method::Delete, url.into(), options))
    }

    /// `HEAD url`
    pub fn head(&self, url: impl Into<String>, options: RequestOptions) -> Deferred<Response, RequestError> {
        self.request(Call::Full(Method::Head, url.into(), options))
    }

    /// `OPTIONS url`
    pub fn options(&self, url: impl Into<String>, options: RequestOptions) -> Deferred<Response, RequestError> {
        self.request(Call::Full(Method::Options, url.into(), options))
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

/// Decode `text` as JSON in its own deferred computation.
///
/// Rejects with [`RequestError::Decode`] on malformed input.
pub fn decode_json(scheduler: &SchedulerHandle, text: String) -> Deferred<Value, RequestError> {
    Deferred::new(scheduler, move |settle| {
        let value = serde_json::from_str(&text).map_err(|e| RequestError::Decode(e.to_string()))?;
        settle.resolve(value);
        Ok(())
    })
}

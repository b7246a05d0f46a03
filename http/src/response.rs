//! Response descriptors.
//!
//! [`RawResponse`] is what a [`Transport`](crate::Transport) hands back: the
//! status, reason phrase, headers, and the body as text. [`Response`] is what a
//! request's deferred value resolves with, after status classification and
//! optional JSON decoding.

use serde_json::Value;

/// Status codes in this range settle a request as a failure.
pub const FAILURE_STATUSES: std::ops::RangeInclusive<u16> = 400..=511;

/// Check whether `status` is classified as an application-level failure.
#[must_use]
pub fn is_failure_status(status: u16) -> bool {
    FAILURE_STATUSES.contains(&status)
}

/// Fully buffered response as produced by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// Numeric status code
    pub status: u16,
    /// Reason phrase (e.g. `"Not Found"`), `"Unknown"` for non-standard codes
    pub message: String,
    /// Response headers, in received order
    pub headers: Vec<(String, String)>,
    /// Body text
    pub body: String,
}

impl RawResponse {
    /// Response with the given status, reason phrase, and body, and no headers.
    #[must_use]
    pub fn new(status: u16, message: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Pair the transport's metadata with a processed body.
    #[must_use]
    pub fn into_response(self, body: Body) -> Response {
        Response {
            success: !is_failure_status(self.status),
            status: self.status,
            message: self.message,
            headers: self.headers,
            body,
        }
    }
}

/// Body of a settled response.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Raw body text
    Text(String),
    /// Body decoded as JSON
    Json(Value),
}

/// Resolution payload of a request's deferred value.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Whether the status was classified as success
    pub success: bool,
    /// Numeric status code
    pub status: u16,
    /// Reason phrase
    pub message: String,
    /// Response headers, in received order
    pub headers: Vec<(String, String)>,
    /// Text or decoded JSON body
    pub body: Body,
}

impl Response {
    /// First header named `name`, compared case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body text, if the body was not decoded.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match &self.body {
            Body::Text(text) => Some(text),
            Body::Json(_) => None,
        }
    }

    /// Decoded body, if JSON decoding was requested.
    #[must_use]
    pub const fn json(&self) -> Option<&Value> {
        match &self.body {
            Body::Json(value) => Some(value),
            Body::Text(_) => None,
        }
    }
}

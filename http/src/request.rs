//! Request descriptors and the call shapes accepted by
//! [`Client::request`](crate::Client::request).

use crate::error::RequestError;
use crate::uri::{Query, build_url, parse_url};
use std::fmt;

/// HTTP methods supported by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    /// `GET`
    #[default]
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
    /// `HEAD`
    Head,
    /// `OPTIONS`
    Options,
}

impl Method {
    /// Uppercase method name as sent on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request options.
///
/// # Example
///
/// ```
/// use promissory_http::RequestOptions;
///
/// let options = RequestOptions::new()
///     .header("accept", "application/json")
///     .query_param("page", "2")
///     .convert_json(true);
/// assert!(options.convert_json);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Extra request headers, sent in order
    pub headers: Vec<(String, String)>,
    /// Request body
    pub body: Option<String>,
    /// Query used when the URL itself carries none
    pub query: Option<Query>,
    /// Ask the server for a compressed response
    pub compress: bool,
    /// Decode the response body as JSON
    pub convert_json: bool,
}

impl RequestOptions {
    /// Options with no headers, no body, and both flags off.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Replace the query.
    #[must_use]
    pub fn query(mut self, query: Query) -> Self {
        self.query = Some(query);
        self
    }

    /// Append one query parameter.
    #[must_use]
    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.get_or_insert_with(Query::new).push(key, value);
        self
    }

    /// Toggle response compression.
    #[must_use]
    pub fn compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Toggle JSON decoding of the response body.
    #[must_use]
    pub fn convert_json(mut self, convert_json: bool) -> Self {
        self.convert_json = convert_json;
        self
    }
}

/// The shapes a request call can take.
///
/// Resolved before the orchestrator runs, so no argument-count inspection
/// happens at request time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// `GET` with default options
    Get(String),
    /// `GET` with explicit options
    GetWith(String, RequestOptions),
    /// Explicit method, URL, and options
    Full(Method, String, RequestOptions),
}

impl Call {
    /// Normalize into method, URL, and options.
    #[must_use]
    pub fn into_parts(self) -> (Method, String, RequestOptions) {
        match self {
            Self::Get(url) => (Method::Get, url, RequestOptions::default()),
            Self::GetWith(url, options) => (Method::Get, url, options),
            Self::Full(method, url, options) => (method, url, options),
        }
    }
}

impl From<&str> for Call {
    fn from(url: &str) -> Self {
        Self::Get(url.to_string())
    }
}

impl From<String> for Call {
    fn from(url: String) -> Self {
        Self::Get(url)
    }
}

impl From<(&str, RequestOptions)> for Call {
    fn from((url, options): (&str, RequestOptions)) -> Self {
        Self::GetWith(url.to_string(), options)
    }
}

impl From<(String, RequestOptions)> for Call {
    fn from((url, options): (String, RequestOptions)) -> Self {
        Self::GetWith(url, options)
    }
}

impl From<(Method, &str, RequestOptions)> for Call {
    fn from((method, url, options): (Method, &str, RequestOptions)) -> Self {
        Self::Full(method, url.to_string(), options)
    }
}

impl From<(Method, String, RequestOptions)> for Call {
    fn from((method, url, options): (Method, String, RequestOptions)) -> Self {
        Self::Full(method, url, options)
    }
}

/// Query precedence between a URL and its request options.
///
/// The URL's own query always wins. The options' query is used only when the
/// URL carries no query at all; the two are never combined.
#[must_use]
pub fn merge_query(url_query: Option<Query>, options_query: Option<Query>) -> Option<Query> {
    match url_query {
        Some(query) if !query.is_empty() => Some(query),
        _ => options_query,
    }
}

/// Everything the transport needs to perform one exchange.
///
/// Built by the orchestrator; immutable once handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    /// Request method
    pub method: Method,
    /// Canonical absolute URL
    pub url: String,
    /// Request headers, in order
    pub headers: Vec<(String, String)>,
    /// Request body
    pub body: Option<String>,
    /// Ask for a compressed response
    pub compress: bool,
    /// Decode the response body as JSON
    pub convert_json: bool,
}

impl RequestDescriptor {
    /// Build a descriptor from a call's parts.
    ///
    /// The URL is parsed strictly, the query precedence rule of
    /// [`merge_query`] is applied, and the URL is re-rendered canonically.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::InvalidUrl`] if `url` does not parse.
    pub fn new(method: Method, url: &str, options: RequestOptions) -> Result<Self, RequestError> {
        let parsed = parse_url(url)?;
        let query = merge_query(parsed.query, options.query);
        let url = build_url(
            parsed.scheme,
            &parsed.host,
            parsed.port,
            Some(&parsed.path),
            query.as_ref(),
        );

        Ok(Self {
            method,
            url,
            headers: options.headers,
            body: options.body,
            compress: options.compress,
            convert_json: options.convert_json,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Panics: test failures
mod tests {
    use super::*;

    #[test]
    fn test_call_shapes_normalize() {
        let (method, url, options) = Call::from("http://a.test/").into_parts();
        assert_eq!((method, url.as_str()), (Method::Get, "http://a.test/"));
        assert_eq!(options, RequestOptions::default());

        let with = RequestOptions::new().convert_json(true);
        let (method, _, options) = Call::from(("http://a.test/", with.clone())).into_parts();
        assert_eq!(method, Method::Get);
        assert_eq!(options, with);

        let (method, _, _) = Call::from((Method::Delete, "http://a.test/", RequestOptions::new())).into_parts();
        assert_eq!(method, Method::Delete);
    }

    #[test]
    fn test_url_query_beats_options_query() {
        let url_query = Query::new().with("from", "url");
        let options_query = Query::new().with("from", "options");

        assert_eq!(
            merge_query(Some(url_query.clone()), Some(options_query.clone())),
            Some(url_query)
        );
        assert_eq!(merge_query(None, Some(options_query.clone())), Some(options_query.clone()));
        assert_eq!(merge_query(Some(Query::new()), Some(options_query.clone())), Some(options_query));
        assert_eq!(merge_query(None, None), None);
    }

    #[test]
    fn test_descriptor_applies_options_query() {
        let options = RequestOptions::new().query_param("page", "2").header("x-id", "7");
        let descriptor = RequestDescriptor::new(Method::Get, "http://api.test:80/items", options).unwrap();

        assert_eq!(descriptor.url, "http://api.test/items?page=2");
        assert_eq!(descriptor.headers, vec![("x-id".to_string(), "7".to_string())]);
    }

    #[test]
    fn test_descriptor_keeps_url_query() {
        let options = RequestOptions::new().query_param("page", "2");
        let descriptor = RequestDescriptor::new(Method::Get, "http://api.test/items?page=1", options).unwrap();

        assert_eq!(descriptor.url, "http://api.test/items?page=1");
    }

    #[test]
    fn test_descriptor_rejects_bad_url() {
        let result = RequestDescriptor::new(Method::Get, "not a url", RequestOptions::new());
        assert!(matches!(result, Err(RequestError::InvalidUrl { .. })));
    }
}

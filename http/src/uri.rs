//! Building and parsing request URLs.
//!
//! [`build_url`] renders a canonical URL from its parts: default ports are
//! dropped, the path defaults to `/`, and query pairs are percent-encoded and
//! joined with `&` in caller order.
//!
//! [`parse_url`] is strict. It is backed by a real URI parser and refuses
//! anything that is not an `http`/`https` URL with a host, instead of returning
//! partially filled parts.

use crate::error::RequestError;
use std::fmt;
use std::str::FromStr;

/// Supported URL schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// Plain HTTP, default port 80
    Http,

    /// HTTP over TLS, default port 443
    Https,
}

impl Scheme {
    /// Port used when a URL does not name one.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Http => 80,
            Self::Https => 443,
        }
    }

    /// Lowercase scheme name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scheme {
    type Err = RequestError;

    fn from_str(scheme: &str) -> Result<Self, Self::Err> {
        if scheme.eq_ignore_ascii_case("http") {
            Ok(Self::Http)
        } else if scheme.eq_ignore_ascii_case("https") {
            Ok(Self::Https)
        } else {
            Err(RequestError::invalid_url(
                scheme,
                format!("unsupported scheme {scheme:?}"),
            ))
        }
    }
}

/// Ordered query parameters.
///
/// Order is preserved exactly as inserted; rendering never sorts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query(Vec<(String, String)>);

impl Query {
    /// Create an empty query.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a parameter.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    /// Append a parameter, builder style.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    /// First value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Iterate over the parameters in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check whether there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render as `key=value&key=value` with every key and value
    /// percent-encoded.
    #[must_use]
    pub fn encode(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Query {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Compose a URL from its parts.
///
/// - `port` is omitted when absent or equal to the scheme default
/// - `path` defaults to `/` and gains a leading `/` if it lacks one
/// - `query` is appended only when non-empty
///
/// # Example
///
/// ```
/// use promissory_http::{build_url, Query, Scheme};
///
/// let query = Query::new().with("q", "1");
/// let url = build_url(Scheme::Https, "example.com", Some(443), Some("/a"), Some(&query));
/// assert_eq!(url, "https://example.com/a?q=1");
/// ```
#[must_use]
pub fn build_url(
    scheme: Scheme,
    host: &str,
    port: Option<u16>,
    path: Option<&str>,
    query: Option<&Query>,
) -> String {
    let mut url = format!("{scheme}://{host}");

    if let Some(port) = port.filter(|port| *port != scheme.default_port()) {
        url.push(':');
        url.push_str(&port.to_string());
    }

    match path {
        Some(path) if path.starts_with('/') => url.push_str(path),
        Some(path) if !path.is_empty() => {
            url.push('/');
            url.push_str(path);
        },
        _ => url.push('/'),
    }

    if let Some(query) = query.filter(|query| !query.is_empty()) {
        url.push('?');
        url.push_str(&query.encode());
    }

    url
}

/// Parts of a parsed URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUrl {
    /// URL scheme
    pub scheme: Scheme,
    /// Host name or address
    pub host: String,
    /// Explicit port, `None` when absent or equal to the scheme default
    pub port: Option<u16>,
    /// Path, `/` when the URL has none
    pub path: String,
    /// Decoded query parameters, `None` when the URL has no query
    pub query: Option<Query>,
}

impl ParsedUrl {
    /// Port the request will connect to.
    #[must_use]
    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or_else(|| self.scheme.default_port())
    }
}

impl fmt::Display for ParsedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&build_url(
            self.scheme,
            &self.host,
            self.port,
            Some(&self.path),
            self.query.as_ref(),
        ))
    }
}

/// Split a URL into scheme, host, port, path, and query.
///
/// # Errors
///
/// Returns [`RequestError::InvalidUrl`] when the input is not a valid absolute
/// URL, uses a scheme other than `http`/`https`, has no host, or carries
/// credentials (`user:password@`). Credentials are never silently dropped;
/// send them in an `authorization` header instead.
///
/// # Example
///
/// ```
/// use promissory_http::{parse_url, Scheme};
///
/// let url = parse_url("http://host.com:8080/path?x=1")?;
/// assert_eq!(url.scheme, Scheme::Http);
/// assert_eq!(url.host, "host.com");
/// assert_eq!(url.port, Some(8080));
/// assert_eq!(url.path, "/path");
/// assert_eq!(url.query.as_ref().and_then(|q| q.get("x")), Some("1"));
/// # Ok::<(), promissory_http::RequestError>(())
/// ```
pub fn parse_url(input: &str) -> Result<ParsedUrl, RequestError> {
    let url = ::url::Url::parse(input.trim())
        .map_err(|error| RequestError::invalid_url(input, error.to_string()))?;

    let scheme = url
        .scheme()
        .parse::<Scheme>()
        .map_err(|_| RequestError::invalid_url(input, format!("unsupported scheme {:?}", url.scheme())))?;

    let host = url
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| RequestError::invalid_url(input, "missing host"))?;

    if !url.username().is_empty() || url.password().is_some() {
        return Err(RequestError::invalid_url(
            input,
            "credentials in URL are not supported",
        ));
    }

    let path = match url.path() {
        "" => "/".to_string(),
        path => path.to_string(),
    };

    let query = url
        .query()
        .filter(|query| !query.is_empty())
        .map(|_| url.query_pairs().collect::<Query>());

    Ok(ParsedUrl {
        scheme,
        host: host.to_string(),
        port: url.port(),
        path,
        query,
    })
}

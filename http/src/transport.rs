//! The host networking facility.
//!
//! The orchestrator only needs one capability from the network: send a
//! [`RequestDescriptor`] and get back a [`RawResponse`] or a
//! [`TransportError`]. Status codes are not interpreted here.

use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::request::{Method, RequestDescriptor};
use crate::response::RawResponse;
use futures::future::LocalBoxFuture;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

/// Asynchronous HTTP transport abstraction.
///
/// The returned future runs as a cooperative task on the request's scheduler,
/// so it does not need to be `Send`.
///
/// # Implementations
///
/// - [`ReqwestTransport`]: production implementation using `reqwest`
/// - `MockTransport` in `promissory-testing`: scripted responses for tests
pub trait Transport {
    /// Perform one exchange.
    ///
    /// Implementations buffer the whole body. Any status code, including
    /// 4xx and 5xx, is a successful exchange at this level.
    fn send(
        &self,
        request: RequestDescriptor,
    ) -> LocalBoxFuture<'static, Result<RawResponse, TransportError>>;
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => Self::GET,
            Method::Post => Self::POST,
            Method::Put => Self::PUT,
            Method::Delete => Self::DELETE,
            Method::Head => Self::HEAD,
            Method::Options => Self::OPTIONS,
        }
    }
}

/// Production transport using `reqwest`.
///
/// Holds two clients sharing one configuration: one that negotiates gzip
/// compression and transparently decodes it, one that does not. The
/// descriptor's `compress` flag picks between them.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    plain: reqwest::Client,
    compressed: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with [`ClientConfig::default`].
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Config`] if the TLS backend cannot be
    /// initialized.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_config(&ClientConfig::default())
    }

    /// Create a transport with explicit settings.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Config`] if a configured header name or value
    /// is invalid or the client cannot be built.
    pub fn with_config(config: &ClientConfig) -> Result<Self, TransportError> {
        let headers = header_map(&config.headers)?;
        let builder = || {
            let builder = reqwest::Client::builder()
                .user_agent(config.user_agent.as_str())
                .default_headers(headers.clone());
            match config.timeout {
                Some(timeout) => builder.timeout(timeout),
                None => builder,
            }
        };

        Ok(Self {
            plain: builder().gzip(false).build()?,
            compressed: builder().gzip(true).build()?,
        })
    }
}

impl Transport for ReqwestTransport {
    fn send(
        &self,
        request: RequestDescriptor,
    ) -> LocalBoxFuture<'static, Result<RawResponse, TransportError>> {
        let client = if request.compress {
            self.compressed.clone()
        } else {
            self.plain.clone()
        };

        Box::pin(async move {
            let mut builder = client.request(request.method.into(), &request.url);
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let response = builder.send().await?;

            let status = response.status();
            let headers = header_pairs(response.headers());

            // Bodies are buffered; no streaming.
            let body = response.text().await?;

            Ok(RawResponse {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("Unknown").to_string(),
                headers,
                body,
            })
        })
    }
}

/// Response headers as ordered name/value pairs.
///
/// Values that are not valid UTF-8 are decoded lossily rather than dropped.
fn header_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}

fn header_map(headers: &[(String, String)]) -> Result<HeaderMap, TransportError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TransportError::Config(format!("header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| TransportError::Config(format!("header value {value:?}: {e}")))?;
        map.append(name, value);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_conversion() {
        assert_eq!(reqwest::Method::from(Method::Get), reqwest::Method::GET);
        assert_eq!(reqwest::Method::from(Method::Options), reqwest::Method::OPTIONS);
    }

    #[test]
    fn test_invalid_default_header_is_config_error() {
        let config = ClientConfig::default().with_header("bad header", "x");
        let result = ReqwestTransport::with_config(&config);
        assert!(matches!(result, Err(TransportError::Config(_))));
    }

    #[test]
    fn test_header_pairs_keep_non_ascii_values() {
        let mut headers = HeaderMap::new();
        headers.append("x-plain", HeaderValue::from_static("ascii"));
        if let Ok(value) = HeaderValue::from_bytes("café".as_bytes()) {
            headers.append("x-name", value);
        }
        if let Ok(value) = HeaderValue::from_bytes(b"a\xffb") {
            headers.append("x-raw", value);
        }

        let mut pairs = header_pairs(&headers);
        pairs.sort();
        assert_eq!(
            pairs,
            vec![
                ("x-name".to_string(), "café".to_string()),
                ("x-plain".to_string(), "ascii".to_string()),
                ("x-raw".to_string(), "a\u{fffd}b".to_string()),
            ]
        );
    }

    #[test]
    fn test_transport_builds_with_defaults() {
        assert!(ReqwestTransport::new().is_ok());
    }
}

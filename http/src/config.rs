//! Transport configuration.

use std::time::Duration;

/// Environment variable holding the request timeout in seconds.
pub const TIMEOUT_ENV: &str = "PROMISSORY_HTTP_TIMEOUT_SECS";

/// Environment variable holding the `User-Agent` header value.
pub const USER_AGENT_ENV: &str = "PROMISSORY_HTTP_USER_AGENT";

/// Settings applied to every request sent by a
/// [`ReqwestTransport`](crate::ReqwestTransport).
///
/// # Default Values
///
/// - `user_agent`: `promissory/<crate version>`
/// - `timeout`: none
/// - `headers`: none
///
/// # Example
///
/// ```
/// use promissory_http::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::default()
///     .with_timeout(Duration::from_secs(10))
///     .with_header("accept", "application/json");
/// assert_eq!(config.timeout, Some(Duration::from_secs(10)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// `User-Agent` header value
    pub user_agent: String,
    /// Whole-request timeout
    pub timeout: Option<Duration>,
    /// Headers sent with every request
    pub headers: Vec<(String, String)>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("promissory/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: None,
            headers: Vec::new(),
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by [`TIMEOUT_ENV`] and [`USER_AGENT_ENV`] when set.
    ///
    /// A timeout that is not a whole number of seconds is ignored with a
    /// warning.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(user_agent) = std::env::var(USER_AGENT_ENV) {
            config.user_agent = user_agent;
        }

        if let Ok(raw) = std::env::var(TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(seconds) => config.timeout = Some(Duration::from_secs(seconds)),
                Err(error) => {
                    tracing::warn!(value = %raw, %error, "Ignoring invalid {TIMEOUT_ENV}");
                },
            }
        }

        config
    }

    /// Set the `User-Agent` header value.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the whole-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Add a header sent with every request.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

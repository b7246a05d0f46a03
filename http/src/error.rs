//! Error types for the request orchestrator

use thiserror::Error;

/// Failures reported by a [`Transport`](crate::Transport).
///
/// These are transport-level failures only; a response with an error status
/// code is not a transport failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Could not connect to the remote host
    #[error("Connection failed: {0}")]
    Connect(String),

    /// The request timed out
    #[error("Request timed out")]
    Timeout,

    /// The request could not be sent or the response not read
    #[error("Request failed: {0}")]
    Request(String),

    /// The transport was misconfigured
    #[error("Invalid transport configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_connect() {
            Self::Connect(error.to_string())
        } else if error.is_builder() {
            Self::Config(error.to_string())
        } else {
            Self::Request(error.to_string())
        }
    }
}

/// Rejection payload of a request's deferred value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// The URL could not be parsed or is not an http(s) URL with a host
    #[error("Invalid URL {url:?}: {reason}")]
    InvalidUrl {
        /// The offending input
        url: String,
        /// Why it was refused
        reason: String,
    },

    /// The server answered with a status in `400..=511`
    ///
    /// Displays as the bare status message.
    #[error("{message}")]
    Status {
        /// Numeric status code
        status: u16,
        /// Status reason phrase
        message: String,
    },

    /// The transport failed before a response was received
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The body could not be decoded as JSON
    #[error("Response parsing failed: {0}")]
    Decode(String),
}

impl RequestError {
    pub(crate) fn invalid_url(url: &str, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    /// Status code for [`RequestError::Status`] failures.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_displays_message() {
        let error = RequestError::Status {
            status: 404,
            message: "Not Found".to_string(),
        };
        assert_eq!(error.to_string(), "Not Found");
        assert_eq!(error.status(), Some(404));
    }

    #[test]
    fn test_transport_error_is_transparent() {
        let error = RequestError::from(TransportError::Timeout);
        assert_eq!(error.to_string(), "Request timed out");
        assert_eq!(error.status(), None);
    }
}

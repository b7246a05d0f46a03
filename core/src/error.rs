//! Default rejection type for deferred values.

use thiserror::Error;

/// Error carried by a rejected [`Deferred`](crate::Deferred) when the caller
/// does not pick its own error type.
///
/// A plain message, cheap to clone because every subscriber of a rejected
/// value receives its own copy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct Rejection {
    message: String,
}

impl Rejection {
    /// Create a rejection with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The rejection message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&str> for Rejection {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for Rejection {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_displays_message() {
        let rejection = Rejection::from("boom");
        assert_eq!(rejection.to_string(), "boom");
        assert_eq!(rejection.message(), "boom");
    }
}

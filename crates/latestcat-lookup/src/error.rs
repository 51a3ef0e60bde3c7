//! Lookup error types.

use thiserror::Error;

/// Errors that prevent a lookup from producing an answer.
///
/// Every variant is a transport-level failure: the service was not reached,
/// or its reply could not be understood. A clean "no such software" answer is
/// not an error (see [`crate::LookupResult`]).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// Configured endpoint is not a valid URL.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Connection or request failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Request exceeded the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// Endpoint answered with a non-success HTTP status.
    #[error("unexpected status: {0}")]
    Status(u16),

    /// Response body is not a valid GraphQL response.
    #[error("malformed response: {0}")]
    Decode(String),

    /// Endpoint returned GraphQL errors and no data.
    #[error("graphql error: {0}")]
    Graphql(String),
}

impl LookupError {
    /// Short stable label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidEndpoint(_) => "invalid_endpoint",
            Self::Transport(_) => "transport",
            Self::Timeout => "timeout",
            Self::Status(_) => "status",
            Self::Decode(_) => "decode",
            Self::Graphql(_) => "graphql",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_error_display() {
        assert_eq!(LookupError::Status(502).to_string(), "unexpected status: 502");
        assert_eq!(LookupError::Timeout.to_string(), "request timed out");
        assert_eq!(
            LookupError::Decode("expected value".into()).to_string(),
            "malformed response: expected value"
        );
    }

    #[test]
    fn kind_labels_are_distinct() {
        let errors = [
            LookupError::InvalidEndpoint(String::new()),
            LookupError::Transport(String::new()),
            LookupError::Timeout,
            LookupError::Status(500),
            LookupError::Decode(String::new()),
            LookupError::Graphql(String::new()),
        ];
        let mut kinds: Vec<_> = errors.iter().map(LookupError::kind).collect();
        kinds.sort_unstable();
        kinds.dedup();
        assert_eq!(kinds.len(), errors.len());
    }
}

//! Error types for the streaming pipeline and point lookups.

use thiserror::Error;

/// Errors that can occur while consuming an NDJSON stream.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The server answered with a non-2xx status.
    #[error("Stream failed: HTTP {status}")]
    Http { status: u16 },

    /// The response carried no body to read from.
    #[error("Stream failed: response has no body")]
    MissingBody,

    /// The request could not be sent (connection refused, DNS, TLS, ...).
    #[error("Connect error: {0}")]
    Connect(String),

    /// Reading the next chunk of the body failed mid-stream.
    #[error("Read error: {0}")]
    Read(String),

    /// A single line could not be parsed as JSON. Scoped to that line only.
    #[error("Malformed record {line:?}: {source}")]
    Malformed {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    /// The session was cancelled by its owner.
    #[error("Stream cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

impl StreamError {
    /// Returns `true` for connection-level failures that end the session.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Http { .. } | Self::MissingBody | Self::Connect(_) | Self::Read(_)
        )
    }

    /// Returns `true` for errors scoped to a single record; the stream keeps going.
    pub fn is_record_level(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }

    /// Returns `true` if this error is the cancellation marker itself.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Errors from a single-entity point lookup.
///
/// A `404`/`410` is not an error: it is reported as
/// [`LookupOutcome::NotFound`](crate::lookup::LookupOutcome::NotFound).
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Invalid identifier: {raw:?}")]
    InvalidId { raw: String },

    #[error("HTTP {status}")]
    Http { status: u16 },

    #[error("Request error: {0}")]
    Request(String),

    #[error("Deserialization error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Errors from loading or validating [`ExplorerConfig`](crate::config::ExplorerConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config field '{field}': {reason}")]
    Invalid { field: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(StreamError::Http { status: 502 }.is_transport());
        assert!(StreamError::MissingBody.is_transport());
        assert!(StreamError::Read("reset".into()).is_transport());
        assert!(!StreamError::Cancelled.is_transport());

        let bad = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let malformed = StreamError::Malformed { line: "{".into(), source: bad };
        assert!(malformed.is_record_level());
        assert!(!malformed.is_transport());
    }

    #[test]
    fn http_message_includes_status() {
        assert_eq!(StreamError::Http { status: 503 }.to_string(), "Stream failed: HTTP 503");
    }
}

//! Error types for agent calls and discovery operations.

use thiserror::Error;

/// Result of a single call to the discovery agent.
///
/// Three outcomes: the payload, a [`BackendError::Rejected`] response, or a
/// [`BackendError::Transport`] failure. Callers must handle all of them.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Fault below the HTTP status line.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection, TLS, timeout or protocol failure.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Success response whose body could not be decoded.
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// Socket-level failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failed agent call.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The agent answered with a non-success status.
    #[error("{method} {url} rejected with status {status}: {message}")]
    Rejected {
        /// HTTP verb of the call.
        method: String,
        /// Full URL of the call.
        url: String,
        /// Response status code.
        status: u16,
        /// Response body, or the status reason when the body was empty.
        message: String,
    },

    /// The agent could not be reached or its answer could not be read.
    #[error("{method} {url} failed: {source}")]
    Transport {
        /// HTTP verb of the call.
        method: String,
        /// Full URL of the call.
        url: String,
        /// Underlying cause.
        #[source]
        source: TransportError,
    },
}

impl BackendError {
    /// Build a rejection.
    pub fn rejected(
        method: impl Into<String>,
        url: impl Into<String>,
        status: u16,
        message: impl Into<String>,
    ) -> Self {
        Self::Rejected {
            method: method.into(),
            url: url.into(),
            status,
            message: message.into(),
        }
    }

    /// Build a transport failure.
    pub fn transport(
        method: impl Into<String>,
        url: impl Into<String>,
        source: impl Into<TransportError>,
    ) -> Self {
        Self::Transport {
            method: method.into(),
            url: url.into(),
            source: source.into(),
        }
    }

    /// Whether the agent was unreachable or unreadable.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Whether the agent answered with an error status.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    /// Response status, for rejections.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            Self::Transport { .. } => None,
        }
    }
}

/// Service discovery errors
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("No free port left above 65535 on host {host}")]
    PortExhausted { host: String },

    #[error("Registration task failed: {0}")]
    Task(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl DiscoveryError {
    /// Agent error behind this failure, if any.
    pub fn backend(&self) -> Option<&BackendError> {
        match self {
            Self::Backend(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_rejection_display() {
        let err = BackendError::rejected(
            "PUT",
            "http://localhost:8500/v1/agent/service/deregister/orders-1",
            500,
            "Unknown service ID",
        );

        assert!(err.is_rejection());
        assert!(!err.is_transport());
        assert_eq!(err.status(), Some(500));

        let display = err.to_string();
        assert!(display.contains("PUT"));
        assert!(display.contains("orders-1"));
        assert!(display.contains("500"));
        assert!(display.contains("Unknown service ID"));
    }

    #[test]
    fn test_transport_keeps_source() {
        let err = BackendError::transport(
            "GET",
            "http://localhost:8500/v1/agent/services",
            io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
        );

        assert!(err.is_transport());
        assert_eq!(err.status(), None);
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_discovery_error_wraps_backend() {
        let err: DiscoveryError = BackendError::rejected("GET", "u", 503, "down").into();
        assert_eq!(err.backend().and_then(BackendError::status), Some(503));
        assert!(err.to_string().contains("503"));

        let err = DiscoveryError::PortExhausted {
            host: "10.0.0.5".to_string(),
        };
        assert!(err.backend().is_none());
        assert!(err.to_string().contains("10.0.0.5"));
    }
}

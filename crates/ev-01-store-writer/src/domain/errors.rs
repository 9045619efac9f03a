//! # Domain Errors
//!
//! `StoreError` is what an adapter reports for one request; `WriterError` is
//! what the writer reports after its retry policy gave up.

use thiserror::Error;

/// Failure of a single store request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("Store unreachable: {0}")]
    Connection(String),

    /// The request did not complete in time.
    #[error("Store request timed out")]
    Timeout,

    /// The store failed to process a valid request (5xx).
    #[error("Store error (HTTP {status}): {body}")]
    Server { status: u16, body: String },

    /// The store refused the request as a whole (4xx).
    #[error("Store rejected request (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    /// Create raced with another creator.
    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    /// The response could not be understood.
    #[error("Unexpected store response: {0}")]
    Decode(String),
}

impl StoreError {
    /// Whether repeating the same request may succeed.
    ///
    /// Connectivity, timeouts, 5xx and 429 are retryable; other 4xx are not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Timeout | Self::Server { .. } => true,
            Self::Rejected { status, .. } => *status == 429,
            Self::AlreadyExists(_) | Self::Decode(_) => false,
        }
    }
}

/// Errors surfaced by the store writer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WriterError {
    /// The bulk write failed as a whole.
    #[error("Bulk write of {documents} document(s) failed after {attempts} attempt(s): {source}")]
    WriteFailed {
        documents: usize,
        attempts: u32,
        #[source]
        source: StoreError,
    },

    /// Index or lifecycle policy could not be provisioned.
    #[error("Store initialization failed: {0}")]
    Initialization(#[source] StoreError),

    /// A read (count, search) failed.
    #[error("Store query failed: {0}")]
    Query(#[source] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        assert!(StoreError::Connection("refused".into()).is_retryable());
        assert!(StoreError::Timeout.is_retryable());
        assert!(StoreError::Server {
            status: 503,
            body: String::new()
        }
        .is_retryable());
        assert!(StoreError::Rejected {
            status: 429,
            body: String::new()
        }
        .is_retryable());
        assert!(!StoreError::Rejected {
            status: 400,
            body: String::new()
        }
        .is_retryable());
        assert!(!StoreError::Decode("bad".into()).is_retryable());
    }

    #[test]
    fn test_write_failed_display() {
        let err = WriterError::WriteFailed {
            documents: 100,
            attempts: 4,
            source: StoreError::Timeout,
        };
        assert_eq!(
            err.to_string(),
            "Bulk write of 100 document(s) failed after 4 attempt(s): Store request timed out"
        );
    }
}

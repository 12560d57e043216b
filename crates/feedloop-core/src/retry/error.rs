//! Transport error type for retry classification.

use thiserror::Error;

/// Error returned by a single feed call (list, create, delete, read) or by
/// the auth session while fetching tokens.
///
/// The first three variants are transport faults and go through the retry
/// policy. `Unexpected` is anything else (a defect, a decoding problem) and
/// is never retried.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The backing service answered with a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Api { status: u16, message: String },
    /// The call timed out (connect or read).
    #[error("request timed out: {0}")]
    Timeout(String),
    /// Network-level failure (connection refused/reset, DNS).
    #[error("connection failed: {0}")]
    Connection(String),
    /// Error outside the transport taxonomy.
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl FeedError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        FeedError::Api {
            status,
            message: message.into(),
        }
    }

    /// HTTP status carried by an `Api` error.
    pub fn status(&self) -> Option<u16> {
        match self {
            FeedError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unexpected(&self) -> bool {
        matches!(self, FeedError::Unexpected(_))
    }
}

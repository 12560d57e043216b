use thiserror::Error;

use crate::retry::FeedError;

/// Errors surfaced by `FeedLoop`.
#[derive(Debug, Error)]
pub enum FeedLoopError {
    #[error("feed loop is already running")]
    AlreadyRunning,
    #[error("feed loop is not running")]
    NotRunning,
    #[error(transparent)]
    Feed(#[from] FeedError),
}

impl FeedLoopError {
    /// The underlying feed error, if any.
    pub fn feed_error(&self) -> Option<&FeedError> {
        match self {
            FeedLoopError::Feed(e) => Some(e),
            _ => None,
        }
    }
}

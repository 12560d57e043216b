//! Classify feed errors into retry policy error kinds.

use crate::retry::error::FeedError;
use crate::retry::policy::ErrorKind;

/// Classify an HTTP status code for retry decisions.
///
/// 400 is what the feed service answers when a feed id is no longer valid,
/// so it maps to `StaleFeed`. Callers that cannot recreate a feed treat it
/// like `Other`.
pub fn classify_http_status(code: u16) -> ErrorKind {
    match code {
        400 => ErrorKind::StaleFeed,
        401 => ErrorKind::Unauthorized,
        429 | 503 => ErrorKind::Throttled,
        500..=599 => ErrorKind::Http5xx(code),
        _ => ErrorKind::Other,
    }
}

/// Classify a feed error into an ErrorKind.
pub fn classify(e: &FeedError) -> ErrorKind {
    match e {
        FeedError::Api { status, .. } => classify_http_status(*status),
        FeedError::Timeout(_) => ErrorKind::Timeout,
        FeedError::Connection(_) => ErrorKind::Connection,
        FeedError::Unexpected(_) => ErrorKind::Unexpected,
    }
}

//! Retry and backoff policy.
//!
//! This module encapsulates error classification (stale feed, unauthorized,
//! throttling, timeouts, connection failures) and backoff decisions so that
//! the feed lifecycle manager and the poll loop share a consistent policy.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{classify, classify_http_status};
pub use error::FeedError;
pub use policy::{Backoff, BackoffKind, ErrorKind, Jitter, RetryDecision, RetryPolicy};
pub use run::run_with_retry;

//! Retry loop: run an async feed call until success or policy says stop.

use std::future::Future;

use super::classify;
use super::error::FeedError;
use super::policy::{ErrorKind, RetryDecision, RetryPolicy};
use crate::feed::AuthSession;

/// Runs `f` until it succeeds or the retry policy says to stop.
///
/// `f` is called once per attempt and must fetch fresh tokens each time.
/// On `Unauthorized` the auth session is refreshed before the policy is
/// consulted, so the refresh consumes the attempt. A stale-feed answer is
/// returned as-is: only the read path can recreate a feed.
/// On retryable failure, sleeps for the backoff duration then tries again.
pub async fn run_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    auth: &dyn AuthSession,
    op: &'static str,
    mut f: F,
) -> Result<T, FeedError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FeedError>>,
{
    let mut attempt = 1u32;
    loop {
        let e = match f().await {
            Ok(v) => return Ok(v),
            Err(e) => e,
        };
        let kind = classify::classify(&e);
        if kind == ErrorKind::StaleFeed {
            return Err(e);
        }
        if kind == ErrorKind::Unauthorized {
            tracing::debug!(op, attempt, "session unauthorized, refreshing");
            auth.refresh().await?;
        }
        match policy.decide(attempt, kind) {
            RetryDecision::NoRetry => {
                tracing::debug!(op, attempt, error = %e, "giving up");
                return Err(e);
            }
            RetryDecision::RetryAfter(d) => {
                tracing::warn!(op, attempt, delay_ms = d.as_millis() as u64, error = %e, "retrying");
                tokio::time::sleep(d).await;
                attempt += 1;
            }
        }
    }
}

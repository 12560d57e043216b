//! Shared helpers for feed loop integration tests.

pub mod listeners;

use feedloop_core::event::{Event, EventType};
use feedloop_core::feed::memory::{InMemoryDatafeed, StaticAuth};
use feedloop_core::retry::RetryPolicy;
use feedloop_core::{FeedLoop, FeedLoopOptions};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

pub fn message(n: u32) -> Event {
    Event::new(EventType::MessageSent, "alice", json!({ "n": n }))
}

pub fn auth() -> Arc<StaticAuth> {
    Arc::new(StaticAuth::new("session-token", "km-token"))
}

/// Loop with immediate retries: `read_attempts` for reads, one attempt for lifecycle calls.
pub fn feed_loop(service: &Arc<InMemoryDatafeed>, read_attempts: u32) -> Arc<FeedLoop> {
    Arc::new(FeedLoop::new(
        service.clone(),
        auth(),
        FeedLoopOptions {
            lifecycle_retry: RetryPolicy::immediate(1),
            read_retry: RetryPolicy::immediate(read_attempts),
            bot_username: Some("bot".into()),
            ..FeedLoopOptions::default()
        },
    ))
}

/// Polls `cond` every millisecond; panics after five seconds.
pub async fn wait_until(what: &str, cond: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !cond() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {}", what);
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

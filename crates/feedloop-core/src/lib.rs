//! Resumable long-poll event consumer.
//!
//! A [`engine::FeedLoop`] owns one server-side feed, reads it with a
//! resumable cursor, recreates it when the service reports it stale, and
//! fans decoded events out to subscribed listeners.

pub mod config;
pub mod logging;

pub mod engine;
pub mod event;
pub mod feed;
pub mod listener;
pub mod retry;

pub use engine::{FeedLoop, FeedLoopError, FeedLoopOptions, LoopState, StopHandle};
pub use listener::{DispatchContext, ListenerId, RealTimeEventListener};

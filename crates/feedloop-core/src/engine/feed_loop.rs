//! The consumption engine.

use std::sync::Arc;
use tokio::sync::{watch, Mutex};

use super::control::StopHandle;
use super::error::FeedLoopError;
use super::state::LoopState;
use crate::config::FeedLoopConfig;
use crate::event::Event;
use crate::feed::{AuthSession, DatafeedApi, FeedDiscovery, FeedHandle, FeedManager, SessionTokens};
use crate::listener::{DispatchContext, ListenerId, ListenerRegistry, RealTimeEventListener};
use crate::retry::{classify, ErrorKind, FeedError, RetryDecision, RetryPolicy};

/// Construction parameters for `FeedLoop`.
#[derive(Debug, Clone)]
pub struct FeedLoopOptions {
    /// Policy for list/create/delete calls.
    pub lifecycle_retry: RetryPolicy,
    /// Policy for reads, including stale-feed recreation.
    pub read_retry: RetryPolicy,
    /// Events initiated by this user are filtered by default listeners.
    pub bot_username: Option<String>,
    /// Where the feed to resume comes from.
    pub discovery: FeedDiscovery,
}

impl Default for FeedLoopOptions {
    fn default() -> Self {
        Self {
            lifecycle_retry: RetryPolicy::default(),
            read_retry: RetryPolicy::unbounded(),
            bot_username: None,
            discovery: FeedDiscovery::Listed,
        }
    }
}

impl TryFrom<&FeedLoopConfig> for FeedLoopOptions {
    type Error = anyhow::Error;

    fn try_from(cfg: &FeedLoopConfig) -> anyhow::Result<Self> {
        Ok(Self {
            lifecycle_retry: cfg.lifecycle_policy(),
            read_retry: cfg.read_policy(),
            bot_username: cfg.bot_username.clone(),
            discovery: cfg.datafeed.discovery()?,
        })
    }
}

/// Long-poll consumer of a single feed.
///
/// One read-dispatch cycle runs at a time: a batch is fully dispatched
/// before the next read is issued, and `stop` waits for the in-flight cycle
/// instead of cancelling it. The feed handle is owned by the loop; the only
/// other writer is `recreate_feed`, which takes the same lock as the read.
/// Observers see a copy published after every change, so `handle()` never
/// waits on a long poll.
pub struct FeedLoop {
    manager: FeedManager,
    read_policy: RetryPolicy,
    bot_username: Option<String>,
    listeners: ListenerRegistry,
    handle: Mutex<Option<FeedHandle>>,
    published: watch::Sender<Option<FeedHandle>>,
    state: watch::Sender<LoopState>,
    stop: StopHandle,
}

impl FeedLoop {
    pub fn new(
        api: Arc<dyn DatafeedApi>,
        auth: Arc<dyn AuthSession>,
        options: FeedLoopOptions,
    ) -> Self {
        let (state, _rx) = watch::channel(LoopState::Idle);
        let (published, _rx) = watch::channel(None);
        Self {
            manager: FeedManager::new(api, auth, options.lifecycle_retry)
                .with_discovery(options.discovery),
            read_policy: options.read_retry,
            bot_username: options.bot_username,
            listeners: ListenerRegistry::new(),
            handle: Mutex::new(None),
            published,
            state,
            stop: StopHandle::new(),
        }
    }

    pub fn state(&self) -> LoopState {
        *self.state.borrow()
    }

    /// Receiver for observing state transitions.
    pub fn watch_state(&self) -> watch::Receiver<LoopState> {
        self.state.subscribe()
    }

    /// Copy of the current feed handle (None unless running or stopping),
    /// as of the last completed read or recreation.
    pub fn handle(&self) -> Option<FeedHandle> {
        self.published.borrow().clone()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }

    pub fn subscribe(&self, listener: Arc<dyn RealTimeEventListener>) -> ListenerId {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Acquires a feed and runs the read-dispatch cycle until `stop` is
    /// observed (Ok) or a fatal error occurs (Err). On a fatal error the
    /// listeners are deregistered before the error is returned.
    pub async fn start(&self) -> Result<(), FeedLoopError> {
        let began = self.state.send_if_modified(|s| {
            if !s.can_start() {
                return false;
            }
            self.stop.reset();
            *s = LoopState::Starting;
            true
        });
        if !began {
            return Err(FeedLoopError::AlreadyRunning);
        }
        tracing::debug!("starting feed loop");
        let mut guard = RunGuard { feed_loop: self, armed: true };

        let handle = match self.manager.acquire().await {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(error = %e, "could not acquire a feed");
                guard.armed = false;
                self.state.send_replace(LoopState::Stopped);
                return Err(e.into());
            }
        };
        tracing::info!(feed_id = %handle.id, "feed loop running");
        *self.handle.lock().await = Some(handle.clone());
        self.state.send_modify(|s| {
            *s = LoopState::Running;
            self.published.send_replace(Some(handle));
        });

        let result = self.run_loop().await;
        self.finish(&result).await;
        guard.armed = false;
        result
    }

    /// Requests shutdown and waits until the loop has stopped. An in-flight
    /// read and its dispatch complete first. Returns immediately when the
    /// loop is not running. Must not be awaited from a listener handler;
    /// use `DispatchContext::stop_loop` there.
    pub async fn stop(&self) {
        self.stop.request();
        self.state.send_if_modified(|s| {
            if *s == LoopState::Running {
                *s = LoopState::Stopping;
                true
            } else {
                false
            }
        });
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(|s| s.can_start()).await;
    }

    /// Replaces the current feed with a new one with an empty
    /// cursor. Waits for an in-flight read to finish first.
    pub async fn recreate_feed(&self) -> Result<FeedHandle, FeedLoopError> {
        if !self.state().has_feed() {
            return Err(FeedLoopError::NotRunning);
        }
        let mut guard = self.handle.lock().await;
        let handle = guard.as_mut().ok_or(FeedLoopError::NotRunning)?;
        *handle = self.manager.recreate(handle).await?;
        self.published.send_replace(Some(handle.clone()));
        Ok(handle.clone())
    }

    async fn run_loop(&self) -> Result<(), FeedLoopError> {
        loop {
            if self.stop.is_requested() {
                self.state.send_replace(LoopState::Stopping);
                tracing::debug!("stop requested, leaving feed loop");
                return Ok(());
            }

            let events = {
                let mut guard = self.handle.lock().await;
                let handle = guard.as_mut().ok_or(FeedLoopError::NotRunning)?;
                let events = self.read_with_recovery(handle).await?;
                self.published.send_replace(Some(handle.clone()));
                events
            };

            if let Some(events) = events.filter(|events| !events.is_empty()) {
                self.dispatch(&events).await;
            }
        }
    }

    /// One read, retried per the read policy. Returns None when a stop was
    /// requested while waiting between attempts.
    async fn read_with_recovery(
        &self,
        handle: &mut FeedHandle,
    ) -> Result<Option<Vec<Event>>, FeedError> {
        let mut attempt = 1u32;
        loop {
            let e = match self.read_once(handle).await {
                Ok(events) => return Ok(Some(events)),
                Err(e) => e,
            };
            let kind = classify(&e);
            // Recovery runs before the budget check: a single-attempt policy
            // still recreates a stale feed once before failing.
            match kind {
                ErrorKind::StaleFeed => {
                    tracing::warn!(feed_id = %handle.id, attempt, "feed is stale, recreating");
                    *handle = self.manager.recreate(handle).await?;
                }
                ErrorKind::Unauthorized => {
                    tracing::debug!(attempt, "session unauthorized, refreshing");
                    self.manager.refresh_auth().await?;
                }
                _ => {}
            }
            match self.read_policy.decide(attempt, kind) {
                RetryDecision::NoRetry => {
                    tracing::error!(feed_id = %handle.id, attempt, error = %e, "feed read failed");
                    return Err(e);
                }
                RetryDecision::RetryAfter(_) if self.stop.is_requested() => {
                    tracing::debug!(error = %e, "stop requested, not retrying feed read");
                    return Ok(None);
                }
                RetryDecision::RetryAfter(delay) => {
                    tracing::warn!(
                        feed_id = %handle.id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying feed read"
                    );
                    tokio::select! {
                        biased;
                        _ = self.stop.requested() => {
                            tracing::debug!("stop requested during read backoff");
                            return Ok(None);
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// Fresh tokens, one read, cursor advanced before anything is dispatched.
    async fn read_once(&self, handle: &mut FeedHandle) -> Result<Vec<Event>, FeedError> {
        let tokens = SessionTokens::fetch(self.manager.auth()).await?;
        let batch = self
            .manager
            .api()
            .read_feed(&handle.id, &handle.cursor, &tokens)
            .await?;
        handle.advance(batch.ack_id);
        Ok(batch.events)
    }

    async fn dispatch(&self, events: &[Event]) {
        let ctx = DispatchContext::new(self.stop.clone(), self.bot_username.clone());
        let report = self.listeners.dispatch(events, &ctx).await;
        tracing::debug!(
            events = events.len(),
            delivered = report.delivered,
            failed = report.failed,
            unknown = report.unknown,
            "batch dispatched"
        );
        if report.stop_requested {
            tracing::info!("listener requested stop");
        }
    }

    async fn finish(&self, result: &Result<(), FeedLoopError>) {
        self.state.send_if_modified(|s| {
            if *s == LoopState::Running {
                *s = LoopState::Stopping;
                true
            } else {
                false
            }
        });
        if let Err(e) = result {
            let dropped = self.listeners.clear();
            tracing::warn!(error = %e, listeners = dropped, "feed loop failed, listeners deregistered");
        }
        *self.handle.lock().await = None;
        self.state.send_modify(|s| {
            self.published.send_replace(None);
            *s = LoopState::Stopped;
        });
        tracing::info!("feed loop stopped");
    }
}

/// Moves the loop to `Stopped` if `start` unwinds or its future is dropped
/// before reaching `finish`.
struct RunGuard<'a> {
    feed_loop: &'a FeedLoop,
    armed: bool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let fl = self.feed_loop;
        tracing::warn!("feed loop abandoned before it could stop");
        if let Ok(mut handle) = fl.handle.try_lock() {
            *handle = None;
        }
        fl.state.send_modify(|s| {
            fl.published.send_replace(None);
            *s = LoopState::Stopped;
        });
    }
}

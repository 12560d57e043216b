//! Acquire, recreate and discard the server-side feed.

use std::fmt;
use std::sync::Arc;

use super::api::{AuthSession, DatafeedApi, FeedDescriptor, SessionTokens};
use super::handle::FeedHandle;
use super::store::FeedIdStore;
use crate::retry::{run_with_retry, FeedError, RetryPolicy};

/// How the feed to resume is found on start.
#[derive(Clone, Default)]
pub enum FeedDiscovery {
    /// Adopt the first feed the service lists for the session.
    #[default]
    Listed,
    /// Resume the id kept in a store. The service has no list call, so the
    /// id of every created feed is saved, and replaced feeds are not deleted.
    Stored(Arc<dyn FeedIdStore>),
}

impl fmt::Debug for FeedDiscovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedDiscovery::Listed => f.write_str("Listed"),
            FeedDiscovery::Stored(_) => f.write_str("Stored"),
        }
    }
}

/// Owns the collaborators needed to manage feeds. Every network call goes
/// through `run_with_retry` with fresh tokens per attempt.
pub struct FeedManager {
    api: Arc<dyn DatafeedApi>,
    auth: Arc<dyn AuthSession>,
    policy: RetryPolicy,
    discovery: FeedDiscovery,
}

impl FeedManager {
    pub fn new(api: Arc<dyn DatafeedApi>, auth: Arc<dyn AuthSession>, policy: RetryPolicy) -> Self {
        Self {
            api,
            auth,
            policy,
            discovery: FeedDiscovery::Listed,
        }
    }

    pub fn with_discovery(mut self, discovery: FeedDiscovery) -> Self {
        self.discovery = discovery;
        self
    }

    pub fn api(&self) -> &dyn DatafeedApi {
        &*self.api
    }

    pub fn auth(&self) -> &dyn AuthSession {
        &*self.auth
    }

    /// Resumes an existing feed (cursor reset to empty), or creates one when
    /// there is none to resume.
    pub async fn acquire(&self) -> Result<FeedHandle, FeedError> {
        let existing = match &self.discovery {
            FeedDiscovery::Listed => self.list().await?.into_iter().next().map(|f| f.id),
            FeedDiscovery::Stored(store) => store.load().map_err(FeedError::Unexpected)?,
        };
        if let Some(id) = existing {
            tracing::info!(feed_id = %id, "adopting existing feed");
            return Ok(FeedHandle::new(id));
        }
        let feed = self.create().await?;
        tracing::info!(feed_id = %feed.id, "created feed");
        Ok(FeedHandle::new(feed.id))
    }

    /// Replaces `old` with a fresh feed.
    ///
    /// With a listing service the old feed is deleted first; a failed delete
    /// is logged and ignored, only a failed create fails the recreation.
    pub async fn recreate(&self, old: &FeedHandle) -> Result<FeedHandle, FeedError> {
        if matches!(self.discovery, FeedDiscovery::Listed) {
            if let Err(e) = self.delete(&old.id).await {
                tracing::warn!(feed_id = %old.id, error = %e, "failed to delete feed, continuing");
            }
        }
        let feed = self.create().await?;
        tracing::info!(old_feed_id = %old.id, feed_id = %feed.id, "recreated feed");
        Ok(FeedHandle::new(feed.id))
    }

    pub async fn refresh_auth(&self) -> Result<(), FeedError> {
        self.auth.refresh().await
    }

    async fn list(&self) -> Result<Vec<FeedDescriptor>, FeedError> {
        let (api, auth) = (self.api(), self.auth());
        run_with_retry(&self.policy, auth, "list_feeds", || async move {
            let tokens = SessionTokens::fetch(auth).await?;
            api.list_feeds(&tokens).await
        })
        .await
    }

    async fn create(&self) -> Result<FeedDescriptor, FeedError> {
        let (api, auth) = (self.api(), self.auth());
        let feed = run_with_retry(&self.policy, auth, "create_feed", || async move {
            let tokens = SessionTokens::fetch(auth).await?;
            api.create_feed(&tokens).await
        })
        .await?;
        if let FeedDiscovery::Stored(store) = &self.discovery {
            store.save(&feed.id).map_err(FeedError::Unexpected)?;
        }
        Ok(feed)
    }

    async fn delete(&self, feed_id: &str) -> Result<(), FeedError> {
        let (api, auth) = (self.api(), self.auth());
        run_with_retry(&self.policy, auth, "delete_feed", || async move {
            let tokens = SessionTokens::fetch(auth).await?;
            api.delete_feed(feed_id, &tokens).await
        })
        .await
    }
}

//! Contracts of the transport/auth collaborator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::event::EventBatch;
use crate::retry::FeedError;

/// Source of authentication material. Tokens may expire at any time, so
/// callers fetch them again for every attempt instead of caching them.
#[async_trait]
pub trait AuthSession: Send + Sync {
    async fn session_token(&self) -> Result<String, FeedError>;
    async fn key_manager_token(&self) -> Result<String, FeedError>;
    /// Re-authenticate after the service rejected the current session.
    async fn refresh(&self) -> Result<(), FeedError>;
}

/// Tokens for a single call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTokens {
    pub session_token: String,
    pub key_manager_token: String,
}

impl SessionTokens {
    pub async fn fetch(auth: &dyn AuthSession) -> Result<Self, FeedError> {
        Ok(Self {
            session_token: auth.session_token().await?,
            key_manager_token: auth.key_manager_token().await?,
        })
    }
}

/// A server-side feed as listed or created by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedDescriptor {
    pub id: String,
}

/// The four feed operations of the backing service.
#[async_trait]
pub trait DatafeedApi: Send + Sync {
    /// Feeds visible to the caller's identity, in service order.
    async fn list_feeds(&self, tokens: &SessionTokens) -> Result<Vec<FeedDescriptor>, FeedError>;
    async fn create_feed(&self, tokens: &SessionTokens) -> Result<FeedDescriptor, FeedError>;
    async fn delete_feed(&self, feed_id: &str, tokens: &SessionTokens) -> Result<(), FeedError>;
    /// Long-poll read: suspends until events are available or the service
    /// answers with an empty batch.
    async fn read_feed(
        &self,
        feed_id: &str,
        ack_id: &str,
        tokens: &SessionTokens,
    ) -> Result<EventBatch, FeedError>;
}

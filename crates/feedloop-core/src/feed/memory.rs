//! Scripted in-process feed service.
//!
//! Plays back a `FeedScript` (pre-existing feeds plus an ordered list of read
//! outcomes) and records every call. Once the script is drained, reads wait
//! `idle_delay` and return an empty batch with the cursor unchanged, like a
//! long poll that timed out on the server.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use super::api::{AuthSession, DatafeedApi, FeedDescriptor, SessionTokens};
use super::store::FeedIdStore;
use crate::event::{Event, EventBatch};
use crate::retry::FeedError;

/// One scripted answer to a read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScriptedRead {
    Batch {
        ack_id: String,
        #[serde(default)]
        events: Vec<Event>,
    },
    Error {
        status: u16,
        #[serde(default)]
        message: String,
    },
    Timeout,
    Connection,
    Unexpected {
        message: String,
    },
}

impl ScriptedRead {
    pub fn batch(ack_id: &str, events: Vec<Event>) -> Self {
        ScriptedRead::Batch {
            ack_id: ack_id.to_string(),
            events,
        }
    }

    pub fn status(status: u16) -> Self {
        ScriptedRead::Error {
            status,
            message: String::new(),
        }
    }

    fn into_result(self) -> Result<EventBatch, FeedError> {
        match self {
            ScriptedRead::Batch { ack_id, events } => Ok(EventBatch { ack_id, events }),
            ScriptedRead::Error { status, message } => Err(FeedError::api(status, message)),
            ScriptedRead::Timeout => Err(FeedError::Timeout("scripted timeout".into())),
            ScriptedRead::Connection => Err(FeedError::Connection("scripted reset".into())),
            ScriptedRead::Unexpected { message } => {
                Err(FeedError::Unexpected(anyhow::anyhow!(message)))
            }
        }
    }
}

/// Script loaded from JSON by `feedloop replay`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedScript {
    #[serde(default)]
    pub existing_feeds: Vec<String>,
    #[serde(default)]
    pub reads: Vec<ScriptedRead>,
}

/// Feed operations, for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedOp {
    List,
    Create,
    Delete,
}

/// A recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedCall {
    List,
    Create { feed_id: String },
    Delete { feed_id: String },
    Read { feed_id: String, ack_id: String },
}

#[derive(Default)]
struct State {
    feeds: Vec<String>,
    reads: VecDeque<ScriptedRead>,
    failures: HashMap<FeedOp, VecDeque<u16>>,
    calls: Vec<FeedCall>,
    next_feed: u32,
}

pub struct InMemoryDatafeed {
    state: Mutex<State>,
    list_delay: Duration,
    read_delay: Duration,
    idle_delay: Duration,
}

impl Default for InMemoryDatafeed {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDatafeed {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            list_delay: Duration::ZERO,
            read_delay: Duration::ZERO,
            idle_delay: Duration::from_millis(5),
        }
    }

    pub fn with_existing_feeds<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let service = Self::new();
        service.lock().feeds = ids.into_iter().map(Into::into).collect();
        service
    }

    pub fn from_script(script: FeedScript) -> Self {
        let service = Self::with_existing_feeds(script.existing_feeds);
        service.lock().reads = script.reads.into();
        service
    }

    /// Delay before `list_feeds` answers.
    pub fn with_list_delay(mut self, delay: Duration) -> Self {
        self.list_delay = delay;
        self
    }

    /// Delay applied to every scripted read before it answers.
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = delay;
        self
    }

    pub fn with_idle_delay(mut self, delay: Duration) -> Self {
        self.idle_delay = delay;
        self
    }

    pub fn push_read(&self, read: ScriptedRead) {
        self.lock().reads.push_back(read);
    }

    /// Make the next call of `op` fail with `status`. Failures queue up.
    pub fn fail_next(&self, op: FeedOp, status: u16) {
        self.lock().failures.entry(op).or_default().push_back(status);
    }

    pub fn calls(&self) -> Vec<FeedCall> {
        self.lock().calls.clone()
    }

    pub fn reads(&self) -> Vec<(String, String)> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                FeedCall::Read { feed_id, ack_id } => Some((feed_id.clone(), ack_id.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn read_count(&self) -> usize {
        self.reads().len()
    }

    pub fn feeds(&self) -> Vec<String> {
        self.lock().feeds.clone()
    }

    /// True once every scripted read has been served.
    pub fn is_drained(&self) -> bool {
        self.lock().reads.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn injected_failure(state: &mut State, op: FeedOp) -> Option<FeedError> {
        let status = state.failures.get_mut(&op)?.pop_front()?;
        Some(FeedError::api(status, format!("injected {:?} failure", op)))
    }
}

#[async_trait]
impl DatafeedApi for InMemoryDatafeed {
    async fn list_feeds(&self, _tokens: &SessionTokens) -> Result<Vec<FeedDescriptor>, FeedError> {
        if !self.list_delay.is_zero() {
            tokio::time::sleep(self.list_delay).await;
        }
        let mut state = self.lock();
        state.calls.push(FeedCall::List);
        if let Some(e) = Self::injected_failure(&mut state, FeedOp::List) {
            return Err(e);
        }
        Ok(state
            .feeds
            .iter()
            .map(|id| FeedDescriptor { id: id.clone() })
            .collect())
    }

    async fn create_feed(&self, _tokens: &SessionTokens) -> Result<FeedDescriptor, FeedError> {
        let mut state = self.lock();
        if let Some(e) = Self::injected_failure(&mut state, FeedOp::Create) {
            state.calls.push(FeedCall::Create {
                feed_id: String::new(),
            });
            return Err(e);
        }
        state.next_feed += 1;
        let id = format!("feed-{}", state.next_feed);
        state.feeds.push(id.clone());
        state.calls.push(FeedCall::Create {
            feed_id: id.clone(),
        });
        Ok(FeedDescriptor { id })
    }

    async fn delete_feed(&self, feed_id: &str, _tokens: &SessionTokens) -> Result<(), FeedError> {
        let mut state = self.lock();
        state.calls.push(FeedCall::Delete {
            feed_id: feed_id.to_string(),
        });
        if let Some(e) = Self::injected_failure(&mut state, FeedOp::Delete) {
            return Err(e);
        }
        let before = state.feeds.len();
        state.feeds.retain(|id| id != feed_id);
        if state.feeds.len() == before {
            return Err(FeedError::api(404, format!("feed {} not found", feed_id)));
        }
        Ok(())
    }

    async fn read_feed(
        &self,
        feed_id: &str,
        ack_id: &str,
        _tokens: &SessionTokens,
    ) -> Result<EventBatch, FeedError> {
        let next = {
            let mut state = self.lock();
            state.calls.push(FeedCall::Read {
                feed_id: feed_id.to_string(),
                ack_id: ack_id.to_string(),
            });
            state.reads.pop_front()
        };
        match next {
            Some(read) => {
                if !self.read_delay.is_zero() {
                    tokio::time::sleep(self.read_delay).await;
                }
                read.into_result()
            }
            None => {
                tokio::time::sleep(self.idle_delay).await;
                Ok(EventBatch {
                    ack_id: ack_id.to_string(),
                    events: Vec::new(),
                })
            }
        }
    }
}

/// Feed id store kept in memory.
#[derive(Debug, Default)]
pub struct MemoryFeedIdStore {
    id: Mutex<Option<String>>,
    saves: AtomicU32,
}

impl MemoryFeedIdStore {
    pub fn with_id(id: &str) -> Self {
        Self {
            id: Mutex::new(Some(id.to_string())),
            saves: AtomicU32::new(0),
        }
    }

    pub fn get(&self) -> Option<String> {
        self.id.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn save_count(&self) -> u32 {
        self.saves.load(Ordering::SeqCst)
    }
}

impl FeedIdStore for MemoryFeedIdStore {
    fn load(&self) -> anyhow::Result<Option<String>> {
        Ok(self.get())
    }

    fn save(&self, feed_id: &str) -> anyhow::Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.id.lock().unwrap_or_else(|e| e.into_inner()) = Some(feed_id.to_string());
        Ok(())
    }
}

/// Auth session with fixed tokens that counts fetches and refreshes.
pub struct StaticAuth {
    session_token: String,
    key_manager_token: String,
    fetches: AtomicU32,
    refreshes: AtomicU32,
}

impl StaticAuth {
    pub fn new(session_token: &str, key_manager_token: &str) -> Self {
        Self {
            session_token: session_token.to_string(),
            key_manager_token: key_manager_token.to_string(),
            fetches: AtomicU32::new(0),
            refreshes: AtomicU32::new(0),
        }
    }

    /// Number of session-token fetches (one per attempted call).
    pub fn token_fetch_count(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn refresh_count(&self) -> u32 {
        self.refreshes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthSession for StaticAuth {
    async fn session_token(&self) -> Result<String, FeedError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.session_token.clone())
    }

    async fn key_manager_token(&self) -> Result<String, FeedError> {
        Ok(self.key_manager_token.clone())
    }

    async fn refresh(&self) -> Result<(), FeedError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

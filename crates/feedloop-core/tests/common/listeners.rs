//! Test listeners.

use anyhow::{bail, Result};
use async_trait::async_trait;
use feedloop_core::event::Initiator;
use feedloop_core::{DispatchContext, RealTimeEventListener};
use serde_json::Value;
use std::sync::Mutex;

/// Records the `n` field of every message it sees.
#[derive(Default)]
pub struct Recorder {
    seen: Mutex<Vec<u64>>,
    /// Calls `stop_loop` once this many messages were seen.
    stop_after: Option<usize>,
    fail: bool,
}

impl Recorder {
    pub fn stopping_after(n: usize) -> Self {
        Self {
            stop_after: Some(n),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn seen(&self) -> Vec<u64> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl RealTimeEventListener for Recorder {
    async fn on_message_sent(
        &self,
        ctx: &DispatchContext,
        _initiator: &Initiator,
        body: &Value,
    ) -> Result<()> {
        let count = {
            let mut seen = self.seen.lock().unwrap();
            seen.push(body["n"].as_u64().unwrap_or_default());
            seen.len()
        };
        if self.stop_after.is_some_and(|n| count >= n) {
            ctx.stop_loop();
        }
        if self.fail {
            bail!("recorder configured to fail");
        }
        Ok(())
    }
}

/// Panics on every message.
pub struct Panicking;

#[async_trait]
impl RealTimeEventListener for Panicking {
    async fn on_message_sent(
        &self,
        _ctx: &DispatchContext,
        _initiator: &Initiator,
        _body: &Value,
    ) -> Result<()> {
        panic!("listener bug");
    }
}

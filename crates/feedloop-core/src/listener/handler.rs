//! Listener capability trait: one handler per event type.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use super::context::DispatchContext;
use crate::event::{Event, Initiator};

/// A subscriber to real-time events.
///
/// Every handler defaults to a no-op, so a listener implements only the
/// event types it cares about. A handler error is logged by the registry and
/// does not affect other listeners or events.
#[async_trait]
pub trait RealTimeEventListener: Send + Sync {
    /// Filter applied before routing. By default events initiated by the bot
    /// itself are ignored.
    async fn is_accepting_event(&self, event: &Event, bot_username: Option<&str>) -> bool {
        match (event.initiator_username(), bot_username) {
            (Some(initiator), Some(bot)) => initiator != bot,
            _ => true,
        }
    }

    async fn on_message_sent(
        &self,
        _ctx: &DispatchContext,
        _initiator: &Initiator,
        _body: &Value,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_shared_post(
        &self,
        _ctx: &DispatchContext,
        _initiator: &Initiator,
        _body: &Value,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_instant_message_created(
        &self,
        _ctx: &DispatchContext,
        _initiator: &Initiator,
        _body: &Value,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_room_created(
        &self,
        _ctx: &DispatchContext,
        _initiator: &Initiator,
        _body: &Value,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_room_updated(
        &self,
        _ctx: &DispatchContext,
        _initiator: &Initiator,
        _body: &Value,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_room_deactivated(
        &self,
        _ctx: &DispatchContext,
        _initiator: &Initiator,
        _body: &Value,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_room_reactivated(
        &self,
        _ctx: &DispatchContext,
        _initiator: &Initiator,
        _body: &Value,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_user_requested_to_join_room(
        &self,
        _ctx: &DispatchContext,
        _initiator: &Initiator,
        _body: &Value,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_user_joined_room(
        &self,
        _ctx: &DispatchContext,
        _initiator: &Initiator,
        _body: &Value,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_user_left_room(
        &self,
        _ctx: &DispatchContext,
        _initiator: &Initiator,
        _body: &Value,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_room_member_promoted_to_owner(
        &self,
        _ctx: &DispatchContext,
        _initiator: &Initiator,
        _body: &Value,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_room_member_demoted_from_owner(
        &self,
        _ctx: &DispatchContext,
        _initiator: &Initiator,
        _body: &Value,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_connection_requested(
        &self,
        _ctx: &DispatchContext,
        _initiator: &Initiator,
        _body: &Value,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_connection_accepted(
        &self,
        _ctx: &DispatchContext,
        _initiator: &Initiator,
        _body: &Value,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_symphony_elements_action(
        &self,
        _ctx: &DispatchContext,
        _initiator: &Initiator,
        _body: &Value,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_message_suppressed(
        &self,
        _ctx: &DispatchContext,
        _initiator: &Initiator,
        _body: &Value,
    ) -> Result<()> {
        Ok(())
    }
}

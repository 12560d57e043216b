//! Ordered listener set with snapshot-at-dispatch semantics.

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::context::DispatchContext;
use super::handler::RealTimeEventListener;
use crate::event::{Event, EventType};

/// Identifies a subscription; returned by `subscribe`, accepted by `unsubscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// What happened while dispatching one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Handler invocations that returned Ok.
    pub delivered: usize,
    /// Handler invocations that returned Err or panicked (logged, not propagated).
    pub failed: usize,
    /// Events with a type no handler exists for.
    pub unknown: usize,
    /// (event, listener) pairs rejected by `is_accepting_event`.
    pub filtered: usize,
    /// A handler called `DispatchContext::stop_loop`.
    pub stop_requested: bool,
}

type Entry = (ListenerId, Arc<dyn RealTimeEventListener>);

/// Listeners in subscription order.
///
/// Subscribing or unsubscribing is allowed at any time, including from a
/// handler; a dispatch works on a snapshot taken when it starts, so changes
/// apply from the next batch.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: RwLock<Vec<Entry>>,
    next_id: AtomicU64,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: Arc<dyn RealTimeEventListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.write().push((id, listener));
        tracing::debug!(listener = id.0, "listener subscribed");
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.write();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        let removed = listeners.len() != before;
        if removed {
            tracing::debug!(listener = id.0, "listener unsubscribed");
        }
        removed
    }

    /// Removes every listener and returns how many there were.
    pub fn clear(&self) -> usize {
        let mut listeners = self.write();
        let n = listeners.len();
        listeners.clear();
        n
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Delivers `events` in order to every listener of the snapshot, in
    /// subscription order, one handler at a time.
    pub async fn dispatch(&self, events: &[Event], ctx: &DispatchContext) -> DispatchReport {
        let snapshot: Vec<Entry> = self.read().clone();
        let mut report = DispatchReport::default();

        for event in events {
            let kind = match event.kind() {
                Ok(kind) => kind,
                Err(e) => {
                    tracing::info!(event_id = ?event.id, "{}", e);
                    report.unknown += 1;
                    continue;
                }
            };
            for (id, listener) in &snapshot {
                let delivery = AssertUnwindSafe(async {
                    if !listener.is_accepting_event(event, ctx.bot_username()).await {
                        return None;
                    }
                    Some(route(listener.as_ref(), kind, event, ctx).await)
                })
                .catch_unwind()
                .await;
                match delivery {
                    Ok(None) => report.filtered += 1,
                    Ok(Some(Ok(()))) => report.delivered += 1,
                    Ok(Some(Err(e))) => {
                        tracing::warn!(
                            listener = id.0,
                            event_type = %kind,
                            event_id = ?event.id,
                            error = %format!("{:#}", e),
                            "listener failed to handle event"
                        );
                        report.failed += 1;
                    }
                    Err(panic) => {
                        tracing::warn!(
                            listener = id.0,
                            event_type = %kind,
                            event_id = ?event.id,
                            panic = panic_message(panic.as_ref()),
                            "listener panicked while handling event"
                        );
                        report.failed += 1;
                    }
                }
            }
        }

        report.stop_requested = ctx.stop_requested();
        report
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Entry>> {
        self.listeners.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Entry>> {
        self.listeners.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

async fn route(
    listener: &dyn RealTimeEventListener,
    kind: EventType,
    event: &Event,
    ctx: &DispatchContext,
) -> anyhow::Result<()> {
    let initiator = &event.initiator;
    let body = event.body(kind);
    match kind {
        EventType::MessageSent => listener.on_message_sent(ctx, initiator, body).await,
        EventType::SharedPost => listener.on_shared_post(ctx, initiator, body).await,
        EventType::InstantMessageCreated => {
            listener.on_instant_message_created(ctx, initiator, body).await
        }
        EventType::RoomCreated => listener.on_room_created(ctx, initiator, body).await,
        EventType::RoomUpdated => listener.on_room_updated(ctx, initiator, body).await,
        EventType::RoomDeactivated => listener.on_room_deactivated(ctx, initiator, body).await,
        EventType::RoomReactivated => listener.on_room_reactivated(ctx, initiator, body).await,
        EventType::UserRequestedToJoinRoom => {
            listener.on_user_requested_to_join_room(ctx, initiator, body).await
        }
        EventType::UserJoinedRoom => listener.on_user_joined_room(ctx, initiator, body).await,
        EventType::UserLeftRoom => listener.on_user_left_room(ctx, initiator, body).await,
        EventType::RoomMemberPromotedToOwner => {
            listener.on_room_member_promoted_to_owner(ctx, initiator, body).await
        }
        EventType::RoomMemberDemotedFromOwner => {
            listener.on_room_member_demoted_from_owner(ctx, initiator, body).await
        }
        EventType::ConnectionRequested => {
            listener.on_connection_requested(ctx, initiator, body).await
        }
        EventType::ConnectionAccepted => listener.on_connection_accepted(ctx, initiator, body).await,
        EventType::SymphonyElementsAction => {
            listener.on_symphony_elements_action(ctx, initiator, body).await
        }
        EventType::MessageSuppressed => listener.on_message_suppressed(ctx, initiator, body).await,
    }
}

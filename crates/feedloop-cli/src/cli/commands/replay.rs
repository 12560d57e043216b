//! `feedloop replay <script>` – drive the feed loop over a scripted feed.

use anyhow::{Context, Result};
use async_trait::async_trait;
use feedloop_core::config::FeedLoopConfig;
use feedloop_core::event::{EventType, Initiator};
use feedloop_core::feed::memory::{FeedScript, InMemoryDatafeed, StaticAuth};
use feedloop_core::retry::Backoff;
use feedloop_core::{
    DispatchContext, FeedLoop, FeedLoopOptions, LoopState, RealTimeEventListener,
};
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const DRAIN_POLL: Duration = Duration::from_millis(10);

pub fn load_script(path: &Path) -> Result<FeedScript> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading feed script {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("parsing feed script {}", path.display()))
}

fn options(cfg: &FeedLoopConfig, no_backoff: bool) -> Result<FeedLoopOptions> {
    let mut options = FeedLoopOptions::try_from(cfg)?;
    if no_backoff {
        options.lifecycle_retry.backoff = Backoff::none();
        options.read_retry.backoff = Backoff::none();
    }
    Ok(options)
}

pub async fn run_replay(cfg: &FeedLoopConfig, script_path: &Path, no_backoff: bool) -> Result<()> {
    let script = load_script(script_path)?;
    let scripted_reads = script.reads.len();
    let service = Arc::new(InMemoryDatafeed::from_script(script));
    let auth = Arc::new(StaticAuth::new("replay-session", "replay-km"));
    let feed_loop = Arc::new(FeedLoop::new(
        service.clone(),
        auth,
        options(cfg, no_backoff)?,
    ));
    let printer = Arc::new(Printer::default());
    feed_loop.subscribe(printer.clone());

    let mut state = feed_loop.watch_state();
    let runner = tokio::spawn({
        let feed_loop = feed_loop.clone();
        async move { feed_loop.start().await }
    });

    let _ = state
        .wait_for(|s| matches!(s, LoopState::Running | LoopState::Stopped))
        .await;
    // The last scripted read may still be dispatching; stop() waits for it.
    while !runner.is_finished() && !(service.is_drained() && *state.borrow() == LoopState::Running)
    {
        tokio::time::sleep(DRAIN_POLL).await;
    }
    feed_loop.stop().await;
    let result = runner.await.context("feed loop task panicked")?;

    println!(
        "replayed {} scripted read(s), {} call(s) total, {} event(s) delivered",
        scripted_reads,
        service.calls().len(),
        printer.delivered()
    );
    result.context("feed loop failed")
}

/// Prints every delivered event as one line.
#[derive(Default)]
struct Printer {
    delivered: AtomicUsize,
}

impl Printer {
    fn delivered(&self) -> usize {
        self.delivered.load(Ordering::Relaxed)
    }

    fn print(&self, kind: EventType, initiator: &Initiator, body: &Value) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
        println!("{}", format_line(kind, initiator, body));
    }
}

fn format_line(kind: EventType, initiator: &Initiator, body: &Value) -> String {
    let who = initiator
        .user
        .as_ref()
        .and_then(|u| u.username.as_deref())
        .unwrap_or("-");
    format!("{:<28} {:<16} {}", kind, who, body)
}

macro_rules! print_handlers {
    ($ty:ty { $($method:ident => $kind:ident),* $(,)? }) => {
        #[async_trait]
        impl RealTimeEventListener for $ty {
            $(
                async fn $method(
                    &self,
                    _ctx: &DispatchContext,
                    initiator: &Initiator,
                    body: &Value,
                ) -> Result<()> {
                    self.print(EventType::$kind, initiator, body);
                    Ok(())
                }
            )*
        }
    };
}

print_handlers!(Printer {
    on_message_sent => MessageSent,
    on_shared_post => SharedPost,
    on_instant_message_created => InstantMessageCreated,
    on_room_created => RoomCreated,
    on_room_updated => RoomUpdated,
    on_room_deactivated => RoomDeactivated,
    on_room_reactivated => RoomReactivated,
    on_user_requested_to_join_room => UserRequestedToJoinRoom,
    on_user_joined_room => UserJoinedRoom,
    on_user_left_room => UserLeftRoom,
    on_room_member_promoted_to_owner => RoomMemberPromotedToOwner,
    on_room_member_demoted_from_owner => RoomMemberDemotedFromOwner,
    on_connection_requested => ConnectionRequested,
    on_connection_accepted => ConnectionAccepted,
    on_symphony_elements_action => SymphonyElementsAction,
    on_message_suppressed => MessageSuppressed,
});

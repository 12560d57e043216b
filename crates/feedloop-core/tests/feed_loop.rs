//! Integration tests: the poll loop against the scripted in-memory feed service.

mod common;

use common::listeners::{Panicking, Recorder};
use common::{feed_loop, message, wait_until};
use feedloop_core::feed::memory::{FeedCall, InMemoryDatafeed, MemoryFeedIdStore, ScriptedRead};
use feedloop_core::feed::FeedDiscovery;
use feedloop_core::retry::RetryPolicy;
use feedloop_core::{FeedLoop, FeedLoopError, FeedLoopOptions, LoopState};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn creates(service: &InMemoryDatafeed) -> usize {
    service
        .calls()
        .iter()
        .filter(|c| matches!(c, FeedCall::Create { .. }))
        .count()
}

#[tokio::test]
async fn empty_feed_list_creates_feed_and_reads_from_empty_cursor() {
    let service = Arc::new(InMemoryDatafeed::new());
    service.push_read(ScriptedRead::batch("ack-1", vec![message(1)]));
    service.push_read(ScriptedRead::batch("ack-2", vec![message(2)]));
    let fl = feed_loop(&service, 1);
    let listener = Arc::new(Recorder::stopping_after(2));
    fl.subscribe(listener.clone());

    fl.start().await.unwrap();

    assert_eq!(&service.calls()[..2], &[
        FeedCall::List,
        FeedCall::Create { feed_id: "feed-1".into() },
    ]);
    assert_eq!(
        service.reads(),
        vec![
            ("feed-1".to_string(), String::new()),
            ("feed-1".to_string(), "ack-1".to_string()),
        ]
    );
    assert_eq!(listener.seen(), vec![1, 2]);
    assert_eq!(fl.state(), LoopState::Stopped);
    assert_eq!(fl.handle(), None);
}

#[tokio::test]
async fn existing_feed_is_adopted_with_empty_cursor() {
    let service = Arc::new(InMemoryDatafeed::with_existing_feeds(["feed-old", "feed-other"]));
    service.push_read(ScriptedRead::batch("ack-1", vec![message(1)]));
    let fl = feed_loop(&service, 1);
    fl.subscribe(Arc::new(Recorder::stopping_after(1)));

    fl.start().await.unwrap();

    assert_eq!(service.reads(), vec![("feed-old".to_string(), String::new())]);
    assert_eq!(creates(&service), 0);
}

#[tokio::test]
async fn stale_feed_is_recreated_and_read_retried() {
    let service = Arc::new(InMemoryDatafeed::with_existing_feeds(["faulty"]));
    service.push_read(ScriptedRead::status(400));
    service.push_read(ScriptedRead::batch("ack-1", vec![message(1)]));
    let fl = feed_loop(&service, 2);
    fl.subscribe(Arc::new(Recorder::stopping_after(1)));

    fl.start().await.unwrap();

    assert!(service.calls().contains(&FeedCall::Delete { feed_id: "faulty".into() }));
    assert_eq!(creates(&service), 1);
    assert_eq!(
        service.reads(),
        vec![
            ("faulty".to_string(), String::new()),
            ("feed-1".to_string(), String::new()),
        ]
    );
}

#[tokio::test]
async fn recreation_consumes_an_attempt() {
    let service = Arc::new(InMemoryDatafeed::with_existing_feeds(["faulty"]));
    service.push_read(ScriptedRead::status(400));
    service.push_read(ScriptedRead::status(500));
    let fl = feed_loop(&service, 2);
    fl.subscribe(Arc::new(Recorder::default()));

    let err = fl.start().await.unwrap_err();

    assert_eq!(err.feed_error().and_then(|e| e.status()), Some(500));
    assert_eq!(creates(&service), 1);
    assert_eq!(service.read_count(), 2);
    assert_eq!(service.reads()[1].0, "feed-1");
    assert!(fl.listeners().is_empty(), "listeners are dropped on fatal error");
    assert_eq!(fl.state(), LoopState::Stopped);
}

#[tokio::test]
async fn second_stale_answer_exhausts_the_budget() {
    let service = Arc::new(InMemoryDatafeed::with_existing_feeds(["faulty"]));
    service.push_read(ScriptedRead::status(400));
    service.push_read(ScriptedRead::status(400));
    let fl = feed_loop(&service, 2);

    let err = fl.start().await.unwrap_err();

    assert_eq!(err.feed_error().and_then(|e| e.status()), Some(400));
    assert_eq!(service.read_count(), 2);
    // the final stale answer is still recovered before the budget check fails
    assert_eq!(creates(&service), 2);
}

#[tokio::test]
async fn failing_listener_does_not_stop_the_loop() {
    let service = Arc::new(InMemoryDatafeed::new());
    service.push_read(ScriptedRead::batch("ack-1", vec![message(1)]));
    service.push_read(ScriptedRead::batch("ack-2", vec![message(2)]));
    let fl = feed_loop(&service, 1);
    let failing = Arc::new(Recorder::failing());
    let second = Arc::new(Recorder::stopping_after(2));
    fl.subscribe(failing.clone());
    fl.subscribe(second.clone());

    fl.start().await.unwrap();

    assert_eq!(failing.seen(), vec![1, 2]);
    assert_eq!(second.seen(), vec![1, 2]);
    // cursor advanced even though a handler failed on the first batch
    assert_eq!(service.reads()[1].1, "ack-1");
}

#[tokio::test]
async fn panicking_listener_neither_kills_the_loop_nor_blocks_stop() {
    let service = Arc::new(InMemoryDatafeed::new().with_idle_delay(Duration::from_millis(2)));
    service.push_read(ScriptedRead::batch("ack-1", vec![message(1)]));
    service.push_read(ScriptedRead::batch("ack-2", vec![message(2)]));
    let fl = feed_loop(&service, 1);
    let recorder = Arc::new(Recorder::default());
    fl.subscribe(Arc::new(Panicking));
    fl.subscribe(recorder.clone());

    let runner = tokio::spawn({
        let fl = fl.clone();
        async move { fl.start().await }
    });
    wait_until("both batches", || recorder.seen().len() == 2).await;

    tokio::time::timeout(Duration::from_secs(2), fl.stop())
        .await
        .expect("stop returns");
    runner.await.unwrap().unwrap();
    assert_eq!(fl.state(), LoopState::Stopped);
    assert_eq!(fl.listeners().len(), 2);

    service.push_read(ScriptedRead::batch("ack-3", vec![message(3)]));
    fl.subscribe(Arc::new(Recorder::stopping_after(1)));
    fl.start().await.unwrap();
    assert_eq!(recorder.seen(), vec![1, 2, 3]);
}

#[tokio::test]
async fn dropped_start_future_leaves_the_loop_stopped() {
    let service = Arc::new(InMemoryDatafeed::new().with_idle_delay(Duration::from_millis(2)));
    let fl = feed_loop(&service, 1);

    let outcome = tokio::time::timeout(Duration::from_millis(30), fl.start()).await;

    assert!(outcome.is_err(), "loop keeps running until stopped");
    assert_eq!(fl.state(), LoopState::Stopped);
    assert_eq!(fl.handle(), None);
    assert!(matches!(fl.recreate_feed().await, Err(FeedLoopError::NotRunning)));
}

#[tokio::test]
async fn unexpected_error_propagates_without_retry() {
    let service = Arc::new(InMemoryDatafeed::new());
    service.push_read(ScriptedRead::Unexpected {
        message: "corrupt payload".into(),
    });
    let fl = feed_loop(&service, 5);
    fl.subscribe(Arc::new(Recorder::default()));

    let err = fl.start().await.unwrap_err();

    assert!(err.feed_error().is_some_and(|e| e.is_unexpected()));
    assert_eq!(service.read_count(), 1);
    assert_eq!(creates(&service), 1);
    assert!(!service.calls().iter().any(|c| matches!(c, FeedCall::Delete { .. })));
    assert!(fl.listeners().is_empty());
}

#[tokio::test]
async fn stop_waits_for_in_flight_read_and_its_dispatch() {
    let service = Arc::new(
        InMemoryDatafeed::new().with_read_delay(Duration::from_millis(150)),
    );
    service.push_read(ScriptedRead::batch("ack-1", vec![message(1)]));
    service.push_read(ScriptedRead::batch("ack-2", vec![message(2)]));
    let fl = feed_loop(&service, 1);
    let listener = Arc::new(Recorder::default());
    fl.subscribe(listener.clone());

    let runner = tokio::spawn({
        let fl = fl.clone();
        async move { fl.start().await }
    });
    wait_until("first read", || service.read_count() == 1).await;

    let began = Instant::now();
    fl.stop().await;

    assert!(began.elapsed() >= Duration::from_millis(100));
    assert_eq!(listener.seen(), vec![1], "in-flight batch was dispatched");
    assert_eq!(service.read_count(), 1, "no read after stop");
    assert_eq!(fl.state(), LoopState::Stopped);
    runner.await.unwrap().unwrap();
}

#[tokio::test]
async fn stop_is_idempotent_and_safe_when_idle() {
    let service = Arc::new(InMemoryDatafeed::new());
    let fl = feed_loop(&service, 1);
    fl.stop().await;
    fl.stop().await;
    assert_eq!(fl.state(), LoopState::Idle);
    assert_eq!(service.read_count(), 0);
}

#[tokio::test]
async fn stop_during_acquisition_exits_before_first_read() {
    let service = Arc::new(InMemoryDatafeed::new().with_list_delay(Duration::from_millis(100)));
    service.push_read(ScriptedRead::batch("ack-1", vec![message(1)]));
    let fl = feed_loop(&service, 1);
    let runner = tokio::spawn({
        let fl = fl.clone();
        async move { fl.start().await }
    });
    wait_until("acquisition", || fl.state() == LoopState::Starting).await;

    fl.stop().await;

    assert_eq!(fl.state(), LoopState::Stopped);
    assert_eq!(service.read_count(), 0);
    assert_eq!(creates(&service), 1, "acquisition itself completes");
    runner.await.unwrap().unwrap();
}

#[tokio::test]
async fn stop_before_start_does_not_carry_over() {
    let service = Arc::new(InMemoryDatafeed::new());
    service.push_read(ScriptedRead::batch("ack-1", vec![message(1)]));
    let fl = feed_loop(&service, 1);
    let listener = Arc::new(Recorder::stopping_after(1));
    fl.subscribe(listener.clone());

    fl.stop().await;
    fl.start().await.unwrap();

    assert_eq!(listener.seen(), vec![1]);
    assert_eq!(service.read_count(), 1);
}

#[tokio::test]
async fn handle_is_published_while_running() {
    let service = Arc::new(InMemoryDatafeed::new().with_idle_delay(Duration::from_millis(2)));
    service.push_read(ScriptedRead::batch("ack-1", Vec::new()));
    let fl = feed_loop(&service, 1);
    assert_eq!(fl.handle(), None);
    let runner = tokio::spawn({
        let fl = fl.clone();
        async move { fl.start().await }
    });

    wait_until("cursor published", || {
        fl.handle().is_some_and(|h| h.cursor == "ack-1")
    })
    .await;
    assert!(fl.state().has_feed());
    assert_eq!(fl.handle().map(|h| h.id), Some("feed-1".to_string()));

    fl.stop().await;
    runner.await.unwrap().unwrap();
    assert_eq!(fl.handle(), None);
}

#[tokio::test]
async fn stored_feed_id_is_resumed_and_replaced_on_recreate() {
    let service = Arc::new(InMemoryDatafeed::with_existing_feeds(["kept"]));
    service.push_read(ScriptedRead::status(400));
    service.push_read(ScriptedRead::batch("ack-1", vec![message(1)]));
    let store = Arc::new(MemoryFeedIdStore::with_id("kept"));
    let fl = Arc::new(FeedLoop::new(
        service.clone(),
        common::auth(),
        FeedLoopOptions {
            lifecycle_retry: RetryPolicy::immediate(1),
            read_retry: RetryPolicy::immediate(2),
            discovery: FeedDiscovery::Stored(store.clone()),
            ..FeedLoopOptions::default()
        },
    ));
    fl.subscribe(Arc::new(Recorder::stopping_after(1)));

    fl.start().await.unwrap();

    assert!(!service.calls().iter().any(|c| matches!(c, FeedCall::List | FeedCall::Delete { .. })));
    assert_eq!(service.reads()[0], ("kept".to_string(), String::new()));
    assert_eq!(store.get().as_deref(), Some("feed-1"));
}

#[tokio::test]
async fn start_twice_is_rejected_and_restart_after_stop_works() {
    let service = Arc::new(InMemoryDatafeed::new().with_idle_delay(Duration::from_millis(2)));
    let fl = feed_loop(&service, 1);
    let runner = tokio::spawn({
        let fl = fl.clone();
        async move { fl.start().await }
    });
    wait_until("first read", || service.read_count() >= 1).await;

    assert!(matches!(fl.start().await, Err(FeedLoopError::AlreadyRunning)));
    fl.stop().await;
    fl.stop().await;
    runner.await.unwrap().unwrap();

    service.push_read(ScriptedRead::batch("ack-9", vec![message(9)]));
    fl.subscribe(Arc::new(Recorder::stopping_after(1)));
    fl.start().await.unwrap();
    // the feed created by the first run is adopted again
    assert_eq!(creates(&service), 1);
}

#[tokio::test]
async fn manual_recreate_switches_feed_and_resets_cursor() {
    let service = Arc::new(InMemoryDatafeed::new().with_idle_delay(Duration::from_millis(2)));
    service.push_read(ScriptedRead::batch("ack-1", Vec::new()));
    let fl = feed_loop(&service, 1);
    let runner = tokio::spawn({
        let fl = fl.clone();
        async move { fl.start().await }
    });
    wait_until("scripted read", || service.is_drained()).await;

    let fresh = fl.recreate_feed().await.unwrap();
    assert_eq!(fresh.id, "feed-2");
    assert_eq!(fresh.cursor, "");
    wait_until("read on new feed", || {
        service.reads().iter().any(|(id, _)| id == "feed-2")
    })
    .await;

    fl.stop().await;
    runner.await.unwrap().unwrap();
    assert_eq!(service.feeds(), vec!["feed-2".to_string()]);
    assert!(service
        .reads()
        .iter()
        .filter(|(id, _)| id == "feed-2")
        .all(|(_, ack)| ack.is_empty()));
}

#[tokio::test]
async fn events_from_the_bot_are_not_delivered() {
    let service = Arc::new(InMemoryDatafeed::new());
    let own = feedloop_core::event::Event::new(
        feedloop_core::event::EventType::MessageSent,
        "bot",
        serde_json::json!({ "n": 1 }),
    );
    service.push_read(ScriptedRead::batch("ack-1", vec![own, message(2)]));
    let fl = feed_loop(&service, 1);
    let listener = Arc::new(Recorder::stopping_after(1));
    fl.subscribe(listener.clone());

    fl.start().await.unwrap();

    assert_eq!(listener.seen(), vec![2]);
}

//! End-to-end deduplication tests through the public dispatcher API.
//!
//! All tests run on a paused clock so notice retractions complete instantly
//! and deterministically.
#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{Call, FakeGateway, Updates};
use dedupbot::{
    ConversationId, DeduplicationConfig, DeduplicationStore, Fingerprint, ImageFingerprintMode,
    MessageId, MessagingGateway, Outcome, UpdateDispatcher,
};
use std::sync::Arc;
use std::time::Duration;

const CHAT: i64 = -100_456;
const ALICE: i64 = 123;
const BOB: i64 = 321;

fn dispatcher_with(gateway: &Arc<FakeGateway>, config: &DeduplicationConfig) -> UpdateDispatcher {
    UpdateDispatcher::new(Arc::clone(gateway) as Arc<dyn MessagingGateway>, config).unwrap()
}

fn dispatcher(gateway: &Arc<FakeGateway>) -> UpdateDispatcher {
    dispatcher_with(gateway, &DeduplicationConfig::default())
}

/// Awaits any pending retraction so the call log is complete.
async fn settle(outcome: Outcome) -> Outcome {
    match outcome {
        Outcome::DuplicateHandled(report) => {
            let summary = dedupbot::DuplicateReport {
                original_deleted: report.original_deleted,
                notice_id: report.notice_id,
                retraction: None,
            };
            report.retracted().await;
            Outcome::DuplicateHandled(summary)
        },
        other => other,
    }
}

#[tokio::test(start_paused = true)]
async fn test_repeated_text_runs_full_duplicate_response() {
    let gateway = Arc::new(FakeGateway::new());
    let dispatcher = dispatcher(&gateway);
    let mut updates = Updates::new();

    let first = dispatcher.handle(&updates.text(CHAT, ALICE, "Hello")).await.unwrap();
    assert!(first.is_accepted());
    assert!(gateway.calls().is_empty());

    let repeat = updates.text(CHAT, ALICE, "Hello");
    let second = settle(dispatcher.handle(&repeat).await.unwrap()).await;
    let Outcome::DuplicateHandled(report) = second else {
        panic!("expected duplicate");
    };

    let notice = report.notice_id.unwrap();
    assert!(report.original_deleted);
    assert_eq!(
        gateway.calls(),
        vec![
            Call::Delete(ConversationId::new(CHAT), MessageId::new(2)),
            Call::Send(
                ConversationId::new(CHAT),
                "Duplicate message detected and removed!".to_string()
            ),
            Call::Delete(ConversationId::new(CHAT), notice),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_text_matching_ignores_case_and_whitespace() {
    let gateway = Arc::new(FakeGateway::new());
    let dispatcher = dispatcher(&gateway);
    let mut updates = Updates::new();

    assert!(
        dispatcher
            .handle(&updates.text(CHAT, ALICE, "Test  Message"))
            .await
            .unwrap()
            .is_accepted()
    );
    let outcome = settle(
        dispatcher
            .handle(&updates.text(CHAT, ALICE, "  test message\n"))
            .await
            .unwrap(),
    )
    .await;
    assert!(outcome.is_duplicate());

    // Same words from a different sender are new.
    assert!(
        dispatcher
            .handle(&updates.text(CHAT, BOB, "test message"))
            .await
            .unwrap()
            .is_accepted()
    );
}

#[tokio::test(start_paused = true)]
async fn test_eviction_makes_oldest_content_new_again() {
    let gateway = Arc::new(FakeGateway::new());
    let config = DeduplicationConfig::default().with_max_history(3);
    let dispatcher = dispatcher_with(&gateway, &config);
    let mut updates = Updates::new();

    for text in ["one", "two", "three", "four"] {
        let outcome = dispatcher.handle(&updates.text(CHAT, ALICE, text)).await.unwrap();
        assert!(outcome.is_accepted(), "{text} should be accepted");
    }
    assert_eq!(dispatcher.store().len(), 3);

    // "one" was evicted by "four"; the three most recent are still known.
    assert!(
        dispatcher
            .handle(&updates.text(CHAT, ALICE, "one"))
            .await
            .unwrap()
            .is_accepted()
    );
    let update = updates.text(CHAT, ALICE, "four");
    let outcome = settle(dispatcher.handle(&update).await.unwrap()).await;
    assert!(outcome.is_duplicate());
}

#[tokio::test(start_paused = true)]
async fn test_capacity_two_scenario() {
    let gateway = Arc::new(FakeGateway::new());
    let config = DeduplicationConfig::default().with_max_history(2);
    let dispatcher = dispatcher_with(&gateway, &config);
    let mut updates = Updates::new();

    for text in ["a", "b", "c"] {
        assert!(
            dispatcher
                .handle(&updates.text(CHAT, 1, text))
                .await
                .unwrap()
                .is_accepted()
        );
    }
    assert_eq!(
        dispatcher.store().snapshot(),
        vec![Fingerprint::new("1:text:b"), Fingerprint::new("1:text:c")]
    );

    assert!(
        dispatcher
            .handle(&updates.text(CHAT, 1, "a"))
            .await
            .unwrap()
            .is_accepted()
    );
    let outcome = settle(dispatcher.handle(&updates.text(CHAT, 1, "c")).await.unwrap()).await;
    assert!(outcome.is_duplicate());
    assert_eq!(gateway.sends(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_identical_images_per_sender() {
    let gateway = Arc::new(
        FakeGateway::new()
            .with_image("a-thumb", b"thumb")
            .with_image("a-full", b"\x89PNG same pixels")
            .with_image("b-full", b"\x89PNG same pixels"),
    );
    let dispatcher = dispatcher(&gateway);
    let mut updates = Updates::new();

    let sizes: [(&str, u32, u32); 2] = [("a-thumb", 90, 90), ("a-full", 800, 800)];
    assert!(
        dispatcher
            .handle(&updates.photo(CHAT, ALICE, &sizes))
            .await
            .unwrap()
            .is_accepted()
    );

    // Bob posting the same bytes is independent of Alice.
    assert!(
        dispatcher
            .handle(&updates.photo(CHAT, BOB, &[("b-full", 800, 800)]))
            .await
            .unwrap()
            .is_accepted()
    );

    // Alice re-uploading yields a new file ID but the same bytes.
    let outcome = settle(
        dispatcher
            .handle(&updates.photo(CHAT, ALICE, &[("b-full", 800, 800)]))
            .await
            .unwrap(),
    )
    .await;
    assert!(outcome.is_duplicate());

    // Only the largest variant is ever fetched.
    assert!(!gateway.calls().contains(&Call::Fetch("a-thumb".to_string())));
}

#[tokio::test(start_paused = true)]
async fn test_sha256_image_mode_detects_duplicates() {
    let gateway = Arc::new(FakeGateway::new().with_image("x", b"bytes").with_image("y", b"bytes"));
    let config = DeduplicationConfig::default().with_image_mode(ImageFingerprintMode::Sha256);
    let dispatcher = dispatcher_with(&gateway, &config);
    let mut updates = Updates::new();

    dispatcher
        .handle(&updates.photo(CHAT, ALICE, &[("x", 10, 10)]))
        .await
        .unwrap();
    let outcome = settle(
        dispatcher
            .handle(&updates.photo(CHAT, ALICE, &[("y", 10, 10)]))
            .await
            .unwrap(),
    )
    .await;

    assert!(outcome.is_duplicate());
    let stored = dispatcher.store().snapshot();
    assert_eq!(stored[0].len(), "123:image:".len() + 64);
}

#[tokio::test(start_paused = true)]
async fn test_animation_handles() {
    let gateway = Arc::new(FakeGateway::new());
    let dispatcher = dispatcher(&gateway);
    let mut updates = Updates::new();

    for handle in ["CgACAgQAAx0", "CgACAgQAAx1"] {
        assert!(
            dispatcher
                .handle(&updates.animation(CHAT, ALICE, handle))
                .await
                .unwrap()
                .is_accepted()
        );
    }
    let outcome = settle(
        dispatcher
            .handle(&updates.animation(CHAT, ALICE, "CgACAgQAAx0"))
            .await
            .unwrap(),
    )
    .await;
    assert!(outcome.is_duplicate());
}

#[tokio::test(start_paused = true)]
async fn test_unsupported_updates_have_no_effect() {
    let gateway = Arc::new(FakeGateway::new());
    let dispatcher = dispatcher(&gateway);
    let mut updates = Updates::new();

    for _ in 0..3 {
        let outcome = dispatcher.handle(&updates.empty(CHAT, ALICE)).await.unwrap();
        assert!(outcome.is_ignored());
    }

    assert!(dispatcher.store().is_empty());
    assert!(gateway.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_gateway_failures_do_not_stop_processing() {
    let gateway = Arc::new(FakeGateway::new().failing_send().failing_delete());
    let dispatcher = dispatcher(&gateway);
    let mut updates = Updates::new();

    dispatcher.handle(&updates.text(CHAT, ALICE, "spam")).await.unwrap();
    let update = updates.text(CHAT, ALICE, "spam");
    let outcome = settle(dispatcher.handle(&update).await.unwrap()).await;

    let Outcome::DuplicateHandled(report) = outcome else {
        panic!("expected duplicate");
    };
    assert!(!report.original_deleted);
    assert!(report.notice_id.is_none());

    // The store still remembers the content and later updates are handled.
    assert!(dispatcher.handle(&updates.text(CHAT, ALICE, "spam")).await.unwrap().is_duplicate());
    assert!(dispatcher.handle(&updates.text(CHAT, ALICE, "fresh")).await.unwrap().is_accepted());
}

#[tokio::test(start_paused = true)]
async fn test_notice_lives_for_configured_delay() {
    let gateway = Arc::new(FakeGateway::new());
    let config = DeduplicationConfig::default().with_notice_delay(Duration::from_secs(30));
    let dispatcher = dispatcher_with(&gateway, &config);
    let mut updates = Updates::new();

    dispatcher.handle(&updates.text(CHAT, ALICE, "x")).await.unwrap();
    let report = dispatcher
        .handle(&updates.text(CHAT, ALICE, "x"))
        .await
        .unwrap()
        .into_report()
        .unwrap();

    tokio::time::sleep(Duration::from_secs(29)).await;
    assert_eq!(gateway.deletes().len(), 1);

    report.retracted().await;
    assert_eq!(gateway.deletes().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_shared_store_across_dispatchers() {
    let store = Arc::new(DeduplicationStore::with_capacity(10).unwrap());
    let config = DeduplicationConfig::default();
    let gateway = Arc::new(FakeGateway::new());
    let as_dyn = || Arc::clone(&gateway) as Arc<dyn MessagingGateway>;

    let first = UpdateDispatcher::with_store(as_dyn(), Arc::clone(&store), &config);
    let second = UpdateDispatcher::with_store(as_dyn(), Arc::clone(&store), &config);
    let mut updates = Updates::new();

    assert!(first.handle(&updates.text(CHAT, ALICE, "hi")).await.unwrap().is_accepted());
    let outcome = settle(second.handle(&updates.text(CHAT, ALICE, "hi")).await.unwrap()).await;
    assert!(outcome.is_duplicate());
}

#[tokio::test(start_paused = true)]
async fn test_independent_stores_do_not_share_history() {
    let gateway = Arc::new(FakeGateway::new());
    let first = dispatcher(&gateway);
    let second = dispatcher(&gateway);
    let mut updates = Updates::new();

    assert!(first.handle(&updates.text(CHAT, ALICE, "hi")).await.unwrap().is_accepted());
    assert!(second.handle(&updates.text(CHAT, ALICE, "hi")).await.unwrap().is_accepted());
}

/// The fingerprint does not include the conversation, so the same sender
/// repeating themselves in a different chat is treated as a duplicate. This
/// pins the current per-sender scope; change it only as a product decision.
#[tokio::test(start_paused = true)]
async fn test_duplicate_scope_spans_conversations() {
    let gateway = Arc::new(FakeGateway::new());
    let dispatcher = dispatcher(&gateway);
    let mut updates = Updates::new();

    assert!(
        dispatcher
            .handle(&updates.text(1001, ALICE, "cross-posted"))
            .await
            .unwrap()
            .is_accepted()
    );
    let outcome = settle(
        dispatcher
            .handle(&updates.text(2002, ALICE, "cross-posted"))
            .await
            .unwrap(),
    )
    .await;

    assert!(outcome.is_duplicate());
    assert_eq!(
        gateway.calls()[0],
        Call::Delete(ConversationId::new(2002), MessageId::new(2))
    );
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_identical_updates_yield_one_acceptance() {
    let gateway = Arc::new(FakeGateway::new());
    let dispatcher = Arc::new(dispatcher(&gateway));
    let mut updates = Updates::new();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let dispatcher = Arc::clone(&dispatcher);
            let update = updates.text(CHAT, ALICE, "burst");
            tokio::spawn(async move { dispatcher.handle(&update).await.unwrap() })
        })
        .collect();

    let mut accepted = 0;
    for handle in handles {
        match settle(handle.await.unwrap()).await {
            Outcome::Accepted => accepted += 1,
            Outcome::DuplicateHandled(_) => {},
            Outcome::Ignored => panic!("unexpected ignore"),
        }
    }

    assert_eq!(accepted, 1);
    assert_eq!(gateway.sends(), 7);
    assert_eq!(dispatcher.store().len(), 1);
}

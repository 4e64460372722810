//! Block registry behavior: symmetric gating of sends, directional
//! ownership of rows, idempotence under repeats.

mod common;

use marketplace_chat_service::error::AppError;
use marketplace_chat_service::models::MessageContent;
use marketplace_chat_service::services::block_service::BlockService;
use marketplace_chat_service::services::conversation_service::ConversationService;
use marketplace_chat_service::services::message_service::MessageService;
use uuid::Uuid;

#[tokio::test]
#[ignore = "requires a PostgreSQL database"]
async fn block_gates_sends_in_both_directions_until_unblocked() {
    let state = common::setup_state().await;
    let buyer = Uuid::new_v4();
    let seller = Uuid::new_v4();
    let conv = ConversationService::get_or_create(&state.db, buyer, seller, "Avanza-2020")
        .await
        .unwrap();

    BlockService::block(&state.db, &state.bus, buyer, seller)
        .await
        .unwrap();

    let err = MessageService::append(
        &state.db,
        &state.bus,
        conv.id,
        seller,
        MessageContent::text("Halo"),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    // the blocker cannot send either
    let err = MessageService::append(
        &state.db,
        &state.bus,
        conv.id,
        buyer,
        MessageContent::text("Halo"),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    BlockService::unblock(&state.db, &state.bus, buyer, seller)
        .await
        .unwrap();

    MessageService::append(
        &state.db,
        &state.bus,
        conv.id,
        seller,
        MessageContent::text("Halo"),
    )
    .await
    .unwrap();
    MessageService::append(
        &state.db,
        &state.bus,
        conv.id,
        buyer,
        MessageContent::text("Masih ada?"),
    )
    .await
    .unwrap();
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database"]
async fn self_block_is_rejected() {
    let state = common::setup_state().await;
    let user = Uuid::new_v4();

    let err = BlockService::block(&state.db, &state.bus, user, user)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidOperation(_)));
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database"]
async fn repeated_block_keeps_one_row() {
    let state = common::setup_state().await;
    let blocker = Uuid::new_v4();
    let blocked = Uuid::new_v4();

    BlockService::block(&state.db, &state.bus, blocker, blocked)
        .await
        .unwrap();
    BlockService::block(&state.db, &state.bus, blocker, blocked)
        .await
        .unwrap();

    let rows = BlockService::list_blocked(&state.db, blocker).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].blocked_id, blocked);
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database"]
async fn unblock_removes_only_the_callers_direction() {
    let state = common::setup_state().await;
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();

    BlockService::block(&state.db, &state.bus, a, b).await.unwrap();
    BlockService::block(&state.db, &state.bus, b, a).await.unwrap();

    BlockService::unblock(&state.db, &state.bus, a, b).await.unwrap();

    // b's row survives, and it is the one a cannot lift
    let status = BlockService::is_blocked(&state.db, a, b).await.unwrap();
    assert!(status.blocked);
    assert_eq!(status.blocker_id, Some(b));
    assert!(!status.reversible_by(a));
    assert!(status.reversible_by(b));
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database"]
async fn block_status_prefers_the_first_arguments_own_row() {
    let state = common::setup_state().await;
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();

    BlockService::block(&state.db, &state.bus, a, b).await.unwrap();
    BlockService::block(&state.db, &state.bus, b, a).await.unwrap();

    let from_a = BlockService::is_blocked(&state.db, a, b).await.unwrap();
    assert_eq!(from_a.blocker_id, Some(a));
    let from_b = BlockService::is_blocked(&state.db, b, a).await.unwrap();
    assert_eq!(from_b.blocker_id, Some(b));

    let unrelated = BlockService::is_blocked(&state.db, a, Uuid::new_v4())
        .await
        .unwrap();
    assert!(!unrelated.blocked);
    assert_eq!(unrelated.blocker_id, None);
}

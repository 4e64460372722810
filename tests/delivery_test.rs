//! Delivery tracking and unread aggregation: bulk monotonic mark-read,
//! forward-only semantics under concurrent appends, and count
//! consistency.

mod common;

use marketplace_chat_service::error::AppError;
use marketplace_chat_service::models::MessageContent;
use marketplace_chat_service::services::conversation_service::ConversationService;
use marketplace_chat_service::services::delivery_service::DeliveryService;
use marketplace_chat_service::services::message_service::MessageService;
use marketplace_chat_service::services::unread_service::UnreadService;
use uuid::Uuid;

#[tokio::test]
#[ignore = "requires a PostgreSQL database"]
async fn mark_read_zeroes_unread_and_is_idempotent() {
    let state = common::setup_state().await;
    let buyer = Uuid::new_v4();
    let seller = Uuid::new_v4();
    let conv = ConversationService::get_or_create(&state.db, buyer, seller, "Avanza-2020")
        .await
        .unwrap();

    for body in ["Halo", "Masih ada?", "Nego?"] {
        MessageService::append(
            &state.db,
            &state.bus,
            conv.id,
            seller,
            MessageContent::text(body),
        )
        .await
        .unwrap();
    }
    assert_eq!(
        UnreadService::count_for(&state.db, conv.id, buyer).await.unwrap(),
        3
    );

    let updated = DeliveryService::mark_read(&state.db, &state.bus, conv.id, buyer)
        .await
        .unwrap();
    assert_eq!(updated, 3);
    assert_eq!(
        UnreadService::count_for(&state.db, conv.id, buyer).await.unwrap(),
        0
    );

    // second pass touches nothing
    let updated = DeliveryService::mark_read(&state.db, &state.bus, conv.id, buyer)
        .await
        .unwrap();
    assert_eq!(updated, 0);

    // both flags moved together, and only on the recipient's side
    for message in MessageService::list(&state.db, conv.id).await.unwrap() {
        assert!(message.is_read);
        assert!(message.is_delivered);
    }
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database"]
async fn messages_appended_after_mark_read_stay_unread() {
    let state = common::setup_state().await;
    let buyer = Uuid::new_v4();
    let seller = Uuid::new_v4();
    let conv = ConversationService::get_or_create(&state.db, buyer, seller, "Avanza-2020")
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
    DeliveryService::mark_read(&state.db, &state.bus, conv.id, buyer)
        .await
        .unwrap();

    // seller keeps typing after the buyer's mark-read completed
    for body in ["Unit mulus", "Km rendah", "Bisa TT"] {
        MessageService::append(
            &state.db,
            &state.bus,
            conv.id,
            seller,
            MessageContent::text(body),
        )
        .await
        .unwrap();
    }

    assert_eq!(
        UnreadService::count_for(&state.db, conv.id, buyer).await.unwrap(),
        3
    );

    // the earlier message never reverted
    let history = MessageService::list(&state.db, conv.id).await.unwrap();
    assert!(history[0].is_read);
    assert!(!history[1].is_read);
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database"]
async fn own_messages_never_count_as_unread() {
    let state = common::setup_state().await;
    let buyer = Uuid::new_v4();
    let seller = Uuid::new_v4();
    let conv = ConversationService::get_or_create(&state.db, buyer, seller, "Avanza-2020")
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

    assert_eq!(
        UnreadService::count_for(&state.db, conv.id, buyer).await.unwrap(),
        0
    );
    assert_eq!(
        UnreadService::count_for(&state.db, conv.id, seller).await.unwrap(),
        1
    );
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database"]
async fn total_unread_sums_across_conversations() {
    let state = common::setup_state().await;
    let buyer = Uuid::new_v4();
    let seller_a = Uuid::new_v4();
    let seller_b = Uuid::new_v4();

    let conv_a = ConversationService::get_or_create(&state.db, buyer, seller_a, "Avanza-2020")
        .await
        .unwrap();
    let conv_b = ConversationService::get_or_create(&state.db, buyer, seller_b, "Brio-2021")
        .await
        .unwrap();

    MessageService::append(
        &state.db,
        &state.bus,
        conv_a.id,
        seller_a,
        MessageContent::text("Halo"),
    )
    .await
    .unwrap();
    for body in ["Ready", "Harga nett"] {
        MessageService::append(
            &state.db,
            &state.bus,
            conv_b.id,
            seller_b,
            MessageContent::text(body),
        )
        .await
        .unwrap();
    }

    assert_eq!(UnreadService::total_for(&state.db, buyer).await.unwrap(), 3);

    DeliveryService::mark_read(&state.db, &state.bus, conv_b.id, buyer)
        .await
        .unwrap();
    assert_eq!(UnreadService::total_for(&state.db, buyer).await.unwrap(), 1);
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database"]
async fn mark_read_and_clear_are_participant_only() {
    let state = common::setup_state().await;
    let buyer = Uuid::new_v4();
    let seller = Uuid::new_v4();
    let stranger = Uuid::new_v4();
    let conv = ConversationService::get_or_create(&state.db, buyer, seller, "Avanza-2020")
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

    let err = DeliveryService::mark_read(&state.db, &state.bus, conv.id, stranger)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let err = MessageService::clear(&state.db, conv.id, stranger)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let removed = MessageService::clear(&state.db, conv.id, buyer).await.unwrap();
    assert_eq!(removed, 1);
    assert!(MessageService::list(&state.db, conv.id).await.unwrap().is_empty());
}

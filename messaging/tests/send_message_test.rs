//! Integration tests for sending through [`messaging::MessagingService`].
//!
//! Uses one in-memory SQLite pool shared by the conversation, message and friendship repositories.

mod common;

use std::sync::Arc;

use chat_core::{ChatError, ConversationType};
use chat_storage::{ConversationStore, MessageStore};
use common::{ids, FailingWrites, LostCreateRace, Stack};
use messaging::MessagingService;

/// **Test: first direct message ever creates the pair conversation.**
///
/// **Setup:** No conversation between A and B.
/// **Action:** `send_direct(A, Some(B), "hi", None)`.
/// **Expected:** A direct conversation with exactly {A, B}; B has 1 unread, A has 0;
/// `last_message` is the returned message.
#[tokio::test]
async fn test_first_contact_creates_direct_conversation() {
    let stack = Stack::new().await;
    let service = stack.service();

    let message = service
        .send_direct("alice", Some("bob"), "hi", None)
        .await
        .expect("send");

    let conv = stack.conversation(&message.conversation_id).await;
    assert_eq!(conv.kind, ConversationType::Direct);
    let members: Vec<&str> = conv.participants.iter().map(|p| p.user_id.as_str()).collect();
    assert_eq!(members, vec!["alice", "bob"]);
    assert_eq!(conv.unread_for("bob"), 1);
    assert_eq!(conv.unread_for("alice"), 0);
    assert_eq!(conv.last_message.as_ref().map(|l| l.id.as_str()), Some(message.id.as_str()));
    assert_eq!(conv.last_message_at, message.created_at);
    assert!(conv.seen_by.is_empty());
}

/// **Test: later sends in either direction reuse the pair conversation.**
#[tokio::test]
async fn test_direct_sends_reuse_pair_conversation() {
    let stack = Stack::new().await;
    let service = stack.service();

    let first = service.send_direct("alice", Some("bob"), "one", None).await.unwrap();
    let second = service.send_direct("bob", Some("alice"), "two", None).await.unwrap();
    let third = service
        .send_direct("alice", Some("bob"), "three", Some(&first.conversation_id))
        .await
        .unwrap();

    assert_eq!(first.conversation_id, second.conversation_id);
    assert_eq!(first.conversation_id, third.conversation_id);
    assert_eq!(service.list_conversations("alice").await.unwrap().len(), 1);

    let conv = stack.conversation(&first.conversation_id).await;
    assert_eq!(conv.unread_for("bob"), 2);
    assert_eq!(conv.unread_for("alice"), 0);
    assert_eq!(conv.last_message.unwrap().content, "three");
}

/// **Test: unread counts grow by one per message for each non-sender.**
#[tokio::test]
async fn test_unread_counts_accumulate_until_seen() {
    let stack = Stack::new().await;
    let service = stack.service();

    let mut conversation_id = String::new();
    for i in 0..3 {
        let message = service
            .send_direct("alice", Some("bob"), &format!("m{}", i), None)
            .await
            .unwrap();
        conversation_id = message.conversation_id;
        let conv = stack.conversation(&conversation_id).await;
        assert_eq!(conv.unread_for("bob"), i + 1);
        assert_eq!(conv.unread_for("alice"), 0);
    }

    service.mark_as_seen(&conversation_id, "bob").await.unwrap();
    service.send_direct("alice", Some("bob"), "again", None).await.unwrap();

    assert_eq!(stack.conversation(&conversation_id).await.unread_for("bob"), 1);
}

/// **Test: an unknown conversation id falls back to the pair conversation.**
#[tokio::test]
async fn test_unknown_conversation_id_falls_back_to_pair() {
    let stack = Stack::new().await;
    let service = stack.service();

    let existing = service.send_direct("alice", Some("bob"), "one", None).await.unwrap();
    let message = service
        .send_direct("alice", Some("bob"), "two", Some("does-not-exist"))
        .await
        .unwrap();

    assert_eq!(message.conversation_id, existing.conversation_id);
}

#[tokio::test]
async fn test_unknown_conversation_id_without_recipient_is_not_found() {
    let stack = Stack::new().await;
    let err = stack
        .service()
        .send_direct("alice", None, "hi", Some("does-not-exist"))
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::NotFound(_)));
}

#[tokio::test]
async fn test_direct_without_target_is_missing_conversation() {
    let stack = Stack::new().await;
    let err = stack
        .service()
        .send_direct("alice", None, "hi", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::MissingConversation));
}

#[tokio::test]
async fn test_direct_send_by_conversation_id_only() {
    let stack = Stack::new().await;
    let service = stack.service();
    let first = service.send_direct("alice", Some("bob"), "one", None).await.unwrap();

    let reply = service
        .send_direct("bob", None, "two", Some(&first.conversation_id))
        .await
        .unwrap();

    assert_eq!(reply.conversation_id, first.conversation_id);
    assert_eq!(stack.conversation(&first.conversation_id).await.unread_for("alice"), 1);
}

#[tokio::test]
async fn test_direct_send_rejects_foreign_or_group_conversation() {
    let stack = Stack::new().await;
    let service = stack.service();
    let direct = service.send_direct("alice", Some("bob"), "one", None).await.unwrap();
    let group = service
        .create_conversation("alice", ConversationType::Group, &ids(&["bob"]), Some("g"))
        .await
        .unwrap();

    let outsider = service
        .send_direct("carol", None, "hi", Some(&direct.conversation_id))
        .await
        .unwrap_err();
    let wrong_recipient = service
        .send_direct("alice", Some("carol"), "hi", Some(&direct.conversation_id))
        .await
        .unwrap_err();
    let into_group = service
        .send_direct("alice", Some("bob"), "hi", Some(&group.id))
        .await
        .unwrap_err();

    assert!(matches!(outsider, ChatError::Validation(_)));
    assert!(matches!(wrong_recipient, ChatError::Validation(_)));
    assert!(matches!(into_group, ChatError::Validation(_)));
}

/// **Test: empty content fails before any conversation or message is written.**
#[tokio::test]
async fn test_empty_content_is_rejected_without_side_effects() {
    let stack = Stack::new().await;
    let service = stack.service();

    let err = service.send_direct("alice", Some("bob"), "  ", None).await.unwrap_err();

    assert!(matches!(err, ChatError::Validation(_)));
    assert!(stack
        .conversations
        .find_direct_between("alice", "bob")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_self_direct_message_rejected() {
    let stack = Stack::new().await;
    let err = stack
        .service()
        .send_direct("alice", Some("alice"), "hi", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::Validation(_)));
}

/// **Test: a group message bumps every other member and clears seen-by.**
#[tokio::test]
async fn test_group_send_updates_all_members() {
    let stack = Stack::new().await;
    let service = stack.service();
    let group = service
        .create_conversation("a", ConversationType::Group, &ids(&["b", "c"]), Some("team"))
        .await
        .unwrap();

    let message = service.send_group("a", &group.id, "hello team").await.unwrap();

    let conv = stack.conversation(&group.id).await;
    assert_eq!(conv.last_message.as_ref().unwrap().id, message.id);
    assert_eq!(conv.last_message_at, message.created_at);
    assert_eq!(conv.unread_for("a"), 0);
    assert_eq!(conv.unread_for("b"), 1);
    assert_eq!(conv.unread_for("c"), 1);
    assert!(conv.seen_by.is_empty());
}

#[tokio::test]
async fn test_group_send_to_unknown_conversation() {
    let stack = Stack::new().await;
    let err = stack
        .service()
        .send_group("a", "missing", "hi")
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::NotFound(_)));
}

#[tokio::test]
async fn test_group_send_into_direct_conversation_rejected() {
    let stack = Stack::new().await;
    let service = stack.service();
    let direct = service.send_direct("a", Some("b"), "hi", None).await.unwrap();

    let err = service
        .send_group("a", &direct.conversation_id, "hi")
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::Validation(_)));
}

/// **Test: the message is stored before the conversation update; a failed update surfaces
/// as a persistence error and is not retried.**
#[tokio::test]
async fn test_failed_conversation_update_surfaces_persistence_error() {
    let stack = Stack::new().await;
    let group = stack
        .service()
        .create_conversation("a", ConversationType::Group, &ids(&["b"]), Some("g"))
        .await
        .unwrap();

    let failing = Arc::new(FailingWrites::new(stack.conversations.clone()));
    let service = MessagingService::new(failing.clone(), stack.messages.clone());

    let err = service.send_group("a", &group.id, "hello").await.unwrap_err();

    assert!(matches!(err, ChatError::Persistence(_)));
    assert_eq!(failing.attempts(), 1);
    let page = stack
        .messages
        .list_by_conversation(&group.id, 10, None)
        .await
        .unwrap();
    assert_eq!(page.messages.len(), 1);
    assert!(stack.conversation(&group.id).await.last_message.is_none());
}

#[tokio::test]
async fn test_failed_create_surfaces_persistence_error() {
    let stack = Stack::new().await;
    let failing = Arc::new(FailingWrites::new(stack.conversations.clone()));
    let service = MessagingService::new(failing, stack.messages.clone());

    let err = service
        .send_direct("a", Some("b"), "hello", None)
        .await
        .unwrap_err();

    assert!(matches!(err, ChatError::Persistence(_)));
}

/// **Test: losing the first-contact race reuses the winner's conversation.**
///
/// **Setup:** The pair lookup misses, then `create` reports the pair as taken after the
/// competing conversation was committed.
/// **Action:** `send_direct(alice, Some(bob), "hi", None)`.
/// **Expected:** The message lands in the committed conversation after one re-lookup.
#[tokio::test]
async fn test_concurrent_first_contact_reuses_winner() {
    let stack = Stack::new().await;
    let racing = Arc::new(LostCreateRace::new(stack.conversations.clone(), true));
    let service = MessagingService::new(racing.clone(), stack.messages.clone());

    let message = service
        .send_direct("alice", Some("bob"), "hi", None)
        .await
        .expect("send");

    let winner = stack
        .conversations
        .find_direct_between("alice", "bob")
        .await
        .unwrap()
        .expect("winner committed");
    assert_eq!(message.conversation_id, winner.id);
    assert_eq!(racing.lookups(), 2);
    assert_eq!(stack.conversation(&winner.id).await.unread_for("bob"), 1);
}

/// **Test: a taken pair that still cannot be found is a conflict.**
#[tokio::test]
async fn test_concurrent_first_contact_without_winner_is_conflict() {
    let stack = Stack::new().await;
    let racing = Arc::new(LostCreateRace::new(stack.conversations.clone(), false));
    let service = MessagingService::new(racing.clone(), stack.messages.clone());

    let err = service
        .send_direct("alice", Some("bob"), "hi", None)
        .await
        .unwrap_err();

    assert!(matches!(err, ChatError::Conflict(_)));
    assert_eq!(racing.lookups(), 2);
    assert!(stack.conversations.list_by_participant("alice").await.unwrap().is_empty());
}

/// **Test: ids containing the pair separator never share a direct conversation.**
///
/// **Setup:** "a:b" has messaged "c".
/// **Action:** "a" messages "b:c".
/// **Expected:** A new conversation with exactly {a, b:c}; the first one is untouched.
#[tokio::test]
async fn test_direct_send_with_separator_in_ids_stays_in_own_pair() {
    let stack = Stack::new().await;
    let service = stack.service();

    let first = service.send_direct("a:b", Some("c"), "one", None).await.unwrap();
    let second = service.send_direct("a", Some("b:c"), "two", None).await.unwrap();

    assert_ne!(first.conversation_id, second.conversation_id);
    let conv = stack.conversation(&second.conversation_id).await;
    assert!(conv.has_participant("a"));
    assert!(conv.has_participant("b:c"));
    let untouched = stack.conversation(&first.conversation_id).await;
    assert_eq!(untouched.last_message.as_ref().unwrap().content, "one");
    assert_eq!(untouched.unread_for("c"), 1);
}

//! Seen-tracking routine.

use chat_core::{ChatError, Result, SeenOutcome, SeenStatus};
use chat_storage::ConversationStore;
use tracing::debug;

/// Marks `conversation_id` as seen by `user_id` and reports `{seen_by, my_unread_count}`.
///
/// `NotFound` when the conversation is missing or `user_id` is not one of its participants.
///
/// Nothing is written when the conversation has no message yet or when `user_id` sent
/// the last message; the current state is returned with the matching [`SeenStatus`].
pub async fn mark_as_seen(
    store: &dyn ConversationStore,
    conversation_id: &str,
    user_id: &str,
) -> Result<SeenOutcome> {
    let conversation = store
        .find_by_id(conversation_id)
        .await?
        .ok_or_else(|| ChatError::NotFound(format!("conversation {}", conversation_id)))?;
    if !conversation.has_participant(user_id) {
        return Err(ChatError::NotFound(format!(
            "participant {} in conversation {}",
            user_id, conversation_id
        )));
    }

    let status = match &conversation.last_message {
        None => SeenStatus::NoMessages,
        Some(last) if last.sender_id == user_id => SeenStatus::OwnMessage,
        Some(_) => SeenStatus::Marked,
    };

    if status != SeenStatus::Marked {
        debug!(conversation_id, user_id, ?status, "Nothing to mark as seen");
        return Ok(SeenOutcome::from_conversation(status, &conversation, user_id));
    }

    let updated = store.mark_seen(conversation_id, user_id).await?;
    debug!(conversation_id, user_id, "Marked as seen");
    Ok(SeenOutcome::from_conversation(status, &updated, user_id))
}

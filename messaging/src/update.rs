//! Conversation update routine: side effects of one newly appended message.
//!
//! Must run after the message is stored and before the send reports success, so that a
//! visible message always has an up-to-date conversation summary.

use chat_core::{Conversation, LastMessage, Message, Result};
use chat_storage::ConversationStore;
use tracing::debug;

/// Applies `message` to its conversation in one store write:
///
/// 1. `seen_by` is cleared;
/// 2. `last_message` / `last_message_at` take the message's snapshot and timestamp;
/// 3. the sender's unread count becomes 0, every other participant's grows by 1.
///
/// Returns the conversation as persisted.
pub async fn apply_new_message(
    store: &dyn ConversationStore,
    message: &Message,
) -> Result<Conversation> {
    let snapshot = LastMessage::from(message);
    let conversation = store
        .apply_message(&message.conversation_id, &snapshot)
        .await?;

    debug!(
        conversation_id = %conversation.id,
        message_id = %message.id,
        participants = conversation.participants.len(),
        "Conversation updated after new message"
    );

    Ok(conversation)
}

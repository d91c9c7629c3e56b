//! Store traits for the messaging core. The SQLite repositories implement them;
//! services hold them as `Arc<dyn ...>` so tests can substitute their own.

use async_trait::async_trait;
use chat_core::{Conversation, LastMessage, Message, MessagePage, NewConversation};
use chrono::{DateTime, Utc};

use crate::error::StorageError;

/// Owns conversation records, their participants, unread counters and seen-by sets.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Direct conversation between two users, whatever the argument order.
    async fn find_direct_between(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> Result<Option<Conversation>, StorageError>;

    /// Persists a new conversation. A second direct conversation for the same pair
    /// fails with [`StorageError::AlreadyExists`].
    async fn create(&self, new: &NewConversation) -> Result<Conversation, StorageError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Conversation>, StorageError>;

    /// Conversations the user belongs to, most recent activity first.
    async fn list_by_participant(&self, user_id: &str) -> Result<Vec<Conversation>, StorageError>;

    /// Ids of every conversation the user belongs to.
    async fn conversation_ids_for(&self, user_id: &str) -> Result<Vec<String>, StorageError>;

    /// Adds a member (idempotent) with a zero unread count.
    async fn add_participant(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> Result<Conversation, StorageError>;

    /// Records `last` as the newest message in a single transaction: replaces the
    /// summary, zeroes the sender's counter, increments everyone else's and clears seen-by.
    async fn apply_message(
        &self,
        conversation_id: &str,
        last: &LastMessage,
    ) -> Result<Conversation, StorageError>;

    /// Adds the user to seen-by (idempotent) and zeroes their unread count.
    async fn mark_seen(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> Result<Conversation, StorageError>;
}

/// Append-only message log.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Stores a fully-built message.
    async fn insert(&self, message: &Message) -> Result<(), StorageError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Message>, StorageError>;

    /// Newest-first fetch of `limit + 1` messages at or before `before`; the extra
    /// message becomes `next_cursor` and the returned page is oldest-first.
    async fn list_by_conversation(
        &self,
        conversation_id: &str,
        limit: u32,
        before: Option<DateTime<Utc>>,
    ) -> Result<MessagePage, StorageError>;

    /// Builds and stores a new message; blank content is rejected.
    async fn append(
        &self,
        conversation_id: &str,
        sender_id: &str,
        content: &str,
    ) -> Result<Message, StorageError> {
        if content.trim().is_empty() {
            return Err(StorageError::Invalid(
                "message content must not be empty".to_string(),
            ));
        }
        let message = Message::new(conversation_id, sender_id, content);
        self.insert(&message).await?;
        Ok(message)
    }
}

/// Symmetric friendship pairs.
#[async_trait]
pub trait FriendshipStore: Send + Sync {
    async fn add_friendship(&self, user_a: &str, user_b: &str) -> Result<(), StorageError>;

    async fn are_friends(&self, user_a: &str, user_b: &str) -> Result<bool, StorageError>;
}

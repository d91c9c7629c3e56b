//! Shared fixtures: an in-memory SQLite stack and a conversation store that fails on writes.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chat_core::{Conversation, LastMessage, NewConversation};
use chat_storage::{
    ConversationRepository, ConversationStore, FriendshipRepository, FriendshipStore,
    MessageRepository, SqlitePoolManager, StorageError,
};
use messaging::{AccessGuard, MessagingService};

pub struct Stack {
    pub conversations: Arc<ConversationRepository>,
    pub messages: Arc<MessageRepository>,
    pub friendships: Arc<FriendshipRepository>,
}

impl Stack {
    pub async fn new() -> Self {
        let pool = SqlitePoolManager::new("sqlite::memory:")
            .await
            .expect("Failed to create pool");
        Self {
            conversations: Arc::new(
                ConversationRepository::with_pool(pool.clone())
                    .await
                    .expect("conversation repo"),
            ),
            messages: Arc::new(MessageRepository::with_pool(pool.clone()).await.expect("message repo")),
            friendships: Arc::new(FriendshipRepository::with_pool(pool).await.expect("friend repo")),
        }
    }

    /// Service without access gates.
    pub fn service(&self) -> MessagingService {
        MessagingService::new(self.conversations.clone(), self.messages.clone())
    }

    /// Service enforcing friendship and membership.
    pub fn guarded_service(&self) -> MessagingService {
        let guard = AccessGuard::new(self.friendships.clone(), self.conversations.clone());
        self.service().with_guard(guard)
    }

    pub async fn befriend(&self, a: &str, b: &str) {
        self.friendships.add_friendship(a, b).await.expect("befriend");
    }

    pub async fn conversation(&self, id: &str) -> Conversation {
        self.conversations
            .find_by_id(id)
            .await
            .expect("query")
            .expect("conversation exists")
    }
}

pub fn ids(members: &[&str]) -> Vec<String> {
    members.iter().map(|m| m.to_string()).collect()
}

/// Delegates reads to a real repository but fails `apply_message` / `mark_seen` /
/// `create`, counting the attempts.
pub struct FailingWrites {
    pub inner: Arc<ConversationRepository>,
    pub write_attempts: AtomicUsize,
}

impl FailingWrites {
    pub fn new(inner: Arc<ConversationRepository>) -> Self {
        Self {
            inner,
            write_attempts: AtomicUsize::new(0),
        }
    }

    pub fn attempts(&self) -> usize {
        self.write_attempts.load(Ordering::SeqCst)
    }

    fn fail(&self) -> StorageError {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        StorageError::Database("database is locked".to_string())
    }
}

#[async_trait]
impl ConversationStore for FailingWrites {
    async fn find_direct_between(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> Result<Option<Conversation>, StorageError> {
        self.inner.find_direct_between(user_a, user_b).await
    }

    async fn create(&self, _new: &NewConversation) -> Result<Conversation, StorageError> {
        Err(self.fail())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Conversation>, StorageError> {
        self.inner.find_by_id(id).await
    }

    async fn list_by_participant(&self, user_id: &str) -> Result<Vec<Conversation>, StorageError> {
        self.inner.list_by_participant(user_id).await
    }

    async fn conversation_ids_for(&self, user_id: &str) -> Result<Vec<String>, StorageError> {
        self.inner.conversation_ids_for(user_id).await
    }

    async fn add_participant(
        &self,
        _conversation_id: &str,
        _user_id: &str,
    ) -> Result<Conversation, StorageError> {
        Err(self.fail())
    }

    async fn apply_message(
        &self,
        _conversation_id: &str,
        _last: &LastMessage,
    ) -> Result<Conversation, StorageError> {
        Err(self.fail())
    }

    async fn mark_seen(
        &self,
        _conversation_id: &str,
        _user_id: &str,
    ) -> Result<Conversation, StorageError> {
        Err(self.fail())
    }
}

/// Loses the first-contact race: the first pair lookup misses, and `create` reports the
/// pair as already taken. When `winner_commits` is set the competing conversation is
/// written to the real repository first, so the retried lookup finds it.
pub struct LostCreateRace {
    pub inner: Arc<ConversationRepository>,
    pub winner_commits: bool,
    pub lookups: AtomicUsize,
}

impl LostCreateRace {
    pub fn new(inner: Arc<ConversationRepository>, winner_commits: bool) -> Self {
        Self {
            inner,
            winner_commits,
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConversationStore for LostCreateRace {
    async fn find_direct_between(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> Result<Option<Conversation>, StorageError> {
        if self.lookups.fetch_add(1, Ordering::SeqCst) == 0 {
            return Ok(None);
        }
        self.inner.find_direct_between(user_a, user_b).await
    }

    async fn create(&self, new: &NewConversation) -> Result<Conversation, StorageError> {
        if self.winner_commits {
            self.inner.create(new).await?;
        }
        Err(StorageError::AlreadyExists("direct conversation".to_string()))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Conversation>, StorageError> {
        self.inner.find_by_id(id).await
    }

    async fn list_by_participant(&self, user_id: &str) -> Result<Vec<Conversation>, StorageError> {
        self.inner.list_by_participant(user_id).await
    }

    async fn conversation_ids_for(&self, user_id: &str) -> Result<Vec<String>, StorageError> {
        self.inner.conversation_ids_for(user_id).await
    }

    async fn add_participant(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> Result<Conversation, StorageError> {
        self.inner.add_participant(conversation_id, user_id).await
    }

    async fn apply_message(
        &self,
        conversation_id: &str,
        last: &LastMessage,
    ) -> Result<Conversation, StorageError> {
        self.inner.apply_message(conversation_id, last).await
    }

    async fn mark_seen(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> Result<Conversation, StorageError> {
        self.inner.mark_seen(conversation_id, user_id).await
    }
}

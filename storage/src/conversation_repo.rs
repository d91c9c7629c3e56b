//! Conversation repository: conversations, participants, unread counters and seen-by sets.
//!
//! Unread counters live on the participant rows so that a new message bumps them with one
//! `UPDATE ... unread_count + 1` statement instead of rewriting the whole document.
//! Direct conversations carry a UNIQUE `direct_key` (sorted participant pair).

use async_trait::async_trait;
use chat_core::{
    direct_key, timestamp_now, ChatError, Conversation, GroupMembership, LastMessage,
    NewConversation, Participant,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::StorageError;
use crate::models::{to_micros, ConversationRow, ParticipantRow};
use crate::repository::ConversationStore;
use crate::sqlite_pool::SqlitePoolManager;

const SELECT_CONVERSATION: &str = r#"
    SELECT id, kind, group_name, group_created_by,
           last_message_id, last_message_content, last_message_sender_id, last_message_created_at,
           last_message_at, created_at, updated_at
    FROM conversations
"#;

#[derive(Clone)]
pub struct ConversationRepository {
    pool_manager: SqlitePoolManager,
}

impl ConversationRepository {
    /// Opens its own pool for `database_url` and creates the tables.
    pub async fn new(database_url: &str) -> Result<Self, StorageError> {
        let pool_manager = SqlitePoolManager::new(database_url).await?;
        Self::with_pool(pool_manager).await
    }

    /// Uses a shared pool (required for in-memory databases shared with other repositories).
    pub async fn with_pool(pool_manager: SqlitePoolManager) -> Result<Self, StorageError> {
        let repo = Self { pool_manager };
        repo.init().await?;
        Ok(repo)
    }

    async fn init(&self) -> Result<(), StorageError> {
        info!("Creating conversation tables if not exist");

        let pool = self.pool_manager.pool();

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS conversations (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                direct_key TEXT UNIQUE,
                group_name TEXT,
                group_created_by TEXT,
                last_message_id TEXT,
                last_message_content TEXT,
                last_message_sender_id TEXT,
                last_message_created_at INTEGER,
                last_message_at INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS conversation_participants (
                conversation_id TEXT NOT NULL REFERENCES conversations(id),
                user_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                joined_at INTEGER NOT NULL,
                unread_count INTEGER NOT NULL DEFAULT 0 CHECK (unread_count >= 0),
                PRIMARY KEY (conversation_id, user_id)
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS conversation_seen (
                conversation_id TEXT NOT NULL REFERENCES conversations(id),
                user_id TEXT NOT NULL,
                seen_at INTEGER NOT NULL,
                PRIMARY KEY (conversation_id, user_id)
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_participants_user_id ON conversation_participants(user_id);
            CREATE INDEX IF NOT EXISTS idx_conversations_activity ON conversations(last_message_at DESC, updated_at DESC);
            "#,
        )
        .execute(pool)
        .await?;

        info!("Conversation tables created successfully");
        Ok(())
    }

    /// True if `user_id` is a participant of the conversation (false if it does not exist).
    pub async fn is_participant(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> Result<bool, StorageError> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM conversation_participants WHERE conversation_id = ? AND user_id = ?",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(self.pool_manager.pool())
        .await?;
        Ok(row.is_some())
    }

    async fn hydrate(&self, row: ConversationRow) -> Result<Conversation, StorageError> {
        let pool = self.pool_manager.pool();

        let participants: Vec<ParticipantRow> = sqlx::query_as(
            r#"
            SELECT user_id, joined_at, unread_count
            FROM conversation_participants
            WHERE conversation_id = ?
            ORDER BY position ASC
            "#,
        )
        .bind(&row.id)
        .fetch_all(pool)
        .await?;

        let seen_by: Vec<(String,)> = sqlx::query_as(
            "SELECT user_id FROM conversation_seen WHERE conversation_id = ? ORDER BY seen_at ASC, rowid ASC",
        )
        .bind(&row.id)
        .fetch_all(pool)
        .await?;

        row.into_conversation(participants, seen_by.into_iter().map(|s| s.0).collect())
    }

    async fn load(&self, id: &str) -> Result<Conversation, StorageError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("conversation {}", id)))
    }
}

#[async_trait]
impl ConversationStore for ConversationRepository {
    async fn find_direct_between(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> Result<Option<Conversation>, StorageError> {
        let sql = format!("{} WHERE direct_key = ?", SELECT_CONVERSATION);
        let row: Option<ConversationRow> = sqlx::query_as(&sql)
            .bind(direct_key(user_a, user_b))
            .fetch_optional(self.pool_manager.pool())
            .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn create(&self, new: &NewConversation) -> Result<Conversation, StorageError> {
        if new.participant_ids.is_empty() {
            return Err(StorageError::Invalid(
                "conversation needs at least one participant".to_string(),
            ));
        }

        let id = Uuid::new_v4().to_string();
        let now = timestamp_now();
        let now_us = to_micros(now);
        let (group_name, group_created_by) = match &new.group {
            Some(group) => (Some(group.name.clone()), Some(group.created_by.clone())),
            None => (None, None),
        };

        let mut tx = self.pool_manager.pool().begin().await?;

        sqlx::query(
            r#"
            INSERT INTO conversations (id, kind, direct_key, group_name, group_created_by, last_message_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(new.kind.as_str())
        .bind(new.direct_key())
        .bind(&group_name)
        .bind(&group_created_by)
        .bind(now_us)
        .bind(now_us)
        .bind(now_us)
        .execute(&mut *tx)
        .await?;

        for (position, user_id) in new.participant_ids.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO conversation_participants (conversation_id, user_id, position, joined_at, unread_count)
                VALUES (?, ?, ?, ?, 0)
                "#,
            )
            .bind(&id)
            .bind(user_id)
            .bind(position as i64)
            .bind(now_us)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            conversation_id = %id,
            kind = %new.kind,
            participants = new.participant_ids.len(),
            "Created conversation"
        );

        Ok(Conversation {
            id,
            kind: new.kind,
            participants: new
                .participant_ids
                .iter()
                .map(|user_id| Participant {
                    user_id: user_id.clone(),
                    joined_at: now,
                })
                .collect(),
            group: new.group.clone(),
            last_message: None,
            last_message_at: now,
            unread_counts: new.participant_ids.iter().map(|u| (u.clone(), 0)).collect(),
            seen_by: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Conversation>, StorageError> {
        let sql = format!("{} WHERE id = ?", SELECT_CONVERSATION);
        let row: Option<ConversationRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(self.pool_manager.pool())
            .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn list_by_participant(&self, user_id: &str) -> Result<Vec<Conversation>, StorageError> {
        let rows: Vec<ConversationRow> = sqlx::query_as(
            r#"
            SELECT c.id, c.kind, c.group_name, c.group_created_by,
                   c.last_message_id, c.last_message_content, c.last_message_sender_id, c.last_message_created_at,
                   c.last_message_at, c.created_at, c.updated_at
            FROM conversations c
            JOIN conversation_participants p ON p.conversation_id = c.id
            WHERE p.user_id = ?
            ORDER BY c.last_message_at DESC, c.updated_at DESC, c.id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool_manager.pool())
        .await?;

        let mut conversations = Vec::with_capacity(rows.len());
        for row in rows {
            conversations.push(self.hydrate(row).await?);
        }

        debug!(user_id, count = conversations.len(), "Listed conversations");
        Ok(conversations)
    }

    async fn conversation_ids_for(&self, user_id: &str) -> Result<Vec<String>, StorageError> {
        let ids: Vec<(String,)> = sqlx::query_as(
            "SELECT conversation_id FROM conversation_participants WHERE user_id = ? ORDER BY conversation_id",
        )
        .bind(user_id)
        .fetch_all(self.pool_manager.pool())
        .await?;
        Ok(ids.into_iter().map(|r| r.0).collect())
    }

    async fn add_participant(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> Result<Conversation, StorageError> {
        let now_us = to_micros(timestamp_now());
        let mut tx = self.pool_manager.pool().begin().await?;

        let exists: Option<(String,)> = sqlx::query_as("SELECT id FROM conversations WHERE id = ?")
            .bind(conversation_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(StorageError::NotFound(format!(
                "conversation {}",
                conversation_id
            )));
        }

        let inserted = sqlx::query(
            r#"
            INSERT OR IGNORE INTO conversation_participants (conversation_id, user_id, position, joined_at, unread_count)
            SELECT ?, ?, COALESCE(MAX(position), -1) + 1, ?, 0
            FROM conversation_participants WHERE conversation_id = ?
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .bind(now_us)
        .bind(conversation_id)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() > 0 {
            sqlx::query("UPDATE conversations SET updated_at = ? WHERE id = ?")
                .bind(now_us)
                .bind(conversation_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        info!(conversation_id, user_id, added = inserted.rows_affected() > 0, "Added participant");
        self.load(conversation_id).await
    }

    async fn apply_message(
        &self,
        conversation_id: &str,
        last: &LastMessage,
    ) -> Result<Conversation, StorageError> {
        let created_at_us = to_micros(last.created_at);
        let now_us = to_micros(timestamp_now());
        let mut tx = self.pool_manager.pool().begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE conversations
            SET last_message_id = ?, last_message_content = ?, last_message_sender_id = ?,
                last_message_created_at = ?, last_message_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&last.id)
        .bind(&last.content)
        .bind(&last.sender_id)
        .bind(created_at_us)
        .bind(created_at_us)
        .bind(now_us)
        .bind(conversation_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!(
                "conversation {}",
                conversation_id
            )));
        }

        sqlx::query(
            r#"
            UPDATE conversation_participants
            SET unread_count = CASE WHEN user_id = ? THEN 0 ELSE unread_count + 1 END
            WHERE conversation_id = ?
            "#,
        )
        .bind(&last.sender_id)
        .bind(conversation_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM conversation_seen WHERE conversation_id = ?")
            .bind(conversation_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(
            conversation_id,
            message_id = %last.id,
            sender_id = %last.sender_id,
            "Applied last message to conversation"
        );
        self.load(conversation_id).await
    }

    async fn mark_seen(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> Result<Conversation, StorageError> {
        let now_us = to_micros(timestamp_now());
        let mut tx = self.pool_manager.pool().begin().await?;

        let exists: Option<(String,)> = sqlx::query_as("SELECT id FROM conversations WHERE id = ?")
            .bind(conversation_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(StorageError::NotFound(format!(
                "conversation {}",
                conversation_id
            )));
        }

        let newly_seen = sqlx::query(
            "INSERT OR IGNORE INTO conversation_seen (conversation_id, user_id, seen_at) VALUES (?, ?, ?)",
        )
        .bind(conversation_id)
        .bind(user_id)
        .bind(now_us)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let reset = sqlx::query(
            "UPDATE conversation_participants SET unread_count = 0 WHERE conversation_id = ? AND user_id = ? AND unread_count <> 0",
        )
        .bind(conversation_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        // Already seen with nothing unread: leave updated_at alone.
        if newly_seen + reset > 0 {
            sqlx::query("UPDATE conversations SET updated_at = ? WHERE id = ?")
                .bind(now_us)
                .bind(conversation_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        debug!(
            conversation_id,
            user_id,
            changed = newly_seen + reset > 0,
            "Marked conversation as seen"
        );
        self.load(conversation_id).await
    }
}

#[async_trait]
impl GroupMembership for ConversationRepository {
    async fn is_member(&self, conversation_id: &str, user_id: &str) -> chat_core::Result<bool> {
        self.is_participant(conversation_id, user_id)
            .await
            .map_err(ChatError::from)
    }
}

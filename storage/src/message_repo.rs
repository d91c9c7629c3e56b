//! Message repository: append-only message log with cursor pagination.
//!
//! External: SQLite via sqlx; callers use append/insert/list_by_conversation.

use async_trait::async_trait;
use chat_core::{Message, MessagePage};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::StorageError;
use crate::models::{from_micros, to_micros, MessageRow};
use crate::repository::MessageStore;
use crate::sqlite_pool::SqlitePoolManager;

#[derive(Clone)]
pub struct MessageRepository {
    pool_manager: SqlitePoolManager,
}

impl MessageRepository {
    pub async fn new(database_url: &str) -> Result<Self, StorageError> {
        let pool_manager = SqlitePoolManager::new(database_url).await?;
        Self::with_pool(pool_manager).await
    }

    pub async fn with_pool(pool_manager: SqlitePoolManager) -> Result<Self, StorageError> {
        let repo = Self { pool_manager };
        repo.init().await?;
        Ok(repo)
    }

    async fn init(&self) -> Result<(), StorageError> {
        info!("Creating message tables if not exist");

        let pool = self.pool_manager.pool();

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                conversation_id TEXT NOT NULL,
                sender_id TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_messages_conversation_created ON messages(conversation_id, created_at DESC, id DESC);
            CREATE INDEX IF NOT EXISTS idx_messages_sender_id ON messages(sender_id);
            "#,
        )
        .execute(pool)
        .await?;

        info!("Message tables created successfully");
        Ok(())
    }

    /// Number of messages stored for a conversation.
    pub async fn count_by_conversation(&self, conversation_id: &str) -> Result<i64, StorageError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages WHERE conversation_id = ?")
            .bind(conversation_id)
            .fetch_one(self.pool_manager.pool())
            .await?;
        Ok(count.0)
    }
}

#[async_trait]
impl MessageStore for MessageRepository {
    async fn insert(&self, message: &Message) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO messages (id, conversation_id, sender_id, content, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&message.id)
        .bind(&message.conversation_id)
        .bind(&message.sender_id)
        .bind(&message.content)
        .bind(to_micros(message.created_at))
        .execute(self.pool_manager.pool())
        .await?;

        info!(
            message_id = %message.id,
            conversation_id = %message.conversation_id,
            sender_id = %message.sender_id,
            "Saved message"
        );
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Message>, StorageError> {
        let row: Option<MessageRow> = sqlx::query_as(
            "SELECT id, conversation_id, sender_id, content, created_at FROM messages WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool_manager.pool())
        .await?;

        row.map(Message::try_from).transpose()
    }

    async fn list_by_conversation(
        &self,
        conversation_id: &str,
        limit: u32,
        before: Option<DateTime<Utc>>,
    ) -> Result<MessagePage, StorageError> {
        if limit == 0 {
            return Err(StorageError::Invalid("limit must be at least 1".to_string()));
        }

        let fetch = i64::from(limit) + 1;
        let pool = self.pool_manager.pool();

        let rows: Vec<MessageRow> = match before {
            Some(cursor) => {
                sqlx::query_as(
                    r#"
                    SELECT id, conversation_id, sender_id, content, created_at
                    FROM messages
                    WHERE conversation_id = ? AND created_at <= ?
                    ORDER BY created_at DESC, id DESC
                    LIMIT ?
                    "#,
                )
                .bind(conversation_id)
                .bind(to_micros(cursor))
                .bind(fetch)
                .fetch_all(pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    r#"
                    SELECT id, conversation_id, sender_id, content, created_at
                    FROM messages
                    WHERE conversation_id = ?
                    ORDER BY created_at DESC, id DESC
                    LIMIT ?
                    "#,
                )
                .bind(conversation_id)
                .bind(fetch)
                .fetch_all(pool)
                .await?
            }
        };

        let mut messages = rows
            .into_iter()
            .map(Message::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let next_cursor = if messages.len() > limit as usize {
            messages.pop().map(|extra| extra.created_at)
        } else {
            None
        };

        messages.reverse();

        debug!(
            conversation_id,
            returned = messages.len(),
            has_more = next_cursor.is_some(),
            "Listed messages"
        );

        Ok(MessagePage {
            messages,
            next_cursor,
        })
    }
}

/// Parses a cursor produced by [`MessagePage::next_cursor`] (RFC 3339 or epoch microseconds).
pub fn parse_cursor(raw: &str) -> Result<DateTime<Utc>, StorageError> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    raw.parse::<i64>()
        .map_err(|_| StorageError::Invalid(format!("invalid cursor: {}", raw)))
        .and_then(from_micros)
}

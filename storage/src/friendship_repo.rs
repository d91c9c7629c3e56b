//! Friendship repository: the boolean "are these two users linked" check.
//!
//! Pairs are stored once, sorted, so lookups are symmetric.

use async_trait::async_trait;
use chat_core::{timestamp_now, ChatError, IdentityProvider};
use tracing::info;

use crate::error::StorageError;
use crate::models::to_micros;
use crate::repository::FriendshipStore;
use crate::sqlite_pool::SqlitePoolManager;

#[derive(Clone)]
pub struct FriendshipRepository {
    pool_manager: SqlitePoolManager,
}

impl FriendshipRepository {
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
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS friendships (
                user_a TEXT NOT NULL,
                user_b TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (user_a, user_b),
                CHECK (user_a < user_b)
            )
            "#,
        )
        .execute(self.pool_manager.pool())
        .await?;
        Ok(())
    }
}

fn ordered<'a>(user_a: &'a str, user_b: &'a str) -> (&'a str, &'a str) {
    if user_a <= user_b {
        (user_a, user_b)
    } else {
        (user_b, user_a)
    }
}

#[async_trait]
impl FriendshipStore for FriendshipRepository {
    async fn add_friendship(&self, user_a: &str, user_b: &str) -> Result<(), StorageError> {
        if user_a == user_b {
            return Err(StorageError::Invalid(
                "a user cannot befriend themselves".to_string(),
            ));
        }
        let (low, high) = ordered(user_a, user_b);

        sqlx::query("INSERT OR IGNORE INTO friendships (user_a, user_b, created_at) VALUES (?, ?, ?)")
            .bind(low)
            .bind(high)
            .bind(to_micros(timestamp_now()))
            .execute(self.pool_manager.pool())
            .await?;

        info!(user_a = low, user_b = high, "Saved friendship");
        Ok(())
    }

    async fn are_friends(&self, user_a: &str, user_b: &str) -> Result<bool, StorageError> {
        let (low, high) = ordered(user_a, user_b);
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM friendships WHERE user_a = ? AND user_b = ?")
                .bind(low)
                .bind(high)
                .fetch_optional(self.pool_manager.pool())
                .await?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl IdentityProvider for FriendshipRepository {
    async fn is_friend(&self, user_a: &str, user_b: &str) -> chat_core::Result<bool> {
        self.are_friends(user_a, user_b).await.map_err(ChatError::from)
    }
}

//! Collaborators consumed by the messaging core. Implemented by the storage layer
//! (or by any other social-graph backend) and checked above the core.

use async_trait::async_trait;

use crate::error::Result;

/// Answers whether two users are linked in the social graph.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Symmetric: `is_friend(a, b) == is_friend(b, a)`.
    async fn is_friend(&self, user_a: &str, user_b: &str) -> Result<bool>;
}

/// Answers whether a user participates in a conversation.
#[async_trait]
pub trait GroupMembership: Send + Sync {
    /// False when the conversation does not exist.
    async fn is_member(&self, conversation_id: &str, user_id: &str) -> Result<bool>;
}

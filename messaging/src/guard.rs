//! Access gates applied before messaging operations: friendship for direct traffic,
//! membership for group traffic and message history.

use std::sync::Arc;

use chat_core::{ChatError, GroupMembership, IdentityProvider, Result};
use tracing::warn;

#[derive(Clone)]
pub struct AccessGuard {
    identity: Arc<dyn IdentityProvider>,
    membership: Arc<dyn GroupMembership>,
}

impl AccessGuard {
    pub fn new(identity: Arc<dyn IdentityProvider>, membership: Arc<dyn GroupMembership>) -> Self {
        Self {
            identity,
            membership,
        }
    }

    /// Fails with `Forbidden` unless the two users are friends.
    pub async fn check_friendship(&self, me: &str, other: &str) -> Result<()> {
        if self.identity.is_friend(me, other).await? {
            Ok(())
        } else {
            warn!(user_id = me, other_id = other, "Direct message between non-friends denied");
            Err(ChatError::Forbidden(format!("{} and {} are not friends", me, other)))
        }
    }

    /// Fails with `Forbidden` unless `user_id` is in the group.
    pub async fn check_group_membership(&self, conversation_id: &str, user_id: &str) -> Result<()> {
        self.check_member(conversation_id, user_id, "group").await
    }

    /// Fails with `Forbidden` unless `user_id` participates in the conversation.
    pub async fn check_conversation_membership(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> Result<()> {
        self.check_member(conversation_id, user_id, "conversation").await
    }

    async fn check_member(&self, conversation_id: &str, user_id: &str, what: &str) -> Result<()> {
        if self.membership.is_member(conversation_id, user_id).await? {
            Ok(())
        } else {
            warn!(conversation_id, user_id, "Access by non-member denied");
            Err(ChatError::Forbidden(format!(
                "{} is not a member of {} {}",
                user_id, what, conversation_id
            )))
        }
    }
}

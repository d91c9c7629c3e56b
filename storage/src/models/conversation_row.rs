//! Conversation rows: `conversations` plus the per-member `conversation_participants`.
//!
//! A [`Conversation`] is assembled from one [`ConversationRow`], its participant rows
//! (which also carry the unread counters) and the seen-by user ids.

use std::collections::HashMap;

use chat_core::{Conversation, ConversationType, GroupInfo, LastMessage, Participant};

use super::from_micros;
use crate::error::StorageError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ConversationRow {
    pub id: String,
    pub kind: String,
    pub group_name: Option<String>,
    pub group_created_by: Option<String>,
    pub last_message_id: Option<String>,
    pub last_message_content: Option<String>,
    pub last_message_sender_id: Option<String>,
    pub last_message_created_at: Option<i64>,
    pub last_message_at: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ParticipantRow {
    pub user_id: String,
    pub joined_at: i64,
    pub unread_count: i64,
}

impl ConversationRow {
    pub fn into_conversation(
        self,
        participants: Vec<ParticipantRow>,
        seen_by: Vec<String>,
    ) -> Result<Conversation, StorageError> {
        let kind = self
            .kind
            .parse::<ConversationType>()
            .map_err(|e| StorageError::Corrupt(e.to_string()))?;

        let group = match (self.group_name, self.group_created_by) {
            (Some(name), Some(created_by)) => Some(GroupInfo { name, created_by }),
            _ => None,
        };

        let last_message = match (
            self.last_message_id,
            self.last_message_content,
            self.last_message_sender_id,
            self.last_message_created_at,
        ) {
            (Some(id), Some(content), Some(sender_id), Some(created_at)) => Some(LastMessage {
                id,
                content,
                sender_id,
                created_at: from_micros(created_at)?,
            }),
            _ => None,
        };

        let mut unread_counts = HashMap::with_capacity(participants.len());
        let mut members = Vec::with_capacity(participants.len());
        for row in participants {
            let count = u32::try_from(row.unread_count).map_err(|_| {
                StorageError::Corrupt(format!(
                    "unread count {} for {}",
                    row.unread_count, row.user_id
                ))
            })?;
            unread_counts.insert(row.user_id.clone(), count);
            members.push(Participant {
                user_id: row.user_id,
                joined_at: from_micros(row.joined_at)?,
            });
        }

        Ok(Conversation {
            id: self.id,
            kind,
            participants: members,
            group,
            last_message,
            last_message_at: from_micros(self.last_message_at)?,
            unread_counts,
            seen_by,
            created_at: from_micros(self.created_at)?,
            updated_at: from_micros(self.updated_at)?,
        })
    }
}

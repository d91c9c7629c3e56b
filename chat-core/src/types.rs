//! Core types: conversation, participant, message, last-message snapshot, paging and seen results.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ChatError;

/// Current time truncated to microseconds, the precision timestamps are persisted with.
pub fn timestamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Order-independent key of a direct conversation: `"<len(min)>:<min>:<max>"`.
///
/// The length prefix keeps ids containing `:` from colliding with another pair.
pub fn direct_key(user_a: &str, user_b: &str) -> String {
    let (low, high) = if user_a <= user_b {
        (user_a, user_b)
    } else {
        (user_b, user_a)
    };
    format!("{}:{}:{}", low.len(), low, high)
}

/// Kind of conversation: fixed pair or growable group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationType {
    Direct,
    Group,
}

impl ConversationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationType::Direct => "direct",
            ConversationType::Group => "group",
        }
    }
}

impl fmt::Display for ConversationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConversationType {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(ConversationType::Direct),
            "group" => Ok(ConversationType::Group),
            other => Err(ChatError::Validation(format!(
                "invalid conversation type: {}",
                other
            ))),
        }
    }
}

/// A conversation member and when they joined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub user_id: String,
    pub joined_at: DateTime<Utc>,
}

/// Group metadata; present only on group conversations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupInfo {
    pub name: String,
    pub created_by: String,
}

/// Denormalized snapshot of the most recent message of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastMessage {
    pub id: String,
    pub content: String,
    pub sender_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Message> for LastMessage {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id.clone(),
            content: message.content.clone(),
            sender_id: message.sender_id.clone(),
            created_at: message.created_at,
        }
    }
}

/// A direct or group thread with its summary, unread counters and seen-by set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ConversationType,
    /// Unique by user id, in join order.
    pub participants: Vec<Participant>,
    pub group: Option<GroupInfo>,
    pub last_message: Option<LastMessage>,
    /// Mirror of `last_message.created_at`; creation time until the first message.
    pub last_message_at: DateTime<Utc>,
    pub unread_counts: HashMap<String, u32>,
    /// Members who have seen the current last message, in the order they saw it.
    pub seen_by: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn is_direct(&self) -> bool {
        self.kind == ConversationType::Direct
    }

    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p.user_id == user_id)
    }

    /// Unread count for a user; users without an entry have read everything.
    pub fn unread_for(&self, user_id: &str) -> u32 {
        self.unread_counts.get(user_id).copied().unwrap_or(0)
    }

    /// For a direct conversation, the participant that is not `user_id`.
    pub fn counterpart_of(&self, user_id: &str) -> Option<&str> {
        if !self.is_direct() || !self.has_participant(user_id) {
            return None;
        }
        self.participants
            .iter()
            .map(|p| p.user_id.as_str())
            .find(|id| *id != user_id)
    }
}

/// Input for creating a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewConversation {
    pub kind: ConversationType,
    /// De-duplicated, in join order.
    pub participant_ids: Vec<String>,
    pub group: Option<GroupInfo>,
}

impl NewConversation {
    /// A direct conversation between exactly two users, initiator first.
    pub fn direct(initiator: &str, recipient: &str) -> Self {
        Self {
            kind: ConversationType::Direct,
            participant_ids: vec![initiator.to_string(), recipient.to_string()],
            group: None,
        }
    }

    /// A group whose members are the creator followed by `member_ids`, duplicates dropped.
    pub fn group(creator: &str, member_ids: &[String], name: &str) -> Self {
        let mut participant_ids: Vec<String> = Vec::with_capacity(member_ids.len() + 1);
        for id in std::iter::once(creator).chain(member_ids.iter().map(String::as_str)) {
            if !participant_ids.iter().any(|p| p == id) {
                participant_ids.push(id.to_string());
            }
        }
        Self {
            kind: ConversationType::Group,
            participant_ids,
            group: Some(GroupInfo {
                name: name.to_string(),
                created_by: creator.to_string(),
            }),
        }
    }

    /// Pair key for direct conversations; `None` for groups.
    pub fn direct_key(&self) -> Option<String> {
        match (self.kind, self.participant_ids.as_slice()) {
            (ConversationType::Direct, [a, b]) => Some(direct_key(a, b)),
            _ => None,
        }
    }
}

/// A single append-only message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Creates a message with a generated UUID and the current timestamp.
    pub fn new(conversation_id: &str, sender_id: &str, content: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_string(),
            sender_id: sender_id.to_string(),
            content: content.to_string(),
            created_at: timestamp_now(),
        }
    }
}

/// One page of messages, oldest first. `next_cursor` is the `created_at` of the
/// newest message not yet returned; pass it back to fetch the older page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub next_cursor: Option<DateTime<Utc>>,
}

/// What a mark-as-seen call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeenStatus {
    Marked,
    /// Nothing sent yet; nothing persisted.
    NoMessages,
    /// The caller sent the last message; nothing persisted.
    OwnMessage,
}

/// Result of marking a conversation as seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeenOutcome {
    pub status: SeenStatus,
    pub seen_by: Vec<String>,
    pub my_unread_count: u32,
}

impl SeenOutcome {
    /// Reports the conversation's current state for `user_id`.
    pub fn from_conversation(status: SeenStatus, conversation: &Conversation, user_id: &str) -> Self {
        Self {
            status,
            seen_by: conversation.seen_by.clone(),
            my_unread_count: conversation.unread_for(user_id),
        }
    }
}

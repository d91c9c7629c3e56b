//! Messaging service: the operations exposed to the HTTP layer.
//!
//! Sending is always resolve-or-create conversation → append message → update conversation.

use std::sync::Arc;

use chat_core::{
    ChatError, Conversation, ConversationType, Message, MessagePage, NewConversation, Result,
    SeenOutcome,
};
use chat_storage::{ConversationStore, MessageStore, StorageError};
use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use crate::guard::AccessGuard;
use crate::{seen, update};

pub const DEFAULT_PAGE_LIMIT: u32 = 50;
pub const MAX_PAGE_LIMIT: u32 = 200;

#[derive(Clone)]
pub struct MessagingService {
    conversations: Arc<dyn ConversationStore>,
    messages: Arc<dyn MessageStore>,
    guard: Option<AccessGuard>,
    page_limit: u32,
}

impl MessagingService {
    /// A service without access gates; friendship and membership are assumed checked upstream.
    pub fn new(conversations: Arc<dyn ConversationStore>, messages: Arc<dyn MessageStore>) -> Self {
        Self {
            conversations,
            messages,
            guard: None,
            page_limit: DEFAULT_PAGE_LIMIT,
        }
    }

    /// Enforces friendship for direct traffic and membership for group traffic and history.
    pub fn with_guard(mut self, guard: AccessGuard) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Page size used by [`get_messages`](Self::get_messages) when none is given.
    pub fn with_page_limit(mut self, limit: u32) -> Self {
        self.page_limit = limit.clamp(1, MAX_PAGE_LIMIT);
        self
    }

    #[instrument(skip(self, member_ids))]
    pub async fn create_conversation(
        &self,
        requester_id: &str,
        kind: ConversationType,
        member_ids: &[String],
        group_name: Option<&str>,
    ) -> Result<Conversation> {
        let first_member = member_ids
            .first()
            .ok_or_else(|| ChatError::Validation("member ids are required".to_string()))?;

        match kind {
            ConversationType::Direct => {
                if first_member == requester_id {
                    return Err(ChatError::Validation(
                        "cannot open a direct conversation with yourself".to_string(),
                    ));
                }
                self.check_friendship(requester_id, first_member).await?;
                self.find_or_create_direct(requester_id, first_member).await
            }
            ConversationType::Group => {
                let name = group_name
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .ok_or_else(|| ChatError::Validation("group name is required".to_string()))?;
                let conversation = self
                    .conversations
                    .create(&NewConversation::group(requester_id, member_ids, name))
                    .await?;
                info!(conversation_id = %conversation.id, "Group conversation created");
                Ok(conversation)
            }
        }
    }

    pub async fn list_conversations(&self, requester_id: &str) -> Result<Vec<Conversation>> {
        Ok(self.conversations.list_by_participant(requester_id).await?)
    }

    /// Lists the requester's conversations, or only their direct conversation with `recipient_id`.
    pub async fn find_conversations(
        &self,
        requester_id: &str,
        recipient_id: Option<&str>,
    ) -> Result<Vec<Conversation>> {
        match recipient_id {
            Some(recipient) => Ok(self
                .conversations
                .find_direct_between(requester_id, recipient)
                .await?
                .into_iter()
                .collect()),
            None => self.list_conversations(requester_id).await,
        }
    }

    /// Ids of the conversations a user belongs to, e.g. to join realtime rooms on connect.
    pub async fn conversation_ids_for(&self, user_id: &str) -> Result<Vec<String>> {
        Ok(self.conversations.conversation_ids_for(user_id).await?)
    }

    /// Adds a member to a group; the requester must already belong to it.
    #[instrument(skip(self))]
    pub async fn add_member(
        &self,
        requester_id: &str,
        conversation_id: &str,
        user_id: &str,
    ) -> Result<Conversation> {
        let conversation = self.require_conversation(conversation_id).await?;
        if conversation.is_direct() {
            return Err(ChatError::Validation(
                "direct conversations cannot gain members".to_string(),
            ));
        }
        if let Some(guard) = &self.guard {
            guard.check_group_membership(conversation_id, requester_id).await?;
        }
        Ok(self
            .conversations
            .add_participant(conversation_id, user_id)
            .await?)
    }

    /// One page of history, oldest first; `limit` defaults to the configured page size.
    pub async fn get_messages(
        &self,
        conversation_id: &str,
        limit: Option<u32>,
        cursor: Option<DateTime<Utc>>,
    ) -> Result<MessagePage> {
        let limit = limit.unwrap_or(self.page_limit);
        if limit == 0 || limit > MAX_PAGE_LIMIT {
            return Err(ChatError::Validation(format!(
                "limit must be between 1 and {}",
                MAX_PAGE_LIMIT
            )));
        }
        self.require_conversation(conversation_id).await?;
        Ok(self
            .messages
            .list_by_conversation(conversation_id, limit, cursor)
            .await?)
    }

    /// [`get_messages`](Self::get_messages) after checking the requester participates.
    pub async fn get_messages_as(
        &self,
        requester_id: &str,
        conversation_id: &str,
        limit: Option<u32>,
        cursor: Option<DateTime<Utc>>,
    ) -> Result<MessagePage> {
        self.require_conversation(conversation_id).await?;
        if let Some(guard) = &self.guard {
            guard
                .check_conversation_membership(conversation_id, requester_id)
                .await?;
        }
        self.get_messages(conversation_id, limit, cursor).await
    }

    /// Sends a direct message.
    ///
    /// - known `conversation_id`: used as is; it must be a direct conversation of the sender
    ///   (and of `recipient_id`, when given);
    /// - unknown `conversation_id` or none: the pair conversation with `recipient_id` is
    ///   looked up and created on first contact;
    /// - neither a `conversation_id` nor a recipient: [`ChatError::MissingConversation`].
    #[instrument(skip(self, content))]
    pub async fn send_direct(
        &self,
        sender_id: &str,
        recipient_id: Option<&str>,
        content: &str,
        conversation_id: Option<&str>,
    ) -> Result<Message> {
        ensure_content(content)?;
        let conversation = self
            .resolve_direct(sender_id, recipient_id, conversation_id)
            .await?;
        self.deliver(&conversation, sender_id, content).await
    }

    /// Sends a message into an existing group conversation.
    #[instrument(skip(self, content))]
    pub async fn send_group(
        &self,
        sender_id: &str,
        conversation_id: &str,
        content: &str,
    ) -> Result<Message> {
        ensure_content(content)?;
        let conversation = self.require_conversation(conversation_id).await?;
        if conversation.is_direct() {
            return Err(ChatError::Validation(format!(
                "conversation {} is not a group",
                conversation_id
            )));
        }
        if let Some(guard) = &self.guard {
            guard
                .check_group_membership(conversation_id, sender_id)
                .await?;
        }
        self.deliver(&conversation, sender_id, content).await
    }

    /// Marks the conversation as seen by `user_id`, who must participate in it.
    pub async fn mark_as_seen(&self, conversation_id: &str, user_id: &str) -> Result<SeenOutcome> {
        if let Some(guard) = &self.guard {
            self.require_conversation(conversation_id).await?;
            guard
                .check_conversation_membership(conversation_id, user_id)
                .await?;
        }
        seen::mark_as_seen(self.conversations.as_ref(), conversation_id, user_id).await
    }

    async fn deliver(
        &self,
        conversation: &Conversation,
        sender_id: &str,
        content: &str,
    ) -> Result<Message> {
        let message = self
            .messages
            .append(&conversation.id, sender_id, content)
            .await?;
        update::apply_new_message(self.conversations.as_ref(), &message).await?;

        info!(
            conversation_id = %conversation.id,
            message_id = %message.id,
            kind = %conversation.kind,
            "Message sent"
        );
        Ok(message)
    }

    async fn resolve_direct(
        &self,
        sender_id: &str,
        recipient_id: Option<&str>,
        conversation_id: Option<&str>,
    ) -> Result<Conversation> {
        if let Some(id) = conversation_id {
            if let Some(conversation) = self.conversations.find_by_id(id).await? {
                let counterpart = direct_counterpart(&conversation, sender_id, recipient_id)?;
                self.check_friendship(sender_id, &counterpart).await?;
                return Ok(conversation);
            }
            if recipient_id.is_none() {
                return Err(ChatError::NotFound(format!("conversation {}", id)));
            }
            warn!(
                conversation_id = id,
                "Conversation not found; resolving by participant pair"
            );
        }

        let recipient_id = recipient_id.ok_or(ChatError::MissingConversation)?;
        if recipient_id == sender_id {
            return Err(ChatError::Validation(
                "cannot send a direct message to yourself".to_string(),
            ));
        }
        self.check_friendship(sender_id, recipient_id).await?;
        self.find_or_create_direct(sender_id, recipient_id).await
    }

    /// Returns the pair's conversation, creating it on first contact. A concurrent first
    /// contact that wins the unique pair constraint is picked up by one re-lookup.
    async fn find_or_create_direct(&self, user_a: &str, user_b: &str) -> Result<Conversation> {
        if let Some(existing) = self.conversations.find_direct_between(user_a, user_b).await? {
            return Ok(existing);
        }

        match self
            .conversations
            .create(&NewConversation::direct(user_a, user_b))
            .await
        {
            Ok(created) => {
                info!(conversation_id = %created.id, "Direct conversation created");
                Ok(created)
            }
            Err(StorageError::AlreadyExists(_)) => {
                warn!(user_a, user_b, "Direct conversation created concurrently; reusing it");
                self.conversations
                    .find_direct_between(user_a, user_b)
                    .await?
                    .ok_or_else(|| {
                        ChatError::Conflict(format!(
                            "direct conversation between {} and {}",
                            user_a, user_b
                        ))
                    })
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn require_conversation(&self, conversation_id: &str) -> Result<Conversation> {
        self.conversations
            .find_by_id(conversation_id)
            .await?
            .ok_or_else(|| ChatError::NotFound(format!("conversation {}", conversation_id)))
    }

    async fn check_friendship(&self, me: &str, other: &str) -> Result<()> {
        match &self.guard {
            Some(guard) => guard.check_friendship(me, other).await,
            None => Ok(()),
        }
    }
}

fn ensure_content(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(ChatError::Validation(
            "message content must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// The other participant of a direct conversation the sender belongs to.
fn direct_counterpart(
    conversation: &Conversation,
    sender_id: &str,
    recipient_id: Option<&str>,
) -> Result<String> {
    if !conversation.is_direct() {
        return Err(ChatError::Validation(format!(
            "conversation {} is not a direct conversation",
            conversation.id
        )));
    }
    let counterpart = conversation.counterpart_of(sender_id).ok_or_else(|| {
        ChatError::Validation(format!(
            "{} is not a participant of conversation {}",
            sender_id, conversation.id
        ))
    })?;
    match recipient_id {
        Some(recipient) if recipient != counterpart => Err(ChatError::Validation(format!(
            "{} is not the recipient of conversation {}",
            recipient, conversation.id
        ))),
        _ => Ok(counterpart.to_string()),
    }
}

//! Wires repositories and the messaging service from config and runs one command.

use std::sync::Arc;

use anyhow::{Context, Result};
use chat_core::{ChatError, ConversationType};
use chat_storage::{
    parse_cursor, ConversationRepository, FriendshipRepository, FriendshipStore,
    MessageRepository, SqlitePoolManager,
};
use messaging::{AccessGuard, MessagingService};
use serde_json::{json, Value};
use tracing::info;

use crate::cli::{Commands, Kind};
use crate::config::ChatConfig;

/// Repositories on one shared pool plus the service built over them.
pub struct App {
    pub service: MessagingService,
    pub friendships: Arc<FriendshipRepository>,
}

pub async fn build_service(config: &ChatConfig) -> Result<App> {
    let pool = SqlitePoolManager::new(&config.database_url)
        .await
        .with_context(|| format!("Open database {}", config.database_url))?;

    let conversations = Arc::new(
        ConversationRepository::with_pool(pool.clone())
            .await
            .context("Initialize conversation tables")?,
    );
    let messages = Arc::new(
        MessageRepository::with_pool(pool.clone())
            .await
            .context("Initialize message tables")?,
    );
    let friendships = Arc::new(
        FriendshipRepository::with_pool(pool)
            .await
            .context("Initialize friendship table")?,
    );

    let mut service = MessagingService::new(conversations.clone(), messages)
        .with_page_limit(config.page_limit);
    if config.enforce_access {
        service = service.with_guard(AccessGuard::new(friendships.clone(), conversations));
    }

    info!(
        database_url = %config.database_url,
        enforce_access = config.enforce_access,
        "Messaging service ready"
    );

    Ok(App {
        service,
        friendships,
    })
}

/// Runs `command` and returns its result as JSON.
pub async fn execute(app: &App, command: Commands) -> Result<Value> {
    let service = &app.service;

    let value = match command {
        Commands::Befriend { user, other } => {
            app.friendships
                .add_friendship(&user, &other)
                .await
                .map_err(ChatError::from)?;
            json!({ "friends": [user, other] })
        }
        Commands::Create {
            user,
            kind,
            members,
            name,
        } => {
            let kind = match kind {
                Kind::Direct => ConversationType::Direct,
                Kind::Group => ConversationType::Group,
            };
            let conversation = service
                .create_conversation(&user, kind, &members, name.as_deref())
                .await?;
            json!({ "conversation": conversation })
        }
        Commands::List { user, recipient } => {
            let conversations = service
                .find_conversations(&user, recipient.as_deref())
                .await?;
            json!({ "conversations": conversations })
        }
        Commands::Messages {
            user,
            conversation,
            limit,
            cursor,
        } => {
            let cursor = cursor
                .as_deref()
                .map(parse_cursor)
                .transpose()
                .map_err(ChatError::from)?;
            let page = service
                .get_messages_as(&user, &conversation, limit, cursor)
                .await?;
            serde_json::to_value(page)?
        }
        Commands::SendDirect {
            user,
            to,
            conversation,
            content,
        } => {
            let message = service
                .send_direct(&user, to.as_deref(), &content, conversation.as_deref())
                .await?;
            json!({ "message": message })
        }
        Commands::SendGroup {
            user,
            conversation,
            content,
        } => {
            let message = service.send_group(&user, &conversation, &content).await?;
            json!({ "message": message })
        }
        Commands::AddMember {
            user,
            conversation,
            member,
        } => {
            let conversation = service.add_member(&user, &conversation, &member).await?;
            json!({ "conversation": conversation })
        }
        Commands::Seen { user, conversation } => {
            serde_json::to_value(service.mark_as_seen(&conversation, &user).await?)?
        }
    };

    Ok(value)
}

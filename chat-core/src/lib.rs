//! # chat-core
//!
//! Domain types for the messaging core: [`Conversation`], [`Message`], seen/paging results,
//! the [`ChatError`] taxonomy, the collaborator traits consumed from the outer layers
//! ([`IdentityProvider`], [`GroupMembership`]) and tracing initialization.
//! Storage-agnostic; used by chat-storage, messaging and chat-cli.

pub mod error;
pub mod logger;
pub mod traits;
pub mod types;

pub use error::{ChatError, Result};
pub use logger::init_tracing;
pub use traits::{GroupMembership, IdentityProvider};
pub use types::{
    direct_key, timestamp_now, Conversation, ConversationType, GroupInfo, LastMessage, Message,
    MessagePage, NewConversation, Participant, SeenOutcome, SeenStatus,
};

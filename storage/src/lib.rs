//! Storage crate: SQLite persistence for conversations, messages and friendships.
//!
//! ## Modules
//!
//! - [`error`] – Storage error types and their mapping to `ChatError`
//! - [`models`] – Row types and timestamp conversion
//! - [`repository`] – `ConversationStore`, `MessageStore`, `FriendshipStore` traits
//! - [`conversation_repo`] – ConversationRepository (SQLite)
//! - [`message_repo`] – MessageRepository (SQLite)
//! - [`friendship_repo`] – FriendshipRepository (SQLite)
//! - [`sqlite_pool`] – SqlitePoolManager

mod conversation_repo;
mod error;
mod friendship_repo;
mod message_repo;
mod models;
mod repository;
mod sqlite_pool;


pub use conversation_repo::ConversationRepository;
pub use error::StorageError;
pub use friendship_repo::FriendshipRepository;
pub use message_repo::{parse_cursor, MessageRepository};
pub use repository::{ConversationStore, FriendshipStore, MessageStore};
pub use sqlite_pool::SqlitePoolManager;

//! # messaging
//!
//! Conversation/messaging core: resolving or creating conversations, appending messages,
//! keeping each conversation's last-message summary and unread counters in step, and
//! seen tracking.
//!
//! - [`MessagingService`] – every operation exposed to the HTTP layer
//! - [`update`] – applies a newly appended message to its conversation
//! - [`seen`] – marks a conversation as seen by a member
//! - [`AccessGuard`] – friendship and membership gates

mod guard;
mod service;
pub mod seen;
pub mod update;

pub use guard::AccessGuard;
pub use service::{MessagingService, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};

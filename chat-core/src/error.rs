use thiserror::Error;

/// Failure kinds of every public messaging operation.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Missing conversation: a conversation id or a recipient is required")]
    MissingConversation,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl ChatError {
    /// True for caller mistakes (bad input, unknown ids, denied access); false for infrastructure failures.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ChatError::Persistence(_) | ChatError::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;

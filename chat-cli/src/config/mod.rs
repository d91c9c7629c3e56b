//! Chat configuration: database, logging, paging and access enforcement. Loaded from env.

use std::env;

use anyhow::Result;
use chat_core::ChatError;
use messaging::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};


#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// DATABASE_URL
    pub database_url: String,
    /// LOG_FILE
    pub log_file: String,
    /// MESSAGE_PAGE_LIMIT: page size when a request gives none
    pub page_limit: u32,
    /// ENFORCE_ACCESS: check friendship / membership before messaging
    pub enforce_access: bool,
}

impl ChatConfig {
    /// Load from environment variables (call `dotenvy::dotenv()` first to pick up `.env`).
    pub fn load() -> Result<Self> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://./chat.db".to_string());
        let log_file = env::var("LOG_FILE").unwrap_or_else(|_| "logs/chat.log".to_string());
        let page_limit = match env::var("MESSAGE_PAGE_LIMIT") {
            Ok(raw) => raw.trim().parse::<u32>().map_err(|_| {
                ChatError::Config(format!("MESSAGE_PAGE_LIMIT is not a number: {}", raw))
            })?,
            Err(_) => DEFAULT_PAGE_LIMIT,
        };
        let enforce_access = match env::var("ENFORCE_ACCESS") {
            Ok(raw) => parse_bool(&raw).ok_or_else(|| {
                ChatError::Config(format!("ENFORCE_ACCESS must be true or false: {}", raw))
            })?,
            Err(_) => true,
        };

        Ok(Self {
            database_url,
            log_file,
            page_limit,
            enforce_access,
        })
    }

    /// Validate config (non-empty database URL, page limit in range).
    pub fn validate(&self) -> Result<()> {
        if self.database_url.trim().is_empty() {
            return Err(ChatError::Config("DATABASE_URL must not be empty".to_string()).into());
        }
        if self.page_limit == 0 || self.page_limit > MAX_PAGE_LIMIT {
            return Err(ChatError::Config(format!(
                "MESSAGE_PAGE_LIMIT must be between 1 and {}, got {}",
                MAX_PAGE_LIMIT, self.page_limit
            ))
            .into());
        }
        Ok(())
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

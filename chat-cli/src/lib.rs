//! # chat-cli
//!
//! Command-line front end for the messaging core: argument parsing, config loading and
//! one-shot execution of each operation against a SQLite database.

pub mod app;
pub mod cli;
pub mod config;

pub use app::{build_service, execute};
pub use cli::{Cli, Commands};
pub use config::ChatConfig;

//! CLI parser.

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "chat")]
#[command(about = "Conversation and messaging CLI", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Kind {
    Direct,
    Group,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Record that two users are friends (direct messaging requires it when access is enforced).
    Befriend {
        #[arg(short, long)]
        user: String,
        #[arg(short, long)]
        other: String,
    },
    /// Create a direct conversation (first member) or a group.
    Create {
        #[arg(short, long)]
        user: String,
        #[arg(short, long, value_enum)]
        kind: Kind,
        #[arg(short, long = "member", required = true)]
        members: Vec<String>,
        #[arg(short, long)]
        name: Option<String>,
    },
    /// List the user's conversations, most recent first.
    List {
        #[arg(short, long)]
        user: String,
        /// Only the direct conversation with this user.
        #[arg(short, long)]
        recipient: Option<String>,
    },
    /// Print one page of a conversation's messages, oldest first.
    Messages {
        #[arg(short, long)]
        user: String,
        #[arg(short, long)]
        conversation: String,
        #[arg(short, long)]
        limit: Option<u32>,
        /// `nextCursor` from the previous page.
        #[arg(long)]
        cursor: Option<String>,
    },
    /// Send a direct message.
    SendDirect {
        #[arg(short, long)]
        user: String,
        #[arg(short, long)]
        to: Option<String>,
        #[arg(short, long)]
        conversation: Option<String>,
        content: String,
    },
    /// Send a message to a group.
    SendGroup {
        #[arg(short, long)]
        user: String,
        #[arg(short, long)]
        conversation: String,
        content: String,
    },
    /// Add a member to a group.
    AddMember {
        #[arg(short, long)]
        user: String,
        #[arg(short, long)]
        conversation: String,
        #[arg(short, long)]
        member: String,
    },
    /// Mark a conversation as seen by the user.
    Seen {
        #[arg(short, long)]
        user: String,
        #[arg(short, long)]
        conversation: String,
    },
}

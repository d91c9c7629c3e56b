//! Row models for the SQLite tables and timestamp conversion.
//!
//! Timestamps are stored as INTEGER microseconds since the Unix epoch so that
//! ordering and cursor comparisons happen on integers.

mod conversation_row;
mod message_row;

pub use conversation_row::{ConversationRow, ParticipantRow};
pub use message_row::MessageRow;

use chrono::{DateTime, Utc};

use crate::error::StorageError;

pub fn to_micros(at: DateTime<Utc>) -> i64 {
    at.timestamp_micros()
}

pub fn from_micros(micros: i64) -> Result<DateTime<Utc>, StorageError> {
    let secs = micros.div_euclid(1_000_000);
    let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
    DateTime::<Utc>::from_timestamp(secs, nanos)
        .ok_or_else(|| StorageError::Corrupt(format!("timestamp out of range: {}", micros)))
}

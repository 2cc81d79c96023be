use crate::providers::{Message, Role};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A saved conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Creation time in epoch milliseconds, as a decimal string
    pub id: String,
    /// Title derived from the first user message, or set by rename
    pub title: String,
    /// Full thread, system message first
    pub messages: Vec<Message>,
}

impl Session {
    /// When the session was created, recovered from its id
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        let millis: i64 = self.id.parse().ok()?;
        Utc.timestamp_millis_opt(millis).single()
    }

    /// Number of user/assistant messages (the system message is not counted)
    pub fn visible_message_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role != Role::System)
            .count()
    }

    /// Listing view of this session
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            created_at: self.created_at(),
            message_count: self.visible_message_count(),
        }
    }
}

/// Metadata for listing a stored session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Unique identifier for the session
    pub id: String,
    /// User-friendly title
    pub title: String,
    /// When the session was created, if the id is a timestamp
    pub created_at: Option<DateTime<Utc>>,
    /// Number of user/assistant messages
    pub message_count: usize,
}

/// One line of the activity log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    /// Human-readable description of what happened
    pub action: String,
    /// ISO-8601 timestamp
    pub time: String,
}

impl ActivityEntry {
    /// Parsed timestamp, if the stored string is valid RFC 3339
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.time)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

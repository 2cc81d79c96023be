//! Bounded log of user actions, newest first

use super::types::ActivityEntry;
use super::{KeyValueStore, ACTIVITY_KEY};
use crate::error::Result;
use chrono::{SecondsFormat, Utc};
use std::sync::Arc;

/// Maximum number of entries kept; older entries are evicted
pub const MAX_ACTIVITY_ENTRIES: usize = 20;

/// Action recorded when a past chat is opened
pub const LOADED_CHAT: &str = "Loaded a past chat from history.";
/// Action recorded when a chat is deleted
pub const DELETED_CHAT: &str = "Deleted a chat from history.";

/// Action recorded when a chat is renamed
pub fn renamed_chat(title: &str) -> String {
    format!("Renamed chat to \"{}\"", title)
}

/// Activity log persisted under [`ACTIVITY_KEY`]
#[derive(Clone)]
pub struct ActivityLog {
    store: Arc<dyn KeyValueStore>,
}

impl ActivityLog {
    /// Create a log over the given store
    ///
    /// # Arguments
    ///
    /// * `store` - Backing key/value store; nothing is read until
    ///   [`entries`](Self::entries) or [`record`](Self::record) is called
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Entries, newest first
    ///
    /// # Returns
    ///
    /// Returns at most [`MAX_ACTIVITY_ENTRIES`] entries. A missing or
    /// unreadable value reads as an empty log.
    ///
    /// # Errors
    ///
    /// Returns the backing store's read error
    pub fn entries(&self) -> Result<Vec<ActivityEntry>> {
        let Some(raw) = self.store.get(ACTIVITY_KEY)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                tracing::warn!("Ignoring unreadable activity log: {}", e);
                Ok(Vec::new())
            }
        }
    }

    /// Prepend an entry stamped with the current time, evicting the oldest
    /// entries beyond [`MAX_ACTIVITY_ENTRIES`]
    ///
    /// # Arguments
    ///
    /// * `action` - Human-readable description of what happened
    ///
    /// # Errors
    ///
    /// Returns the backing store's read or write error; an unreadable log is
    /// replaced rather than reported
    pub fn record(&self, action: impl Into<String>) -> Result<()> {
        let entry = ActivityEntry {
            action: action.into(),
            time: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        tracing::debug!(action = %entry.action, "Recording activity");

        let mut entries = self.entries()?;
        entries.insert(0, entry);
        entries.truncate(MAX_ACTIVITY_ENTRIES);
        self.store
            .set(ACTIVITY_KEY, &serde_json::to_string(&entries)?)
    }

    /// Remove every entry
    ///
    /// # Errors
    ///
    /// Returns the backing store's remove error
    pub fn clear(&self) -> Result<()> {
        self.store.remove(ACTIVITY_KEY)
    }
}

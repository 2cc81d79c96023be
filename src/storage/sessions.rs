//! Saved conversations and the active thread
//!
//! [`SessionStore`] owns the session list (most recent first), which session
//! is active, and the message thread being displayed. Every mutation rewrites
//! the whole list under [`CHATS_KEY`]; there is no versioning, the last
//! writer wins.

use super::types::{Session, SessionSummary};
use super::{KeyValueStore, CHATS_KEY};
use crate::error::{QuantumError, Result};
use crate::providers::Message;
use chrono::Utc;
use std::sync::Arc;

/// Marker appended to truncated titles
pub const ELLIPSIS: &str = "...";

/// Result of [`SessionStore::delete`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// A session with the id existed and was removed
    pub removed: bool,
    /// The removed session was active; the thread is now empty
    pub cleared_active: bool,
}

/// Session list, active pointer, and active thread
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
    sessions: Vec<Session>,
    active_id: Option<String>,
    thread: Vec<Message>,
    title_max_length: usize,
}

impl SessionStore {
    /// Load the session list from storage
    ///
    /// # Arguments
    ///
    /// * `store` - Backing key/value store
    /// * `title_max_length` - Longest title kept, in characters
    ///
    /// # Returns
    ///
    /// Returns a store with no active session and an empty thread
    ///
    /// # Errors
    ///
    /// Returns `QuantumError::Storage` when the stored value is not a valid
    /// session list; the stored value is left untouched so it can be
    /// recovered.
    pub fn open(store: Arc<dyn KeyValueStore>, title_max_length: usize) -> Result<Self> {
        let sessions = match store.get(CHATS_KEY)? {
            Some(raw) if !raw.trim().is_empty() => {
                serde_json::from_str::<Vec<Session>>(&raw).map_err(|e| {
                    QuantumError::Storage(format!("Stored chat history is corrupt: {}", e))
                })?
            }
            _ => Vec::new(),
        };

        tracing::debug!(count = sessions.len(), "Loaded stored sessions");

        Ok(Self {
            store,
            sessions,
            active_id: None,
            thread: Vec::new(),
            title_max_length,
        })
    }

    /// All sessions, most recent first
    pub fn list(&self) -> &[Session] {
        &self.sessions
    }

    /// Listing view of all sessions, most recent first
    pub fn summaries(&self) -> Vec<SessionSummary> {
        self.sessions.iter().map(Session::summary).collect()
    }

    /// Look up a session without changing anything
    pub fn load(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    /// Id of the active session; `None` while a new chat is unsaved
    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    /// Active session, if one is saved
    pub fn active(&self) -> Option<&Session> {
        self.active_id.as_deref().and_then(|id| self.load(id))
    }

    /// Messages of the conversation on screen
    pub fn thread(&self) -> &[Message] {
        &self.thread
    }

    /// Save the current thread as a new session at the head of the list
    ///
    /// The id is the current time in milliseconds, bumped past any existing
    /// id. The new session becomes active.
    ///
    /// # Arguments
    ///
    /// * `first_user_text` - Text the title is made from, truncated to the
    ///   maximum length
    ///
    /// # Returns
    ///
    /// Returns the id of the new session
    ///
    /// # Errors
    ///
    /// Returns `QuantumError::Storage` if the list cannot be written; the
    /// session is not added and the active session is unchanged.
    pub fn create(&mut self, first_user_text: &str) -> Result<String> {
        let id = self.next_id();
        let title = truncate_title(first_user_text, self.title_max_length);

        self.sessions.insert(
            0,
            Session {
                id: id.clone(),
                title,
                messages: self.thread.clone(),
            },
        );
        let previous_active = self.active_id.replace(id.clone());
        if let Err(e) = self.persist() {
            self.sessions.remove(0);
            self.active_id = previous_active;
            return Err(e);
        }

        tracing::info!(id = %id, "Created session");
        Ok(id)
    }

    /// Retitle a session
    ///
    /// # Arguments
    ///
    /// * `id` - Session to retitle
    /// * `new_title` - Title to store, trimmed and truncated
    ///
    /// # Returns
    ///
    /// Returns `false` without touching storage when the id is unknown or the
    /// title is blank
    ///
    /// # Errors
    ///
    /// Returns `QuantumError::Storage` if the list cannot be written; the old
    /// title is kept.
    pub fn rename(&mut self, id: &str, new_title: &str) -> Result<bool> {
        let new_title = new_title.trim();
        if new_title.is_empty() {
            return Ok(false);
        }

        let title = truncate_title(new_title, self.title_max_length);
        let Some(index) = self.position(id) else {
            return Ok(false);
        };
        let previous = std::mem::replace(&mut self.sessions[index].title, title);
        if let Err(e) = self.persist() {
            self.sessions[index].title = previous;
            return Err(e);
        }

        tracing::info!(id = %id, "Renamed session");
        Ok(true)
    }

    /// Remove a session
    ///
    /// Deleting the active session also clears the active pointer and the
    /// thread.
    ///
    /// # Arguments
    ///
    /// * `id` - Session to remove
    ///
    /// # Returns
    ///
    /// Returns what was removed; an unknown id removes nothing and writes
    /// nothing
    ///
    /// # Errors
    ///
    /// Returns `QuantumError::Storage` if the list cannot be written; the
    /// session, the active pointer and the thread are all kept.
    pub fn delete(&mut self, id: &str) -> Result<DeleteOutcome> {
        let Some(index) = self.position(id) else {
            return Ok(DeleteOutcome {
                removed: false,
                cleared_active: false,
            });
        };

        let removed = self.sessions.remove(index);
        if let Err(e) = self.persist() {
            self.sessions.insert(index, removed);
            return Err(e);
        }

        let cleared_active = self.active_id.as_deref() == Some(id);
        if cleared_active {
            self.start_new();
        }

        tracing::info!(id = %id, cleared_active, "Deleted session");
        Ok(DeleteOutcome {
            removed: true,
            cleared_active,
        })
    }

    /// Make a saved session active and show its messages
    ///
    /// Returns `false` and leaves the current thread alone when the id is
    /// unknown.
    pub fn activate(&mut self, id: &str) -> bool {
        let Some(session) = self.sessions.iter().find(|s| s.id == id) else {
            return false;
        };
        self.thread = session.messages.clone();
        self.active_id = Some(session.id.clone());
        true
    }

    /// Leave the active session and start an empty, unsaved thread
    pub fn start_new(&mut self) {
        self.active_id = None;
        self.thread.clear();
    }

    /// Write the whole session list to storage
    ///
    /// # Errors
    ///
    /// Returns a serialization error or the backing store's write error
    pub fn persist(&self) -> Result<()> {
        let json = serde_json::to_string(&self.sessions)?;
        self.store.set(CHATS_KEY, &json)
    }

    pub(crate) fn push_message(&mut self, message: Message) {
        self.thread.push(message);
    }

    pub(crate) fn truncate_thread(&mut self, len: usize) {
        self.thread.truncate(len);
    }

    /// Save the thread after a successful turn
    ///
    /// Creates the session on the first turn; afterwards overwrites the
    /// active session's messages. Returns the id and whether it is new. On
    /// a write failure the session list is left as it was; the caller owns
    /// rolling back the thread.
    pub(crate) fn commit_thread(&mut self, first_user_text: &str) -> Result<(String, bool)> {
        let Some(id) = self.active_id.clone() else {
            let id = self.create(first_user_text)?;
            return Ok((id, true));
        };

        let index = self.position(&id);
        let previous = match index {
            Some(index) => Some(std::mem::replace(
                &mut self.sessions[index].messages,
                self.thread.clone(),
            )),
            None => {
                tracing::warn!(id = %id, "Active session missing from store");
                None
            }
        };
        if let Err(e) = self.persist() {
            if let (Some(index), Some(messages)) = (index, previous) {
                self.sessions[index].messages = messages;
            }
            return Err(e);
        }
        Ok((id, false))
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.sessions.iter().position(|s| s.id == id)
    }

    fn next_id(&self) -> String {
        let mut millis = Utc::now().timestamp_millis();
        loop {
            let candidate = millis.to_string();
            if !self.sessions.iter().any(|s| s.id == candidate) {
                return candidate;
            }
            millis += 1;
        }
    }
}

/// Shorten `text` to at most `max_len` characters, ending in [`ELLIPSIS`]
/// when anything was cut
///
/// # Examples
///
/// ```
/// use quantum_chat::storage::sessions::truncate_title;
///
/// assert_eq!(truncate_title("short", 50), "short");
/// let long = "x".repeat(60);
/// let title = truncate_title(&long, 50);
/// assert_eq!(title.chars().count(), 50);
/// assert!(title.ends_with("..."));
/// ```
pub fn truncate_title(text: &str, max_len: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let keep = max_len.saturating_sub(ELLIPSIS.len());
    let mut title: String = text.chars().take(keep).collect();
    title.push_str(ELLIPSIS);
    title
}

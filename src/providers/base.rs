//! Base provider trait and common message types
//!
//! This module defines the Provider trait that completion backends implement,
//! along with the message type shared by the thread, the persisted sessions,
//! and the wire format.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Fixed instructions at the head of a thread
    System,
    /// Text typed by the user
    User,
    /// Text returned by the model
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// Message structure for conversation
///
/// Serializes as `{ "role": "...", "content": "..." }`, which is both the
/// stored form and the request form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: Role,
    /// Content of the message
    pub content: String,
}

impl Message {
    /// Creates a new user message
    ///
    /// # Examples
    ///
    /// ```
    /// use quantum_chat::providers::{Message, Role};
    ///
    /// let msg = Message::user("Hello, assistant!");
    /// assert_eq!(msg.role, Role::User);
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Creates a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Outcome of checking whether a model answers on the endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResult {
    /// The model answered a short prompt
    Pass,
    /// The endpoint rejected the request (message from the API)
    Fail(String),
    /// The request never completed
    Unreachable(String),
}

/// Completion backend
///
/// Implementations perform exactly one request per call: no retries.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Completes a conversation and returns the assistant text
    ///
    /// # Arguments
    ///
    /// * `messages` - Full thread, system message first
    /// * `model` - Model identifier to request
    /// * `api_key` - Bearer credential
    ///
    /// # Errors
    ///
    /// `QuantumError::Transport` on network failure, `QuantumError::Api` on
    /// non-2xx responses, `QuantumError::MalformedResponse` when a 2xx body
    /// lacks the completion text.
    async fn complete(&self, messages: &[Message], model: &str, api_key: &str) -> Result<String>;

    /// Sends a tiny prompt to check that a model is served
    ///
    /// The default implementation calls `complete` with a one-message thread.
    async fn probe(&self, model: &str, api_key: &str) -> ProbeResult {
        match self.complete(&[Message::user("Hi")], model, api_key).await {
            Ok(_) => ProbeResult::Pass,
            Err(e) => match e.downcast_ref::<crate::error::QuantumError>() {
                Some(crate::error::QuantumError::Api { message, .. }) => {
                    ProbeResult::Fail(message.clone())
                }
                _ => ProbeResult::Unreachable(e.to_string()),
            },
        }
    }
}

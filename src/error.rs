//! Error types for Quantum Chat
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Quantum Chat operations
///
/// Covers the turn taxonomy (validation, credentials, transport, API) as well
/// as configuration and storage failures.
#[derive(Error, Debug)]
pub enum QuantumError {
    /// Input rejected before any state change (e.g. an empty message)
    #[error("Validation error: {0}")]
    Validation(String),

    /// No API key configured for the completion endpoint
    #[error("No API key configured. Set one with `/key <key>` or `quantum settings set-key <key>`")]
    MissingCredential,

    /// A turn is already awaiting a response
    #[error("A message is already being sent; wait for the reply before sending another")]
    TurnInProgress,

    /// Network failure talking to the completion endpoint
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-2xx response from the completion endpoint
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code returned by the endpoint
        status: u16,
        /// `error.message` from the body, or `HTTP <status>`
        message: String,
    },

    /// Successful response whose body lacks the expected completion text
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Persisted state could not be read or written
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP client construction errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl QuantumError {
    /// Whether the error ends a turn and should be shown inline in the thread
    /// rather than aborting the session.
    pub fn is_turn_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::MissingCredential
                | Self::TurnInProgress
                | Self::Transport(_)
                | Self::Api { .. }
                | Self::MalformedResponse(_)
        )
    }
}

/// Result type alias for Quantum Chat operations
///
/// Uses `anyhow::Error` so callers can attach context; branch on kind with
/// `err.downcast_ref::<QuantumError>()`.
pub type Result<T> = anyhow::Result<T>;

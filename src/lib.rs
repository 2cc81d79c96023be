//! Quantum Chat - terminal chat client library
//!
//! This library provides the core of Quantum Chat: saved conversations, the
//! request/response turn cycle against an OpenAI-compatible completion
//! endpoint, persisted settings and a bounded activity log.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `storage`: Key/value persistence, sessions, settings and activity
//! - `turn`: One user message in, one assistant reply out
//! - `providers`: Completion backend abstraction and the Groq implementation
//! - `render`: Terminal rendering of Markdown replies
//! - `commands`: Handlers behind the CLI subcommands and chat slash commands
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use quantum_chat::commands::chat::ChatSession;
//! use quantum_chat::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     config.validate()?;
//!
//!     let chat = ChatSession::open(&config)?;
//!     println!("{}", chat.submit("What is a monad?").await);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod providers;
pub mod render;
pub mod storage;
pub mod turn;

// Re-export commonly used types
pub use config::Config;
pub use error::{QuantumError, Result};
pub use turn::{TurnController, TurnOutcome, TurnState};

#[cfg(test)]
pub mod test_utils;

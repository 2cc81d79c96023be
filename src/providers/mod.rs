//! Provider module for Quantum Chat
//!
//! This module contains the completion backend abstraction and the
//! OpenAI-compatible implementation used against Groq.

pub mod base;
pub mod groq;

pub use base::{Message, ProbeResult, Provider, Role};
pub use groq::GroqProvider;

use crate::config::ApiConfig;
use crate::error::Result;
use std::sync::Arc;

/// Models offered for selection, fastest general-purpose model first
pub const KNOWN_MODELS: &[&str] = &[
    "llama-3.3-70b-versatile",
    "llama-3.1-8b-instant",
    "llama3-70b-8192",
    "llama3-8b-8192",
    "llama-3.2-3b-preview",
    "llama-3.2-1b-preview",
    "llama-guard-3-8b",
    "deepseek-r1-distill-llama-70b",
    "deepseek-r1-distill-llama-70b-specdec",
    "mixtral-8x7b-32768",
    "mistral-saba-24b",
    "qwen-2.5-32b",
    "qwen-2.5-coder-32b",
    "gemma2-9b-it",
];

/// Create the provider described by the API configuration
///
/// # Errors
///
/// Returns error if the HTTP client cannot be built
pub fn create_provider(config: &ApiConfig) -> Result<Arc<dyn Provider>> {
    Ok(Arc::new(GroqProvider::new(config)?))
}

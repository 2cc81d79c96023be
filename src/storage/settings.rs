//! Persisted user settings: selected model and API key

use super::{KeyValueStore, API_KEY_KEY, MODEL_KEY};
use crate::config::ApiConfig;
use crate::error::Result;
use std::sync::Arc;

/// Selected model and credential, falling back to configuration
///
/// Saved values win over configuration. Blank saved values count as unset.
#[derive(Clone)]
pub struct Settings {
    store: Arc<dyn KeyValueStore>,
    default_model: String,
    fallback_api_key: Option<String>,
}

impl Settings {
    /// Create settings over `store` with defaults from the API configuration
    ///
    /// # Arguments
    ///
    /// * `store` - Backing key/value store
    /// * `api` - Supplies the default model and an optional fallback key
    pub fn new(store: Arc<dyn KeyValueStore>, api: &ApiConfig) -> Self {
        Self {
            store,
            default_model: api.default_model.clone(),
            fallback_api_key: api
                .api_key
                .as_ref()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
        }
    }

    /// API key to send, if any is configured
    ///
    /// # Returns
    ///
    /// Returns the saved key, else the configured key, else `None`
    ///
    /// # Errors
    ///
    /// Returns the backing store's read error
    pub fn api_key(&self) -> Result<Option<String>> {
        Ok(self
            .stored(API_KEY_KEY)?
            .or_else(|| self.fallback_api_key.clone()))
    }

    /// Whether the key in use was saved by the user (as opposed to coming
    /// from configuration)
    ///
    /// # Errors
    ///
    /// Returns the backing store's read error
    pub fn has_saved_api_key(&self) -> Result<bool> {
        Ok(self.stored(API_KEY_KEY)?.is_some())
    }

    /// Save the API key
    ///
    /// # Arguments
    ///
    /// * `key` - Credential to save, trimmed; a blank key reads as unset
    ///
    /// # Errors
    ///
    /// Returns the backing store's write error
    pub fn set_api_key(&self, key: &str) -> Result<()> {
        self.store.set(API_KEY_KEY, key.trim())
    }

    /// Forget the saved API key
    ///
    /// # Errors
    ///
    /// Returns the backing store's remove error
    pub fn clear_api_key(&self) -> Result<()> {
        self.store.remove(API_KEY_KEY)
    }

    /// Model to request
    ///
    /// # Returns
    ///
    /// Returns the saved model, or the configured default when none is saved
    ///
    /// # Errors
    ///
    /// Returns the backing store's read error
    pub fn model(&self) -> Result<String> {
        Ok(self
            .stored(MODEL_KEY)?
            .unwrap_or_else(|| self.default_model.clone()))
    }

    /// Save the selected model
    ///
    /// # Arguments
    ///
    /// * `model` - Model identifier; not checked against the known list
    ///
    /// # Errors
    ///
    /// Returns the backing store's write error
    pub fn set_model(&self, model: &str) -> Result<()> {
        self.store.set(MODEL_KEY, model.trim())
    }

    fn stored(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .store
            .get(key)?
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()))
    }
}

/// Show only the first and last few characters of a key
///
/// # Examples
///
/// ```
/// use quantum_chat::storage::settings::mask_key;
///
/// assert_eq!(mask_key("gsk_abcdefghijklmnop"), "gsk_...mnop");
/// assert_eq!(mask_key("short"), "****");
/// ```
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() < 12 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

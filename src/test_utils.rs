//! Test utilities for Quantum Chat
//!
//! This module provides a scripted provider, a controller wired to an
//! in-memory store, and assertion helpers.

use crate::config::ApiConfig;
use crate::error::{QuantumError, Result};
use crate::providers::{Message, Provider};
use crate::storage::{KeyValueStore, MemoryStore, SessionStore, Settings};
use crate::turn::TurnController;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Create a temporary directory for testing
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Provider that returns scripted replies and records what it was sent
#[derive(Default)]
pub struct FakeProvider {
    replies: Mutex<VecDeque<std::result::Result<String, QuantumError>>>,
    calls: Mutex<Vec<Vec<Message>>>,
    models: Mutex<Vec<String>>,
    delay: Mutex<Option<Duration>>,
}

impl FakeProvider {
    /// Provider answering with `replies` in order
    pub fn replying<I, S>(replies: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let provider = Self::default();
        provider
            .replies
            .lock()
            .expect("replies lock")
            .extend(replies.into_iter().map(|r| Ok(r.into())));
        Arc::new(provider)
    }

    /// Sleep this long inside every completion
    pub fn with_delay(self: Arc<Self>, delay: Duration) -> Arc<Self> {
        *self.delay.lock().expect("delay lock") = Some(delay);
        self
    }

    /// Make the next completion fail with `error`
    pub fn fail_next(&self, error: QuantumError) {
        self.replies
            .lock()
            .expect("replies lock")
            .push_front(Err(error));
    }

    /// Threads received, one per call
    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().expect("calls lock").clone()
    }

    /// Models requested, one per call
    pub fn models(&self) -> Vec<String> {
        self.models.lock().expect("models lock").clone()
    }
}

#[async_trait]
impl Provider for FakeProvider {
    async fn complete(&self, messages: &[Message], model: &str, _api_key: &str) -> Result<String> {
        self.calls
            .lock()
            .expect("calls lock")
            .push(messages.to_vec());
        self.models
            .lock()
            .expect("models lock")
            .push(model.to_string());

        let delay = *self.delay.lock().expect("delay lock");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.replies.lock().expect("replies lock").pop_front();
        match next {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(e)) => Err(e.into()),
            None => Err(QuantumError::Transport("no scripted reply".to_string()).into()),
        }
    }
}

/// In-memory store that refuses writes to one key while armed
pub struct RejectingStore {
    inner: MemoryStore,
    key: String,
    armed: AtomicBool,
}

impl RejectingStore {
    /// Store failing every `set` of `key` until disarmed
    pub fn rejecting(key: &str) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryStore::new(),
            key: key.to_string(),
            armed: AtomicBool::new(true),
        })
    }

    /// Start or stop rejecting writes
    pub fn set_armed(&self, armed: bool) {
        self.armed.store(armed, Ordering::SeqCst);
    }
}

impl KeyValueStore for RejectingStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if key == self.key && self.armed.load(Ordering::SeqCst) {
            return Err(QuantumError::Storage(format!("write to {} rejected", key)).into());
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.inner.remove(key)
    }
}

/// Controller over a fresh in-memory store, optionally with a saved API key
pub fn test_controller(
    provider: Arc<FakeProvider>,
    api_key: Option<&str>,
) -> (TurnController, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let controller = test_controller_with_store(provider, store.clone(), api_key);
    (controller, store)
}

/// Controller over a caller-supplied store
pub fn test_controller_with_store(
    provider: Arc<FakeProvider>,
    store: Arc<dyn KeyValueStore>,
    api_key: Option<&str>,
) -> TurnController {
    let settings = Settings::new(store.clone(), &ApiConfig::default());
    if let Some(key) = api_key {
        settings.set_api_key(key).expect("save api key");
    }
    let sessions = SessionStore::open(store, 50).expect("open sessions");
    TurnController::new(
        provider,
        Arc::new(tokio::sync::Mutex::new(sessions)),
        settings,
        "You are a test assistant.",
    )
}

/// Assert that an error is a `QuantumError` matching `pred`
pub fn assert_quantum_error(err: &anyhow::Error, pred: impl Fn(&QuantumError) -> bool) {
    match err.downcast_ref::<QuantumError>() {
        Some(e) => assert!(pred(e), "Unexpected error kind: {:?}", e),
        None => panic!("Expected a QuantumError, got: {:#}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_dir_creation() {
        let dir = temp_dir();
        assert!(dir.path().exists());
    }

    #[tokio::test]
    async fn test_fake_provider_scripted_order() {
        let provider = FakeProvider::replying(["a", "b"]);
        provider.fail_next(QuantumError::Transport("down".to_string()));

        assert!(provider.complete(&[], "m", "k").await.is_err());
        assert_eq!(provider.complete(&[], "m", "k").await.unwrap(), "a");
        assert_eq!(provider.complete(&[], "m", "k").await.unwrap(), "b");
        assert!(provider.complete(&[], "m", "k").await.is_err());
        assert_eq!(provider.calls().len(), 4);
    }

    #[test]
    fn test_rejecting_store_only_blocks_its_key() {
        let store = RejectingStore::rejecting("quantumChats");
        assert!(store.set("quantumChats", "[]").is_err());
        store.set("groqModel", "m").unwrap();
        store.set_armed(false);
        store.set("quantumChats", "[]").unwrap();
        assert_eq!(store.get("quantumChats").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    #[should_panic(expected = "Unexpected error kind")]
    fn test_assert_quantum_error_wrong_kind() {
        let err: anyhow::Error = QuantumError::TurnInProgress.into();
        assert_quantum_error(&err, |e| matches!(e, QuantumError::MissingCredential));
    }
}

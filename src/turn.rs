//! Request/response cycle for one user message
//!
//! A [`TurnController`] appends the user message to the active thread, asks
//! the provider for a completion, appends the reply and saves the session.
//! A failed turn leaves the thread exactly as it was before the turn.
//!
//! Only one turn runs at a time: a send issued while another is awaiting its
//! response fails with [`QuantumError::TurnInProgress`]. The session store
//! stays locked for the whole turn, so other store operations wait for it.

use crate::error::{QuantumError, Result};
use crate::providers::{Message, Provider};
use crate::storage::{SessionStore, Settings};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;

/// Turn controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// Ready to send
    Idle,
    /// A request is in flight
    AwaitingResponse,
}

/// Result of a successful turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    /// Session the turn was saved to
    pub session_id: String,
    /// Assistant text
    pub reply: String,
    /// The session was created by this turn
    pub new_session: bool,
}

/// Runs turns against the shared session store
pub struct TurnController {
    provider: Arc<dyn Provider>,
    sessions: Arc<Mutex<SessionStore>>,
    settings: Settings,
    system_prompt: String,
    state: StdMutex<TurnState>,
}

/// Puts the controller back to `Idle` however the turn ends
struct TurnGuard<'a> {
    state: &'a StdMutex<TurnState>,
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        *state = TurnState::Idle;
    }
}

impl TurnController {
    /// Create a controller
    ///
    /// # Arguments
    ///
    /// * `provider` - Completion backend
    /// * `sessions` - Session store shared with whatever renders the UI
    /// * `settings` - Source of the API key and selected model
    /// * `system_prompt` - Message placed at the head of every new thread
    pub fn new(
        provider: Arc<dyn Provider>,
        sessions: Arc<Mutex<SessionStore>>,
        settings: Settings,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            sessions,
            settings,
            system_prompt: system_prompt.into(),
            state: StdMutex::new(TurnState::Idle),
        }
    }

    /// Current state
    pub fn state(&self) -> TurnState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Shared session store
    pub fn sessions(&self) -> Arc<Mutex<SessionStore>> {
        Arc::clone(&self.sessions)
    }

    /// Settings used for each turn
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Send one user message and wait for the reply
    ///
    /// # Errors
    ///
    /// * `Validation` - `text` is blank; nothing changes
    /// * `TurnInProgress` - another turn is awaiting its response
    /// * `MissingCredential` - no API key; the thread is untouched
    /// * `Transport` / `Api` / `MalformedResponse` - the thread is rolled back
    ///   to its pre-turn length
    /// * `Storage` - the reply could not be saved; the thread and the session
    ///   list are rolled back as for a provider failure
    pub async fn send(&self, text: &str) -> Result<TurnOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Err(QuantumError::Validation("message is empty".to_string()).into());
        }

        let _turn = self.begin_turn()?;

        let api_key = self
            .settings
            .api_key()?
            .ok_or(QuantumError::MissingCredential)?;
        let model = self.settings.model()?;

        let mut sessions = self.sessions.lock().await;
        let checkpoint = sessions.thread().len();
        if checkpoint == 0 {
            sessions.push_message(Message::system(self.system_prompt.clone()));
        }
        sessions.push_message(Message::user(text));

        tracing::info!(
            model = %model,
            messages = sessions.thread().len(),
            "Sending turn"
        );

        let reply = match self
            .provider
            .complete(sessions.thread(), &model, &api_key)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                sessions.truncate_thread(checkpoint);
                tracing::warn!("Turn failed, thread rolled back: {}", e);
                return Err(e);
            }
        };

        sessions.push_message(Message::assistant(reply.clone()));
        let (session_id, new_session) = match sessions.commit_thread(text) {
            Ok(committed) => committed,
            Err(e) => {
                sessions.truncate_thread(checkpoint);
                tracing::warn!("Saving turn failed, thread rolled back: {}", e);
                return Err(e);
            }
        };

        tracing::debug!(session = %session_id, new_session, "Turn complete");
        Ok(TurnOutcome {
            session_id,
            reply,
            new_session,
        })
    }

    fn begin_turn(&self) -> Result<TurnGuard<'_>> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if *state == TurnState::AwaitingResponse {
            return Err(QuantumError::TurnInProgress.into());
        }
        *state = TurnState::AwaitingResponse;
        Ok(TurnGuard { state: &self.state })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::Role;
    use crate::storage::{KeyValueStore, CHATS_KEY};
    use crate::test_utils::{
        assert_quantum_error, test_controller, test_controller_with_store, FakeProvider,
        RejectingStore,
    };
    use std::time::Duration;

    #[tokio::test]
    async fn test_successful_send_appends_user_then_assistant() {
        let provider = FakeProvider::replying(["Hello there!"]);
        let (controller, backing) = test_controller(provider.clone(), Some("gsk_test"));

        let outcome = controller.send("Hi").await.unwrap();
        assert!(outcome.new_session);
        assert_eq!(outcome.reply, "Hello there!");

        let sessions = controller.sessions();
        let sessions = sessions.lock().await;
        let thread = sessions.thread();
        assert_eq!(thread.len(), 3);
        assert_eq!(thread[0].role, Role::System);
        assert_eq!(thread[1], Message::user("Hi"));
        assert_eq!(thread[2], Message::assistant("Hello there!"));
        assert_eq!(sessions.active_id(), Some(outcome.session_id.as_str()));
        assert_eq!(sessions.load(&outcome.session_id).unwrap().title, "Hi");
        assert!(backing.get(CHATS_KEY).unwrap().is_some());
        assert_eq!(controller.state(), TurnState::Idle);
    }

    #[tokio::test]
    async fn test_second_turn_appends_exactly_two_messages() {
        let provider = FakeProvider::replying(["one", "two"]);
        let (controller, _) = test_controller(provider.clone(), Some("gsk_test"));

        let first = controller.send("Hi").await.unwrap();
        let before = controller.sessions().lock().await.thread().len();
        let second = controller.send("  Again  ").await.unwrap();

        assert!(!second.new_session);
        assert_eq!(second.session_id, first.session_id);

        let sessions = controller.sessions();
        let sessions = sessions.lock().await;
        let thread = sessions.thread();
        assert_eq!(thread.len(), before + 2);
        assert_eq!(thread[before], Message::user("Again"));
        assert_eq!(thread[before + 1], Message::assistant("two"));
        assert_eq!(
            sessions.load(&first.session_id).unwrap().messages.len(),
            before + 2
        );

        // The provider saw the whole thread, system message first.
        let calls = provider.calls();
        assert_eq!(calls[1].len(), 4);
        assert_eq!(calls[1][0].role, Role::System);
    }

    #[tokio::test]
    async fn test_missing_credential_leaves_thread_unchanged() {
        let provider = FakeProvider::replying(["unused"]);
        let (controller, backing) = test_controller(provider.clone(), None);

        let err = controller.send("Hi").await.unwrap_err();
        assert_quantum_error(&err, |e| matches!(e, QuantumError::MissingCredential));

        let sessions = controller.sessions();
        assert!(sessions.lock().await.thread().is_empty());
        assert!(provider.calls().is_empty());
        assert!(backing.get(CHATS_KEY).unwrap().is_none());
        assert_eq!(controller.state(), TurnState::Idle);
    }

    #[tokio::test]
    async fn test_blank_input_is_rejected_before_any_change() {
        let provider = FakeProvider::replying(["unused"]);
        let (controller, _) = test_controller(provider.clone(), Some("gsk_test"));

        let err = controller.send("   \n ").await.unwrap_err();
        assert_quantum_error(&err, |e| matches!(e, QuantumError::Validation(_)));
        assert!(provider.calls().is_empty());
        assert_eq!(controller.state(), TurnState::Idle);
    }

    #[tokio::test]
    async fn test_provider_failure_rolls_back() {
        let provider = FakeProvider::replying(["first reply"]);
        let (controller, _) = test_controller(provider.clone(), Some("gsk_test"));
        controller.send("Hi").await.unwrap();
        let before = controller.sessions().lock().await.thread().to_vec();

        provider.fail_next(QuantumError::Api {
            status: 500,
            message: "upstream down".to_string(),
        });
        let err = controller.send("Second").await.unwrap_err();
        assert_quantum_error(&err, |e| matches!(e, QuantumError::Api { status: 500, .. }));

        let sessions = controller.sessions();
        let sessions = sessions.lock().await;
        assert_eq!(sessions.thread(), before.as_slice());
        let saved = sessions.active().unwrap();
        assert_eq!(saved.messages, before);
        assert_eq!(controller.state(), TurnState::Idle);
    }

    #[tokio::test]
    async fn test_first_turn_failure_creates_no_session() {
        let provider = FakeProvider::replying(Vec::<String>::new());
        provider.fail_next(QuantumError::Transport("connection refused".to_string()));
        let (controller, _) = test_controller(provider, Some("gsk_test"));

        assert!(controller.send("Hi").await.is_err());

        let sessions = controller.sessions();
        let sessions = sessions.lock().await;
        assert!(sessions.thread().is_empty());
        assert!(sessions.list().is_empty());
        assert!(sessions.active_id().is_none());
    }

    #[tokio::test]
    async fn test_unsaved_first_turn_leaves_no_trace() {
        let store = RejectingStore::rejecting(CHATS_KEY);
        let controller =
            test_controller_with_store(FakeProvider::replying(["Hello"]), store, Some("gsk_test"));

        let err = controller.send("Hi").await.unwrap_err();
        assert_quantum_error(&err, |e| matches!(e, QuantumError::Storage(_)));

        let sessions = controller.sessions();
        let sessions = sessions.lock().await;
        assert!(sessions.thread().is_empty());
        assert!(sessions.list().is_empty());
        assert!(sessions.active_id().is_none());
        assert_eq!(controller.state(), TurnState::Idle);
    }

    #[tokio::test]
    async fn test_unsaved_follow_up_keeps_saved_messages() {
        let store = RejectingStore::rejecting(CHATS_KEY);
        store.set_armed(false);
        let controller = test_controller_with_store(
            FakeProvider::replying(["first", "second"]),
            store.clone(),
            Some("gsk_test"),
        );
        let first = controller.send("Hi").await.unwrap();

        store.set_armed(true);
        assert!(controller.send("Again").await.is_err());

        let sessions = controller.sessions();
        let sessions = sessions.lock().await;
        assert_eq!(sessions.thread().len(), 3);
        assert_eq!(sessions.active_id(), Some(first.session_id.as_str()));
        assert_eq!(sessions.active().unwrap().messages.len(), 3);
    }

    #[tokio::test]
    async fn test_overlapping_send_is_rejected() {
        let provider = FakeProvider::replying(["slow reply"]).with_delay(Duration::from_millis(50));
        let (controller, _) = test_controller(provider.clone(), Some("gsk_test"));

        let (first, second) = tokio::join!(controller.send("one"), async {
            tokio::task::yield_now().await;
            controller.send("two").await
        });

        let first = first.unwrap();
        assert_eq!(first.reply, "slow reply");
        let err = second.unwrap_err();
        assert_quantum_error(&err, |e| matches!(e, QuantumError::TurnInProgress));

        assert_eq!(provider.calls().len(), 1);
        let sessions = controller.sessions();
        assert_eq!(sessions.lock().await.thread().len(), 3);
        assert_eq!(controller.state(), TurnState::Idle);
    }

    #[tokio::test]
    async fn test_uses_selected_model() {
        let provider = FakeProvider::replying(["ok"]);
        let (controller, _) = test_controller(provider.clone(), Some("gsk_test"));
        controller.settings().set_model("gemma2-9b-it").unwrap();

        controller.send("Hi").await.unwrap();
        assert_eq!(provider.models(), vec!["gemma2-9b-it".to_string()]);
    }

    #[tokio::test]
    async fn test_send_after_start_new_creates_second_session() {
        let provider = FakeProvider::replying(["a", "b"]);
        let (controller, _) = test_controller(provider, Some("gsk_test"));

        let first = controller.send("First chat").await.unwrap();
        controller.sessions().lock().await.start_new();
        let second = controller.send("Second chat").await.unwrap();

        assert!(second.new_session);
        assert_ne!(first.session_id, second.session_id);
        let sessions = controller.sessions();
        let sessions = sessions.lock().await;
        assert_eq!(sessions.list()[0].title, "Second chat");
        assert_eq!(sessions.list()[1].title, "First chat");
    }
}

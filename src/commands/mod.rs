/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

- `chat`     — Interactive chat mode
- `ask`      — Send a single message from the command line
- `history`  — Saved chat management
- `activity` — Recent activity listing
- `settings` — API key and model selection
- `models`   — Model listing and availability checks
*/

use crate::config::Config;
use crate::error::Result;
use crate::storage::{KeyValueStore, SledStore};
use std::sync::Arc;

pub mod activity;
pub mod history;
pub mod models;
pub mod settings;

// Special commands parser for interactive chat
pub mod special_commands;

/// Open the persistent store described by the configuration
pub fn open_store(config: &Config) -> Result<Arc<dyn KeyValueStore>> {
    Ok(Arc::new(SledStore::from_config(&config.storage)?))
}

// Chat command handler
pub mod chat {
    //! Interactive chat mode handler.
    //!
    //! Runs a readline loop. Slash commands manage chats and settings; any
    //! other line is sent as a turn through the [`TurnController`].

    use super::history::{
        delete_session, not_renamed, open_session, print_sessions, rename_session,
    };
    use super::special_commands::{parse_special_command, print_help, SpecialCommand};
    use super::*;
    use crate::error::QuantumError;
    use crate::providers::create_provider;
    use crate::render;
    use crate::storage::{ActivityLog, SessionStore, Settings};
    use crate::turn::TurnController;
    use colored::Colorize;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    /// What the loop does after a command
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Flow {
        /// Keep reading input
        Continue,
        /// Leave the chat
        Exit,
    }

    /// Turn controller plus the activity log the chat commands write to
    pub struct ChatSession {
        controller: TurnController,
        activity: ActivityLog,
    }

    impl ChatSession {
        /// Wrap an existing controller
        pub fn new(controller: TurnController, activity: ActivityLog) -> Self {
            Self {
                controller,
                activity,
            }
        }

        /// Build everything from configuration: store, provider, session
        /// list and settings
        pub fn open(config: &Config) -> Result<Self> {
            let store = open_store(config)?;
            let provider = create_provider(&config.api)?;
            let sessions = SessionStore::open(store.clone(), config.chat.title_max_length)?;
            let settings = Settings::new(store.clone(), &config.api);
            let controller = TurnController::new(
                provider,
                Arc::new(tokio::sync::Mutex::new(sessions)),
                settings,
                config.chat.system_prompt.clone(),
            );
            Ok(Self::new(controller, ActivityLog::new(store)))
        }

        /// Underlying turn controller
        pub fn controller(&self) -> &TurnController {
            &self.controller
        }

        /// Open a saved chat and return its rendered thread
        pub async fn resume(&self, id: &str) -> Result<String> {
            let sessions = self.controller.sessions();
            let mut sessions = sessions.lock().await;
            if !open_session(&mut sessions, &self.activity, id)? {
                return Err(QuantumError::Validation(format!("No chat with id {}", id)).into());
            }
            Ok(render::render_thread(sessions.thread()))
        }

        /// Retitle a chat, defaulting to the active one
        ///
        /// # Returns
        ///
        /// Returns the stored (possibly truncated) title
        ///
        /// # Errors
        ///
        /// Returns `QuantumError::Validation` when nothing is active, the id is
        /// unknown or the title is blank; storage failures pass through
        pub async fn rename(&self, id: Option<String>, title: &str) -> Result<String> {
            let sessions = self.controller.sessions();
            let mut sessions = sessions.lock().await;
            let Some(id) = id.or_else(|| sessions.active_id().map(str::to_string)) else {
                return Err(QuantumError::Validation(
                    "Nothing to rename yet: send a message to save this chat first.".to_string(),
                )
                .into());
            };
            rename_session(&mut sessions, &self.activity, &id, title)?
                .ok_or_else(|| anyhow::Error::from(not_renamed(&id, title)))
        }

        /// Run one turn and return what to show in the thread
        pub async fn submit(&self, text: &str) -> String {
            match self.controller.send(text).await {
                Ok(outcome) => render::render_assistant(&outcome.reply),
                Err(e) => {
                    let expected = e
                        .downcast_ref::<QuantumError>()
                        .is_some_and(QuantumError::is_turn_error);
                    if !expected {
                        tracing::error!("Turn failed: {:#}", e);
                    }
                    render_turn_failure(&e)
                }
            }
        }

        /// Execute a parsed special command
        pub async fn handle_command(&self, command: SpecialCommand) -> Result<Flow> {
            let settings = self.controller.settings();
            match command {
                SpecialCommand::NewChat => {
                    self.controller.sessions().lock().await.start_new();
                    println!("{}", "Started a new chat.".green());
                }
                SpecialCommand::ListHistory => {
                    let sessions = self.controller.sessions();
                    let sessions = sessions.lock().await;
                    print_sessions(&sessions.summaries(), sessions.active_id());
                }
                SpecialCommand::Open(id) => match self.resume(&id).await {
                    Ok(thread) => println!("\n{}\n", thread),
                    Err(_) => println!("{}", format!("No chat with id {}", id).yellow()),
                },
                SpecialCommand::Rename { id, title } => match self.rename(id, &title).await {
                    Ok(title) => println!("{}", format!("Renamed chat to \"{}\"", title).green()),
                    Err(e) => match e.downcast_ref::<QuantumError>() {
                        Some(QuantumError::Validation(reason)) => println!("{}", reason.yellow()),
                        _ => return Err(e),
                    },
                },
                SpecialCommand::Delete(id) => {
                    let sessions = self.controller.sessions();
                    let mut sessions = sessions.lock().await;
                    let outcome = delete_session(&mut sessions, &self.activity, &id)?;
                    if !outcome.removed {
                        println!("{}", format!("No chat with id {}", id).yellow());
                    } else if outcome.cleared_active {
                        println!("{}", "Deleted the current chat; started a new one.".green());
                    } else {
                        println!("{}", format!("Deleted chat {}", id).green());
                    }
                }
                SpecialCommand::ShowActivity => {
                    super::activity::print_activity(&self.activity.entries()?);
                }
                SpecialCommand::ShowModel => {
                    println!("Current model: {}", settings.model()?.cyan());
                }
                SpecialCommand::SwitchModel(model) => {
                    let model = super::settings::select_model(settings, &model)?;
                    println!("{}", format!("Switched to model: {}", model).green());
                }
                SpecialCommand::ListModels => {
                    super::models::print_models(&settings.model()?);
                }
                SpecialCommand::SetKey(key) => {
                    super::settings::save_api_key(settings, &key)?;
                    println!("{}", "API key saved.".green());
                }
                SpecialCommand::ShowStatus => self.print_status().await?,
                SpecialCommand::Help => print_help(),
                SpecialCommand::Exit => return Ok(Flow::Exit),
                SpecialCommand::None => {}
            }
            Ok(Flow::Continue)
        }

        async fn print_status(&self) -> Result<()> {
            let settings = self.controller.settings();
            let sessions = self.controller.sessions();
            let sessions = sessions.lock().await;
            let chat = match sessions.active() {
                Some(session) => format!("{} ({})", session.title, session.id),
                None => "new chat (unsaved)".to_string(),
            };
            let visible = sessions
                .thread()
                .iter()
                .filter(|m| m.role != crate::providers::Role::System)
                .count();

            println!("\n╔══════════════════════════════════════════════════════════════╗");
            println!("║                  Quantum Chat Session Status                 ║");
            println!("╚══════════════════════════════════════════════════════════════╝\n");
            println!("Model:             {}", settings.model()?.cyan());
            println!(
                "API Key:           {}",
                super::settings::describe_api_key(settings)?
            );
            println!("Chat:              {}", chat);
            println!("Conversation Size: {} messages", visible);
            println!("Saved Chats:       {}", sessions.list().len());
            println!();
            Ok(())
        }
    }

    /// Inline text shown in place of a reply when a turn fails
    pub fn render_turn_failure(err: &anyhow::Error) -> String {
        match err.downcast_ref::<QuantumError>() {
            Some(QuantumError::MissingCredential)
            | Some(QuantumError::TurnInProgress)
            | Some(QuantumError::Validation(_)) => render::render_notice(&err.to_string()),
            Some(QuantumError::Api { message, .. }) => render::render_error(message),
            Some(QuantumError::Transport(message)) => render::render_error(message),
            _ => render::render_error(&err.to_string()),
        }
    }

    /// Start interactive chat mode
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `resume` - Optional id of a saved chat to open first
    pub async fn run_chat(config: Config, resume: Option<String>) -> Result<()> {
        tracing::info!("Starting interactive chat mode");

        let session = ChatSession::open(&config)?;

        print_welcome_banner(&session.controller().settings().model()?);

        if let Some(id) = resume {
            let thread = session.resume(&id).await?;
            println!("{}\n", thread);
        }

        let mut rl = DefaultEditor::new()?;
        let prompt = format!("{} ", "You:".green().bold());

        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    rl.add_history_entry(trimmed)?;

                    match parse_special_command(trimmed) {
                        Ok(SpecialCommand::None) => {}
                        Ok(command) => {
                            match session.handle_command(command).await {
                                Ok(Flow::Exit) => break,
                                Ok(Flow::Continue) => {}
                                Err(e) => eprintln!("{} {}\n", "Error:".red(), e),
                            }
                            continue;
                        }
                        Err(e) => {
                            eprintln!("{}\n", e);
                            continue;
                        }
                    }

                    println!("{}", format!("{} is thinking...", render::ASSISTANT_NAME).dimmed());
                    println!("\n{}\n", session.submit(trimmed).await);
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    fn print_welcome_banner(model: &str) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║              Quantum Chat Interactive Mode                   ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        println!("Model: {}\n", model.cyan());
        println!("Type '/help' for available commands, 'exit' to quit\n");
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::storage::activity::{DELETED_CHAT, LOADED_CHAT};
        use crate::storage::{KeyValueStore, API_KEY_KEY};
        use crate::test_utils::{assert_quantum_error, test_controller, FakeProvider};

        fn create_test_session(
            provider: Arc<FakeProvider>,
            api_key: Option<&str>,
        ) -> (ChatSession, Arc<crate::storage::MemoryStore>) {
            let (controller, store) = test_controller(provider, api_key);
            let session = ChatSession::new(controller, ActivityLog::new(store.clone()));
            (session, store)
        }

        #[tokio::test]
        async fn test_submit_renders_reply() {
            colored::control::set_override(false);
            let (session, _) = create_test_session(FakeProvider::replying(["**Hello**"]), Some("k"));
            assert_eq!(session.submit("Hi").await, "Quantum AI:\nHello");
        }

        #[tokio::test]
        async fn test_submit_without_key_shows_notice() {
            colored::control::set_override(false);
            let (session, _) = create_test_session(FakeProvider::replying(["unused"]), None);
            let shown = session.submit("Hi").await;
            assert!(shown.contains("No API key configured"));
            assert!(!shown.contains("Error communicating"));
        }

        #[tokio::test]
        async fn test_submit_api_failure_shows_api_message() {
            colored::control::set_override(false);
            let provider = FakeProvider::replying(Vec::<String>::new());
            provider.fail_next(QuantumError::Api {
                status: 401,
                message: "Invalid API Key".to_string(),
            });
            let (session, _) = create_test_session(provider, Some("k"));
            assert!(session
                .submit("Hi")
                .await
                .ends_with("Error communicating with API: Invalid API Key"));
        }

        #[tokio::test]
        async fn test_set_key_command_enables_sending() {
            let (session, store) = create_test_session(FakeProvider::replying(["ok"]), None);
            session
                .handle_command(SpecialCommand::SetKey("gsk_new".to_string()))
                .await
                .unwrap();
            assert_eq!(store.get(API_KEY_KEY).unwrap().as_deref(), Some("gsk_new"));
            assert!(session.controller().send("Hi").await.is_ok());
        }

        #[tokio::test]
        async fn test_rename_active_chat() {
            let (session, _) = create_test_session(FakeProvider::replying(["ok"]), Some("k"));
            let outcome = session.controller().send("Hi").await.unwrap();

            session
                .handle_command(SpecialCommand::Rename {
                    id: None,
                    title: "Greeting".to_string(),
                })
                .await
                .unwrap();

            let sessions = session.controller().sessions();
            let sessions = sessions.lock().await;
            assert_eq!(sessions.load(&outcome.session_id).unwrap().title, "Greeting");
        }

        #[tokio::test]
        async fn test_rename_blank_title_reports_empty_title() {
            let (session, _) = create_test_session(FakeProvider::replying(["ok"]), Some("k"));
            let outcome = session.controller().send("Hi").await.unwrap();

            let err = session
                .rename(Some(outcome.session_id.clone()), "   ")
                .await
                .unwrap_err();
            assert_quantum_error(&err, |e| {
                matches!(e, QuantumError::Validation(m) if m == "Title must not be empty")
            });

            let err = session
                .rename(Some("1712345678901".to_string()), "Plans")
                .await
                .unwrap_err();
            assert_quantum_error(&err, |e| {
                matches!(e, QuantumError::Validation(m) if m.starts_with("No chat with id"))
            });

            // A rejected rename is reported, not raised, by the slash command.
            session
                .handle_command(SpecialCommand::Rename {
                    id: Some(outcome.session_id.clone()),
                    title: "  ".to_string(),
                })
                .await
                .unwrap();
            let sessions = session.controller().sessions();
            let sessions = sessions.lock().await;
            assert_eq!(sessions.load(&outcome.session_id).unwrap().title, "Hi");
        }

        #[tokio::test]
        async fn test_rename_without_active_chat_is_rejected() {
            let (session, _) = create_test_session(FakeProvider::replying(["ok"]), Some("k"));
            let err = session.rename(None, "Plans").await.unwrap_err();
            assert_quantum_error(&err, |e| matches!(e, QuantumError::Validation(_)));
        }

        #[tokio::test]
        async fn test_open_and_delete_record_activity() {
            let (session, store) = create_test_session(FakeProvider::replying(["ok"]), Some("k"));
            let outcome = session.controller().send("Hi").await.unwrap();
            session
                .handle_command(SpecialCommand::NewChat)
                .await
                .unwrap();

            session
                .handle_command(SpecialCommand::Open(outcome.session_id.clone()))
                .await
                .unwrap();
            session
                .handle_command(SpecialCommand::Delete(outcome.session_id.clone()))
                .await
                .unwrap();

            let actions: Vec<String> = ActivityLog::new(store)
                .entries()
                .unwrap()
                .into_iter()
                .map(|e| e.action)
                .collect();
            assert_eq!(actions, vec![DELETED_CHAT, LOADED_CHAT]);

            let sessions = session.controller().sessions();
            let sessions = sessions.lock().await;
            assert!(sessions.active_id().is_none());
            assert!(sessions.thread().is_empty());
        }

        #[tokio::test]
        async fn test_resume_unknown_chat_fails() {
            let (session, _) = create_test_session(FakeProvider::replying(["ok"]), Some("k"));
            assert!(session.resume("missing").await.is_err());
        }

        #[tokio::test]
        async fn test_exit_command() {
            let (session, _) = create_test_session(FakeProvider::replying(["ok"]), Some("k"));
            assert_eq!(
                session.handle_command(SpecialCommand::Exit).await.unwrap(),
                Flow::Exit
            );
            assert_eq!(
                session.handle_command(SpecialCommand::Help).await.unwrap(),
                Flow::Continue
            );
        }
    }
}

// Single-message command handler
pub mod ask {
    //! Sends one message and prints the reply, for scripting.

    use super::chat::ChatSession;
    use super::*;
    use crate::render;
    use colored::Colorize;

    /// Send `text`, optionally continuing the saved chat `session`
    ///
    /// # Errors
    ///
    /// Returns the turn error (missing key, API failure, ...) unchanged so
    /// the process exits non-zero.
    pub async fn run_ask(config: Config, text: String, session: Option<String>) -> Result<()> {
        let chat = ChatSession::open(&config)?;
        if let Some(id) = session {
            chat.resume(&id).await?;
        }

        let outcome = chat.controller().send(&text).await?;
        println!("{}\n", render::render_assistant(&outcome.reply));
        println!("{}", format!("Saved to chat {}", outcome.session_id).dimmed());
        Ok(())
    }
}

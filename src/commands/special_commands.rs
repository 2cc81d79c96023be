//! Special commands parser for interactive chat mode
//!
//! Lines starting with `/` manage conversations and settings instead of
//! being sent to the model. Command words are case-insensitive; arguments
//! keep their case.

use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// Special commands that can be executed during interactive chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Leave the current conversation and start an empty one
    NewChat,

    /// List saved conversations
    ListHistory,

    /// Open a saved conversation
    Open(String),

    /// Rename a conversation; `id` of `None` means the active one
    Rename {
        /// Conversation id, when given explicitly
        id: Option<String>,
        /// New title
        title: String,
    },

    /// Delete a saved conversation
    Delete(String),

    /// Show recent activity
    ShowActivity,

    /// Show the selected model
    ShowModel,

    /// Select a different model
    SwitchModel(String),

    /// List selectable models
    ListModels,

    /// Save the API key
    SetKey(String),

    /// Show session status
    ShowStatus,

    /// Display help information
    Help,

    /// Exit the interactive session
    Exit,

    /// Not a special command; send the input as a message
    None,
}

/// Conversation ids are epoch-millisecond timestamps
fn looks_like_id(token: &str) -> bool {
    token.len() >= 10 && token.chars().all(|c| c.is_ascii_digit())
}

fn required(command: &str, usage: &str, arg: &str) -> Result<String, CommandError> {
    if arg.is_empty() {
        Err(CommandError::MissingArgument {
            command: command.to_string(),
            usage: usage.to_string(),
        })
    } else {
        Ok(arg.to_string())
    }
}

/// Parse a user input string into a special command
///
/// # Errors
///
/// Returns `CommandError::UnknownCommand` for unrecognized `/` commands and
/// `CommandError::MissingArgument` when a required argument is absent.
///
/// # Examples
///
/// ```
/// use quantum_chat::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// assert_eq!(parse_special_command("/NEW").unwrap(), SpecialCommand::NewChat);
/// assert_eq!(parse_special_command("hello").unwrap(), SpecialCommand::None);
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    if lower == "exit" || lower == "quit" {
        return Ok(SpecialCommand::Exit);
    }
    if !trimmed.starts_with('/') {
        return Ok(SpecialCommand::None);
    }

    let (word, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((word, rest)) => (word.to_lowercase(), rest.trim()),
        None => (lower.clone(), ""),
    };

    match word.as_str() {
        "/new" => Ok(SpecialCommand::NewChat),
        "/history" | "/chats" => Ok(SpecialCommand::ListHistory),
        "/open" | "/load" => Ok(SpecialCommand::Open(required(
            "/open",
            "/open <id>",
            rest,
        )?)),
        "/rename" => {
            let usage = "/rename [<id>] <title>";
            let rest = required("/rename", usage, rest)?;
            match rest.split_once(char::is_whitespace) {
                Some((first, title)) if looks_like_id(first) => Ok(SpecialCommand::Rename {
                    id: Some(first.to_string()),
                    title: required("/rename", usage, title.trim())?,
                }),
                _ => Ok(SpecialCommand::Rename {
                    id: None,
                    title: rest,
                }),
            }
        }
        "/delete" => Ok(SpecialCommand::Delete(required(
            "/delete",
            "/delete <id>",
            rest,
        )?)),
        "/activity" => Ok(SpecialCommand::ShowActivity),
        "/model" if rest.is_empty() => Ok(SpecialCommand::ShowModel),
        "/model" => Ok(SpecialCommand::SwitchModel(rest.to_string())),
        "/models" => Ok(SpecialCommand::ListModels),
        "/key" => Ok(SpecialCommand::SetKey(required("/key", "/key <api-key>", rest)?)),
        "/status" => Ok(SpecialCommand::ShowStatus),
        "/help" | "/?" => Ok(SpecialCommand::Help),
        "/exit" | "/quit" => Ok(SpecialCommand::Exit),
        _ => Err(CommandError::UnknownCommand(trimmed.to_string())),
    }
}

/// Print help for the special commands
pub fn print_help() {
    println!(
        r#"
Special Commands for Interactive Chat
=====================================

CONVERSATIONS:
  /new                    - Start a new chat
  /history                - List saved chats
  /open <id>              - Open a saved chat
  /rename <title>         - Rename the current chat
  /rename <id> <title>    - Rename a saved chat
  /delete <id>            - Delete a saved chat
  /activity               - Show recent activity

SETTINGS:
  /model                  - Show the selected model
  /model <name>           - Switch to a different model
  /models                 - List selectable models
  /key <api-key>          - Save your API key

OTHER:
  /status                 - Show session status
  /help                   - Show this help
  exit, quit              - Leave the chat
"#
    );
}

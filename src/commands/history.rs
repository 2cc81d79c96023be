use crate::cli::HistoryCommand;
use crate::config::Config;
use crate::error::{QuantumError, Result};
use crate::render;
use crate::storage::activity::{renamed_chat, DELETED_CHAT, LOADED_CHAT};
use crate::storage::{ActivityLog, DeleteOutcome, KeyValueStore, SessionStore, SessionSummary};
use colored::Colorize;
use prettytable::{format, Table};
use std::sync::Arc;

/// Handle history commands
pub fn handle_history(command: HistoryCommand, config: &Config) -> Result<()> {
    let store = super::open_store(config)?;
    run_history(command, store, config.chat.title_max_length)
}

fn run_history(
    command: HistoryCommand,
    store: Arc<dyn KeyValueStore>,
    title_max_length: usize,
) -> Result<()> {
    let mut sessions = SessionStore::open(store.clone(), title_max_length)?;
    let activity = ActivityLog::new(store);

    match command {
        HistoryCommand::List => {
            print_sessions(&sessions.summaries(), None);
            if !sessions.list().is_empty() {
                println!(
                    "Use {} to continue a chat.",
                    "quantum chat --resume <ID>".cyan()
                );
                println!();
            }
        }
        HistoryCommand::Show { id } => {
            let session = sessions
                .load(&id)
                .ok_or_else(|| QuantumError::Validation(format!("No chat with id {}", id)))?;
            println!("\n{}\n", session.title.bold());
            println!("{}\n", render::render_thread(&session.messages));
        }
        HistoryCommand::Rename { id, title } => {
            match rename_session(&mut sessions, &activity, &id, &title)? {
                Some(title) => println!("{}", format!("Renamed chat {} to \"{}\"", id, title).green()),
                None => return Err(not_renamed(&id, &title).into()),
            }
        }
        HistoryCommand::Delete { id } => {
            if delete_session(&mut sessions, &activity, &id)?.removed {
                println!("{}", format!("Deleted chat {}", id).green());
            } else {
                println!("{}", format!("No chat with id {}", id).yellow());
            }
        }
    }

    Ok(())
}

/// Why a rename changed nothing: a blank title or an unknown id
pub(crate) fn not_renamed(id: &str, title: &str) -> QuantumError {
    if title.trim().is_empty() {
        QuantumError::Validation("Title must not be empty".to_string())
    } else {
        QuantumError::Validation(format!("No chat with id {}", id))
    }
}

/// Make a saved chat active and record it in the activity log
///
/// Returns `false` when no chat has the id; nothing is recorded then.
pub fn open_session(sessions: &mut SessionStore, activity: &ActivityLog, id: &str) -> Result<bool> {
    if !sessions.activate(id) {
        return Ok(false);
    }
    activity.record(LOADED_CHAT)?;
    Ok(true)
}

/// Retitle a chat and record it in the activity log
///
/// Returns the stored (possibly truncated) title, or `None` when the id is
/// unknown or the title is blank.
pub fn rename_session(
    sessions: &mut SessionStore,
    activity: &ActivityLog,
    id: &str,
    title: &str,
) -> Result<Option<String>> {
    if !sessions.rename(id, title)? {
        return Ok(None);
    }
    let stored = sessions
        .load(id)
        .map(|s| s.title.clone())
        .unwrap_or_else(|| title.trim().to_string());
    activity.record(renamed_chat(&stored))?;
    Ok(Some(stored))
}

/// Delete a chat, recording it in the activity log when something was removed
pub fn delete_session(
    sessions: &mut SessionStore,
    activity: &ActivityLog,
    id: &str,
) -> Result<DeleteOutcome> {
    let outcome = sessions.delete(id)?;
    if outcome.removed {
        activity.record(DELETED_CHAT)?;
    }
    Ok(outcome)
}

/// Print saved chats as a table, marking the active one
pub fn print_sessions(summaries: &[SessionSummary], active_id: Option<&str>) {
    if summaries.is_empty() {
        println!("{}", "No chat history found.".yellow());
        return;
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

    table.add_row(prettytable::row![
        "ID".bold(),
        "Title".bold(),
        "Messages".bold(),
        "Created".bold()
    ]);

    for summary in summaries {
        let id = if active_id == Some(summary.id.as_str()) {
            format!("{} *", summary.id).green()
        } else {
            summary.id.cyan()
        };
        let created = summary
            .created_at
            .map(|t| {
                t.with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M")
                    .to_string()
            })
            .unwrap_or_else(|| "-".to_string());

        table.add_row(prettytable::row![
            id,
            summary.title,
            summary.message_count,
            created
        ]);
    }

    println!("\nChat History:");
    table.printstd();
    println!();
}

//! Recent activity listing

use crate::config::Config;
use crate::error::Result;
use crate::storage::{ActivityEntry, ActivityLog};
use colored::Colorize;

/// Handle the activity command
pub fn handle_activity(config: &Config, clear: bool) -> Result<()> {
    let log = ActivityLog::new(super::open_store(config)?);

    if clear {
        log.clear()?;
        println!("{}", "Activity cleared.".green());
        return Ok(());
    }

    print_activity(&log.entries()?);
    Ok(())
}

/// Print entries newest first with their local time
pub fn print_activity(entries: &[ActivityEntry]) {
    if entries.is_empty() {
        println!("{}", "No recent activity.".yellow());
        return;
    }

    println!("\nRecent Activity:");
    for entry in entries {
        println!("  {}  {}", format_time(entry).dimmed(), entry.action);
    }
    println!();
}

/// Local wall-clock time of an entry; the raw string when it does not parse
pub fn format_time(entry: &ActivityEntry) -> String {
    match entry.timestamp() {
        Some(t) => t
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => entry.time.clone(),
    }
}

//! Command-line interface definition for Quantum Chat
//!
//! This module defines the CLI structure using clap's derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Quantum Chat - talk to hosted open-source models from the terminal
#[derive(Parser, Debug, Clone)]
#[command(name = "quantum")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Directory holding chat history and settings
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive chat
    Chat {
        /// Open a saved conversation instead of starting a new one
        #[arg(short, long)]
        resume: Option<String>,
    },

    /// Send a single message and print the reply
    Ask {
        /// Message text
        text: String,

        /// Continue a saved conversation
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Manage saved conversations
    History {
        /// History subcommand
        #[command(subcommand)]
        command: HistoryCommand,
    },

    /// Show recent activity
    Activity {
        /// Forget all recorded activity
        #[arg(long)]
        clear: bool,
    },

    /// View or change the API key and selected model
    Settings {
        /// Settings subcommand
        #[command(subcommand)]
        command: SettingsCommand,
    },

    /// List or verify models
    Models {
        /// Model subcommand
        #[command(subcommand)]
        command: ModelCommand,
    },
}

/// Conversation history subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum HistoryCommand {
    /// List saved conversations, most recent first
    List,

    /// Print a saved conversation
    Show {
        /// Conversation id
        id: String,
    },

    /// Rename a saved conversation
    Rename {
        /// Conversation id
        id: String,
        /// New title
        title: String,
    },

    /// Delete a saved conversation
    Delete {
        /// Conversation id
        id: String,
    },
}

/// Settings subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SettingsCommand {
    /// Show the selected model and whether a key is set
    Show,

    /// Save the API key
    SetKey {
        /// API key
        key: String,
    },

    /// Forget the saved API key
    ClearKey,

    /// Select the model to chat with
    SetModel {
        /// Model identifier
        model: String,
    },
}

/// Model subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ModelCommand {
    /// List selectable models
    List,

    /// Check which models the endpoint currently serves
    Verify {
        /// Models to check (defaults to every listed model)
        #[arg(short, long)]
        model: Vec<String>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

//! Quantum Chat - terminal chat client
//!
#![doc = "Quantum Chat - terminal chat client"]
#![doc = "Main entry point for the quantum binary."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use quantum_chat::cli::{Cli, Commands, ModelCommand};
use quantum_chat::commands;
use quantum_chat::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Chat { resume } => {
            if let Some(r) = &resume {
                tracing::debug!("Resuming chat: {}", r);
            }
            commands::chat::run_chat(config, resume).await?;
            Ok(())
        }
        Commands::Ask { text, session } => {
            tracing::info!("Sending single message");
            commands::ask::run_ask(config, text, session).await?;
            Ok(())
        }
        Commands::History { command } => {
            commands::history::handle_history(command, &config)?;
            Ok(())
        }
        Commands::Activity { clear } => {
            commands::activity::handle_activity(&config, clear)?;
            Ok(())
        }
        Commands::Settings { command } => {
            commands::settings::handle_settings(command, &config)?;
            Ok(())
        }
        Commands::Models { command } => {
            tracing::info!("Starting model management command");
            match command {
                ModelCommand::List => commands::models::list_models(&config)?,
                ModelCommand::Verify { model } => {
                    commands::models::verify_models(&config, model).await?
                }
            }
            Ok(())
        }
    }
}

/// Initialize tracing subscriber
///
/// Logs go to stderr so they never mix with chat output. `RUST_LOG` wins
/// over the defaults.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "quantum_chat=debug"
    } else {
        "quantum_chat=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

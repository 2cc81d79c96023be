use crate::cli::SettingsCommand;
use crate::config::Config;
use crate::error::{QuantumError, Result};
use crate::providers::KNOWN_MODELS;
use crate::storage::settings::mask_key;
use crate::storage::Settings;
use colored::Colorize;

/// Handle settings commands
pub fn handle_settings(command: SettingsCommand, config: &Config) -> Result<()> {
    let settings = Settings::new(super::open_store(config)?, &config.api);

    match command {
        SettingsCommand::Show => print_settings(&settings, config)?,
        SettingsCommand::SetKey { key } => {
            save_api_key(&settings, &key)?;
            println!("{}", "API key saved.".green());
        }
        SettingsCommand::ClearKey => {
            settings.clear_api_key()?;
            println!("{}", "API key removed.".green());
        }
        SettingsCommand::SetModel { model } => {
            let model = select_model(&settings, &model)?;
            println!("{}", format!("Model set to {}", model).green());
        }
    }

    Ok(())
}

/// Save a non-blank API key
pub fn save_api_key(settings: &Settings, key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(QuantumError::Validation("API key must not be empty".to_string()).into());
    }
    settings.set_api_key(key)
}

/// Save the selected model, warning when it is not a listed one
pub fn select_model(settings: &Settings, model: &str) -> Result<String> {
    let model = model.trim();
    if model.is_empty() {
        return Err(QuantumError::Validation("Model must not be empty".to_string()).into());
    }
    if !KNOWN_MODELS.contains(&model) {
        tracing::warn!(model, "Selected model is not in the known model list");
        println!(
            "{}",
            format!(
                "Note: {} is not a listed model; run 'quantum models verify -m {}' to check it.",
                model, model
            )
            .yellow()
        );
    }
    settings.set_model(model)?;
    Ok(model.to_string())
}

/// One-line description of where the API key comes from
pub fn describe_api_key(settings: &Settings) -> Result<String> {
    Ok(match settings.api_key()? {
        Some(key) if settings.has_saved_api_key()? => format!("{} (saved)", mask_key(&key)),
        Some(key) => format!("{} (configuration)", mask_key(&key)),
        None => "not set".to_string(),
    })
}

fn print_settings(settings: &Settings, config: &Config) -> Result<()> {
    println!("\nSettings:");
    println!("  Model:     {}", settings.model()?.cyan());
    println!("  API key:   {}", describe_api_key(settings)?);
    println!("  Endpoint:  {}", config.api.endpoint);
    match &config.storage.data_dir {
        Some(dir) => println!("  Data dir:  {}", dir.display()),
        None => println!("  Data dir:  (platform default)"),
    }
    println!();
    Ok(())
}

//! Model listing and availability checks
//!
//! `list` shows the selectable models with the current selection marked.
//! `verify` sends a tiny prompt to each model, one after another, and
//! reports which ones the endpoint currently serves.

use crate::config::Config;
use crate::error::{QuantumError, Result};
use crate::providers::{self, ProbeResult, Provider, KNOWN_MODELS};
use crate::storage::Settings;
use colored::Colorize;
use prettytable::{format, Table};

/// List selectable models, marking the selected one
///
/// # Examples
///
/// ```no_run
/// use quantum_chat::config::Config;
/// use quantum_chat::commands::models::list_models;
///
/// # fn example() -> anyhow::Result<()> {
/// list_models(&Config::default())?;
/// # Ok(())
/// # }
/// ```
pub fn list_models(config: &Config) -> Result<()> {
    let settings = Settings::new(super::open_store(config)?, &config.api);
    print_models(&settings.model()?);
    Ok(())
}

/// Print the known model table with `selected` highlighted
pub fn print_models(selected: &str) {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(prettytable::row!["Model".bold(), "Selected".bold()]);

    for model in KNOWN_MODELS {
        if *model == selected {
            table.add_row(prettytable::row![model.green(), "*".green()]);
        } else {
            table.add_row(prettytable::row![model, ""]);
        }
    }

    println!("\nAvailable Models:");
    table.printstd();
    if !KNOWN_MODELS.contains(&selected) {
        println!("Selected (unlisted): {}", selected.cyan());
    }
    println!();
}

/// Probe models against the configured endpoint
///
/// Checks every listed model when `models` is empty.
///
/// # Errors
///
/// Returns `QuantumError::MissingCredential` when no API key is configured.
pub async fn verify_models(config: &Config, models: Vec<String>) -> Result<()> {
    let settings = Settings::new(super::open_store(config)?, &config.api);
    let api_key = settings.api_key()?.ok_or(QuantumError::MissingCredential)?;
    let provider = providers::create_provider(&config.api)?;

    let models = if models.is_empty() {
        KNOWN_MODELS.iter().map(|m| m.to_string()).collect()
    } else {
        models
    };

    println!("\nChecking {} model(s) at {}\n", models.len(), config.api.endpoint);
    let results = probe_models(provider.as_ref(), &api_key, &models).await;
    for (model, result) in &results {
        println!("{}", format_probe_line(model, result));
    }

    let passed = results
        .iter()
        .filter(|(_, r)| *r == ProbeResult::Pass)
        .count();
    println!("\n{}/{} models available\n", passed, results.len());
    Ok(())
}

/// Probe each model in order
pub async fn probe_models(
    provider: &dyn Provider,
    api_key: &str,
    models: &[String],
) -> Vec<(String, ProbeResult)> {
    let mut results = Vec::with_capacity(models.len());
    for model in models {
        tracing::debug!(model = %model, "Probing model");
        let result = provider.probe(model, api_key).await;
        results.push((model.clone(), result));
    }
    results
}

/// One result line: `[PASS] model`, `[FAIL] model: reason` or
/// `[ERROR] model: reason`
pub fn format_probe_line(model: &str, result: &ProbeResult) -> String {
    match result {
        ProbeResult::Pass => format!("{} {}", "[PASS]".green(), model),
        ProbeResult::Fail(message) => format!("{} {}: {}", "[FAIL]".red(), model, message),
        ProbeResult::Unreachable(message) => {
            format!("{} {}: {}", "[ERROR]".yellow(), model, message)
        }
    }
}

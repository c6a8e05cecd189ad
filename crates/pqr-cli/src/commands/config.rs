//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use pqr_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "backend": config.backend.to_string(),
                    "user_email": config.user_email,
                    "notify_email": config.notify_email,
                    "notify_enabled": config.notify_enabled,
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:       {}", config.data_dir.display());
            println!("  backend:        {}", config.backend);
            println!(
                "  user_email:     {}",
                config.user_email.as_deref().unwrap_or("(not set)")
            );
            println!(
                "  notify_email:   {}",
                config.notify_email.as_deref().unwrap_or("(not set)")
            );
            println!("  notify_enabled: {}", config.notify_enabled);
            println!(
                "  log_file:       {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "data_dir" => {
            config.data_dir = value.into();
        }
        "backend" => {
            config.backend = value.parse().map_err(|e: String| anyhow::anyhow!(e))?;
        }
        "user_email" => {
            config.user_email = optional(value);
        }
        "notify_email" => {
            config.notify_email = optional(value);
        }
        "notify_enabled" => {
            config.notify_enabled = value
                .parse()
                .context("Invalid value for notify_enabled. Use 'true' or 'false'.")?;
        }
        "log_file" => {
            config.log_file = optional(value).map(PathBuf::from);
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: data_dir, backend, user_email, notify_email, notify_enabled, log_file",
                key
            );
        }
    }
    Ok(())
}

/// Empty or "none" unsets an optional value
fn optional(value: &str) -> Option<String> {
    if value.is_empty() || value == "none" {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pqr_core::StorageBackend;

    #[test]
    fn test_apply_known_keys() {
        let mut config = Config::default();

        apply(&mut config, "backend", "sqlite").unwrap();
        assert_eq!(config.backend, StorageBackend::Sqlite);

        apply(&mut config, "notify_enabled", "true").unwrap();
        assert!(config.notify_enabled);

        apply(&mut config, "user_email", "ops@example.com").unwrap();
        assert_eq!(config.user_email.as_deref(), Some("ops@example.com"));

        apply(&mut config, "user_email", "none").unwrap();
        assert!(config.user_email.is_none());
    }

    #[test]
    fn test_apply_rejects_bad_input() {
        let mut config = Config::default();
        assert!(apply(&mut config, "favorite_color", "blue").is_err());
        assert!(apply(&mut config, "backend", "postgres").is_err());
        assert!(apply(&mut config, "notify_enabled", "maybe").is_err());
    }
}

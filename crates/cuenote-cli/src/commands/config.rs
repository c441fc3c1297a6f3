//! Config command handlers

use anyhow::{bail, Context, Result};

use cuenote_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(output: &Output) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "sync_url": config.sync_url,
                    "sync_enabled": config.sync_enabled,
                    "reconcile_interval_secs": config.reconcile_interval_secs,
                    "sweep_interval_secs": config.sweep_interval_secs,
                    "actor_id": config.actor_id,
                    "actor_name": config.actor_name,
                    "stream_id": config.stream_id
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            println!("Configuration:");
            println!("  data_dir:                {}", config.data_dir.display());
            println!(
                "  sync_url:                {}",
                config.sync_url.as_deref().unwrap_or("(not set)")
            );
            println!("  sync_enabled:            {}", config.sync_enabled);
            println!(
                "  reconcile_interval_secs: {}",
                config.reconcile_interval_secs
            );
            println!("  sweep_interval_secs:     {}", config.sweep_interval_secs);
            println!(
                "  actor_id:                {}",
                config.actor_id.as_deref().unwrap_or("(not set)")
            );
            println!(
                "  actor_name:              {}",
                config.actor_name.as_deref().unwrap_or("(not set)")
            );
            println!(
                "  stream_id:               {}",
                config.stream_id.as_deref().unwrap_or("(not set)")
            );
            println!();
            println!("Config file: {}", Config::config_file_path().display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(key: String, value: String, output: &Output) -> Result<()> {
    let mut config = Config::load().context("Failed to load configuration")?;

    match key.as_str() {
        "data_dir" => {
            config.data_dir = value.clone().into();
        }
        "sync_url" => {
            config.sync_url = optional(&value);
        }
        "sync_enabled" => {
            config.sync_enabled = value
                .parse()
                .context("Invalid value for sync_enabled. Use 'true' or 'false'.")?;
        }
        "reconcile_interval_secs" => {
            config.reconcile_interval_secs = value
                .parse()
                .context("Invalid value for reconcile_interval_secs. Use a number of seconds.")?;
        }
        "sweep_interval_secs" => {
            config.sweep_interval_secs = value
                .parse()
                .context("Invalid value for sweep_interval_secs. Use a number of seconds.")?;
        }
        "actor_id" => {
            config.actor_id = optional(&value);
        }
        "actor_name" => {
            config.actor_name = optional(&value);
        }
        "stream_id" => {
            config.stream_id = optional(&value);
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: data_dir, sync_url, sync_enabled, reconcile_interval_secs, \
                 sweep_interval_secs, actor_id, actor_name, stream_id",
                key
            );
        }
    }

    config.save().context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

/// Treat empty or "none" as clearing the value
fn optional(value: &str) -> Option<String> {
    if value.is_empty() || value == "none" {
        None
    } else {
        Some(value.to_string())
    }
}

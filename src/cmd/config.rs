//! Configuration view and validation commands: `outreach config`.

use std::path::Path;

use anyhow::Result;
use outreach::config::AppConfig;

use super::super::ConfigCommands;

pub fn cmd_config(config_path: &Path, command: Option<ConfigCommands>) -> Result<()> {
    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Outreach Configuration");
            println!("======================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No config file at {}; using defaults.", config_path.display());
            }
            println!();

            let mut config = AppConfig::load(config_path)?;
            if config.crm.api_key.as_deref().is_some_and(|k| !k.is_empty()) {
                config.crm.api_key = Some("********".to_string());
            }
            println!("Effective values (with env overrides):");
            println!();
            print!("{}", config.to_toml()?);
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No {} found. Using defaults (valid).", config_path.display());
                return Ok(());
            }

            let config = AppConfig::load(config_path)?;
            let warnings = config.warnings();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("{} already exists.", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            if let Some(parent) = config_path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(config_path, AppConfig::default().to_toml()?)?;

            println!("Created {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [browser] webdriver_url, profile_dir, headless");
            println!("  - [crm] base_url, api_key, source_tag, priority");
            println!("  - [pacing] page/action/search delays in milliseconds");
            println!();
        }
    }

    Ok(())
}

//! Configuration view and validation commands (`flagenv config`).

use anyhow::{Context, Result};
use flagenv::config::{FlagenvConfig, default_config_path};

use super::super::{Cli, ConfigCommands};

pub fn cmd_config(cli: &Cli, config: &FlagenvConfig, command: Option<ConfigCommands>) -> Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);

    match command {
        None | Some(ConfigCommands::Show) => {
            if config_path.exists() {
                println!("# Config file: {}", config_path.display());
            } else {
                println!("# No config file at {}; using defaults", config_path.display());
            }
            println!("# Effective values (with env/CLI overrides)");
            println!();
            print!("{}", config.to_toml()?);
        }
        Some(ConfigCommands::Validate) => {
            let warnings = config.validate();
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("flagenv.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }
            if let Some(parent) = config_path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create config directory {}", parent.display())
                })?;
            }

            FlagenvConfig::default().save(&config_path)?;
            println!("Created flagenv.toml at {}", config_path.display());
        }
    }

    Ok(())
}

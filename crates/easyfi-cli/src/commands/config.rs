//! Configuration management commands.

use clap::Args;
use easyfi_core::{paths, Config, ConfigError};
use std::path::{Path, PathBuf};

/// Config command arguments.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(clap::Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,

    /// Get a configuration value
    Get {
        /// Configuration key (dot-separated path)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,

        /// Value to set
        value: String,
    },

    /// Write a default configuration file
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Show configuration file path
    Path,

    /// Validate configuration
    Validate,
}

fn resolve_path(config_path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    match config_path {
        Some(path) => Ok(path.to_path_buf()),
        None => paths::config_file(),
    }
}

/// Walk a dot-separated path through a JSON value.
pub fn get_path<'a>(json: &'a serde_json::Value, key: &str) -> Option<&'a serde_json::Value> {
    key.split('.')
        .try_fold(json, |value, part| value.get(part))
}

/// Set a dot-separated path, creating intermediate objects as needed.
///
/// The value is parsed as JSON first (numbers, booleans, arrays) and falls
/// back to a plain string.
pub fn set_path(json: &mut serde_json::Value, key: &str, value: &str) {
    let parts: Vec<&str> = key.split('.').collect();
    let mut current = json;
    for (i, part) in parts.iter().enumerate() {
        if i == parts.len() - 1 {
            let parsed: serde_json::Value = serde_json::from_str(value)
                .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
            current[part] = parsed;
        } else {
            if !current.get(part).map_or(false, |v| v.is_object()) {
                current[part] = serde_json::json!({});
            }
            current = &mut current[part];
        }
    }
}

/// Run the config command.
pub async fn run(args: ConfigArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => {
            let config = Config::load_or_default(config_path)?;
            println!("{}", config.to_json5()?);
        }

        ConfigCommand::Get { key } => {
            let config = Config::load_or_default(config_path)?;
            let json = serde_json::to_value(&config)?;
            match get_path(&json, &key) {
                Some(v) => println!("{}", serde_json::to_string_pretty(v)?),
                None => anyhow::bail!("Key not found: {}", key),
            }
        }

        ConfigCommand::Set { key, value } => {
            let path = resolve_path(config_path)?;
            let config = match Config::load(&path) {
                Ok(config) => config,
                Err(ConfigError::NotFound(_)) => Config::default(),
                Err(e) => return Err(e.into()),
            };
            let mut json = serde_json::to_value(&config)?;
            set_path(&mut json, &key, &value);

            // Deserialize back to Config to validate the shape is still correct
            let updated: Config = serde_json::from_value(json)
                .map_err(|e| anyhow::anyhow!("Invalid configuration after set: {}", e))?;
            updated.validate()?;
            updated.save(&path)?;

            println!("Set {} = {}", key, value);
        }

        ConfigCommand::Init { force } => {
            let path = resolve_path(config_path)?;
            if path.exists() && !force {
                return Err(anyhow::Error::new(ConfigError::AlreadyExists(path))
                    .context("use --force to overwrite"));
            }

            Config::default().save(&path)?;
            println!("Created config file: {}", path.display());
        }

        ConfigCommand::Path => {
            println!("{}", resolve_path(config_path)?.display());
        }

        ConfigCommand::Validate => {
            let path = resolve_path(config_path)?;
            let config = Config::load(&path)?;
            config.validate()?;
            println!("Configuration is valid");
        }
    }

    Ok(())
}

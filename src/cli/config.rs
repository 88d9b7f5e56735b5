//! Manage mongo-launcher user configuration.
//!
//! Settings are stored as JSON in `config.json` inside the configuration
//! directory (see [`crate::config`]). Known keys are matched
//! case-insensitively; any other key is kept as a custom property.
//!
//! # Examples
//!
//! ```bash
//! mongo-launcher config show
//! mongo-launcher config set defaultMongoVersion 8.0
//! mongo-launcher config get defaultMongoVersion
//! mongo-launcher config unset defaultAtlasProjectId
//! mongo-launcher config reset --force
//! mongo-launcher config path
//! ```
//!
//! # Secrets
//!
//! `atlasClientSecret` is masked by `show`. `get` prints it in full so it can
//! be used in scripts.

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;
use std::fmt::Write as _;

use crate::cli::prompt::Prompt;
use crate::config::{ConfigKey, ConfigManager, mask_secret};
use crate::core::LauncherError;

/// Command to inspect and change the user configuration.
///
/// Without a subcommand a short usage summary and the configuration file
/// location are printed.
#[derive(Args, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: Option<ConfigSubcommands>,
}

#[derive(Subcommand, Debug)]
enum ConfigSubcommands {
    /// Show all configuration values
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g. defaultMongoVersion)
        key: String,
        /// New value
        value: String,
    },

    /// Print a configuration value
    Get {
        /// Configuration key
        key: String,
    },

    /// Remove a configuration value
    Unset {
        /// Configuration key
        key: String,
    },

    /// Reset all configuration to defaults
    Reset {
        /// Do not ask for confirmation
        #[arg(short, long)]
        force: bool,
    },

    /// Print the configuration file path
    Path,
}

impl ConfigCommand {
    pub fn execute(self, manager: &mut ConfigManager) -> Result<()> {
        match self.command {
            None => {
                print!("{}", render_help(manager));
                Ok(())
            }
            Some(ConfigSubcommands::Show) => {
                print!("{}", render_show(manager));
                Ok(())
            }
            Some(ConfigSubcommands::Set {
                key,
                value,
            }) => set(manager, &key, &value),
            Some(ConfigSubcommands::Get {
                key,
            }) => get(manager, &key),
            Some(ConfigSubcommands::Unset {
                key,
            }) => unset(manager, &key),
            Some(ConfigSubcommands::Reset {
                force,
            }) => reset(manager, force, &mut Prompt::stdio()),
            Some(ConfigSubcommands::Path) => {
                println!("{}", manager.config_file().display());
                Ok(())
            }
        }
    }
}

/// Hint printed when `key` is stored as a custom property but looks like a
/// misspelt known key.
fn near_miss_hint(key: &str) -> Option<String> {
    if ConfigKey::parse(key).is_some() {
        return None;
    }
    ConfigKey::suggest(key)
        .map(|close| format!("'{key}' is not a known setting and was stored as a custom property. Did you mean '{close}'?"))
}

fn set(manager: &mut ConfigManager, key: &str, value: &str) -> Result<()> {
    manager.config_mut().set(key, value)?;
    manager.save()?;

    if let Some(hint) = near_miss_hint(key) {
        eprintln!("{} {}", "warning:".yellow().bold(), hint);
    }

    let shown = match ConfigKey::parse(key) {
        Some(known) if known.is_secret() => mask_secret(value),
        _ => value.to_string(),
    };
    println!("{} {} = {}", "Set".green(), key, shown);
    Ok(())
}

fn get(manager: &ConfigManager, key: &str) -> Result<()> {
    match manager.config().get(key) {
        Some(value) => {
            println!("{value}");
            Ok(())
        }
        None => Err(LauncherError::ConfigError {
            message: format!("Configuration key '{key}' not found"),
        }
        .into()),
    }
}

fn unset(manager: &mut ConfigManager, key: &str) -> Result<()> {
    if !manager.config_mut().unset(key) {
        return Err(LauncherError::ConfigError {
            message: format!("Configuration key '{key}' not found"),
        }
        .into());
    }
    manager.save()?;
    println!("{} {}", "Unset".green(), key);
    Ok(())
}

fn reset<R: std::io::BufRead, W: std::io::Write>(
    manager: &mut ConfigManager,
    force: bool,
    prompt: &mut Prompt<R, W>,
) -> Result<()> {
    if !force && !prompt.confirm("This will reset all configuration to defaults. Continue?", false)? {
        prompt.say("Reset cancelled")?;
        return Ok(());
    }
    manager.reset()?;
    prompt.say("Configuration reset to defaults".green())?;
    Ok(())
}

fn render_help(manager: &ConfigManager) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", "Configuration Management".bold());
    let _ = writeln!(out);
    let _ = writeln!(out, "Commands:");
    let _ = writeln!(out, "  show                 Show all configuration values");
    let _ = writeln!(out, "  set <key> <value>    Set a configuration value");
    let _ = writeln!(out, "  get <key>            Print a configuration value");
    let _ = writeln!(out, "  unset <key>          Remove a configuration value");
    let _ = writeln!(out, "  reset [--force]      Reset all configuration to defaults");
    let _ = writeln!(out, "  path                 Print the configuration file path");
    let _ = writeln!(out);
    let _ = writeln!(out, "Configuration file: {}", manager.config_file().display());
    out
}

/// Everything `config show` prints.
fn render_show(manager: &ConfigManager) -> String {
    let config = manager.config();
    let value = |key: ConfigKey| match config.get_known(key) {
        Some(v) if key.is_secret() => mask_secret(&v),
        Some(v) => v,
        None => "(not set)".dimmed().to_string(),
    };

    let mut out = String::new();
    let title = "MongoLauncher Configuration";
    let _ = writeln!(out, "{}", title.bold());
    let _ = writeln!(out, "{}", "═".repeat(title.len()));
    let _ = writeln!(out);

    let _ = writeln!(out, "{}", "General Settings:".bold());
    for key in [
        ConfigKey::DefaultMongoVersion,
        ConfigKey::InteractiveMode,
        ConfigKey::DefaultDataPath,
        ConfigKey::DefaultLogPath,
    ] {
        let _ = writeln!(out, "  {:<24}{}", format!("{key}:"), value(key));
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "{}", "Atlas Settings:".bold());
    for key in [
        ConfigKey::DefaultAtlasProjectId,
        ConfigKey::DefaultInstanceSize,
        ConfigKey::DefaultRegion,
        ConfigKey::DefaultCloudProvider,
        ConfigKey::AtlasClientId,
        ConfigKey::AtlasClientSecret,
        ConfigKey::AtlasBaseUrl,
    ] {
        let _ = writeln!(out, "  {:<24}{}", format!("{key}:"), value(key));
    }

    if !config.custom_properties.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", "Custom Properties:".bold());
        for (key, v) in &config.custom_properties {
            let _ = writeln!(out, "  {:<24}{}", format!("{key}:"), v);
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{}", "Configuration Location:".bold());
    let _ = writeln!(out, "  Directory: {}", manager.config_dir().display());
    let _ = writeln!(out, "  File:      {}", manager.config_file().display());
    out
}

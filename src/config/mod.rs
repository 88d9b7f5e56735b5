//! Configuration management for mongo-launcher.
//!
//! Settings live in `config.json` inside the configuration directory, which is
//! also where the cluster registry (`clusters.json`) is kept.
//!
//! # Configuration directory
//!
//! In order of precedence:
//!
//! 1. `--config-dir <dir>` (or `MONGO_LAUNCHER_CONFIG_DIR`)
//! 2. Windows: `%APPDATA%\MongoLauncher`
//! 3. macOS: `~/.mongo-launcher`
//! 4. Linux and other Unix: `$XDG_CONFIG_HOME/mongo-launcher`, falling back to
//!    `~/.config/mongo-launcher`
//!
//! # Examples
//!
//! ```rust,no_run
//! use mongo_launcher::config::ConfigManager;
//!
//! # fn example() -> anyhow::Result<()> {
//! let mut manager = ConfigManager::open(ConfigManager::default_config_dir()?);
//! manager.config_mut().set("defaultMongoVersion", "8.0")?;
//! manager.save()?;
//! # Ok(())
//! # }
//! ```

mod user;

pub use user::{ConfigKey, UserConfig, mask_secret};

use crate::constants::CONFIG_FILE_NAME;
use crate::utils::fs::atomic_write_with_mode;
use crate::utils::platform::{get_home_dir, is_macos, is_windows};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Loads and persists [`UserConfig`] for one configuration directory.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: PathBuf,
    config: UserConfig,
}

impl ConfigManager {
    /// Platform default configuration directory.
    pub fn default_config_dir() -> Result<PathBuf> {
        if is_windows() {
            let app_data = dirs::config_dir()
                .map_or_else(|| get_home_dir().map(|h| h.join("AppData").join("Roaming")), Ok)?;
            return Ok(app_data.join("MongoLauncher"));
        }

        if is_macos() {
            return Ok(get_home_dir()?.join(".mongo-launcher"));
        }

        let base = std::env::var_os("XDG_CONFIG_HOME")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .map_or_else(|| get_home_dir().map(|h| h.join(".config")), Ok)?;
        Ok(base.join("mongo-launcher"))
    }

    /// Open the configuration in `config_dir`.
    ///
    /// Never fails: a directory that cannot be created or a file that cannot
    /// be parsed is logged and defaults are used.
    #[must_use]
    pub fn open(config_dir: PathBuf) -> Self {
        if let Err(e) = std::fs::create_dir_all(&config_dir) {
            warn!("Failed to initialize config directory {}: {}", config_dir.display(), e);
        }

        let config_file = config_dir.join(CONFIG_FILE_NAME);
        let config = match std::fs::read_to_string(&config_file) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => {
                    debug!("Loaded configuration from {}", config_file.display());
                    config
                }
                Err(e) => {
                    warn!("Failed to parse {}: {}. Using defaults", config_file.display(), e);
                    UserConfig::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No existing config found at {}, using defaults", config_file.display());
                UserConfig::default()
            }
            Err(e) => {
                warn!("Failed to read {}: {}. Using defaults", config_file.display(), e);
                UserConfig::default()
            }
        };

        Self {
            config_dir,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &UserConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut UserConfig {
        &mut self.config
    }

    #[must_use]
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }

    /// Persist the configuration as pretty JSON, readable only by the owner
    /// on Unix since it may contain the Atlas client secret.
    pub fn save(&self) -> Result<()> {
        let path = self.config_file();
        let json = serde_json::to_string_pretty(&self.config).context("Failed to serialize configuration")?;
        atomic_write_with_mode(&path, json.as_bytes(), Some(0o600))
            .with_context(|| format!("Failed to save configuration to {}", path.display()))?;
        debug!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Delete the configuration file and go back to defaults.
    pub fn reset(&mut self) -> Result<()> {
        let path = self.config_file();
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to delete {}", path.display()));
            }
        }
        self.config = UserConfig::default();
        Ok(())
    }
}

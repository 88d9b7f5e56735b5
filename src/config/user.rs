//! User preferences stored in `config.json`.
//!
//! The file uses camelCase keys so it stays readable and hand-editable:
//!
//! ```json
//! {
//!   "defaultMongoVersion": "7.0",
//!   "defaultAtlasProjectId": "5f1a...",
//!   "defaultInstanceSize": "M10",
//!   "defaultRegion": "US_EAST_1",
//!   "defaultCloudProvider": "AWS",
//!   "interactiveMode": true,
//!   "defaultDataPath": "~/.mongo-launcher/data",
//!   "defaultLogPath": "~/.mongo-launcher/logs",
//!   "atlasBaseUrl": "https://cloud.mongodb.com",
//!   "customProperties": {}
//! }
//! ```
//!
//! Keys missing from the file take their default, so older files keep
//! working as settings are added.

use crate::constants::{
    ATLAS_BASE_URL, ATLAS_CLIENT_ID_ENV, ATLAS_CLIENT_SECRET_ENV, DEFAULT_CLOUD_PROVIDER,
    DEFAULT_INSTANCE_SIZE, DEFAULT_MONGO_VERSION, DEFAULT_REGION,
};
use crate::core::LauncherError;
use crate::utils::platform::resolve_path;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// A known configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    DefaultMongoVersion,
    DefaultAtlasProjectId,
    DefaultInstanceSize,
    DefaultRegion,
    DefaultCloudProvider,
    InteractiveMode,
    DefaultDataPath,
    DefaultLogPath,
    AtlasClientId,
    AtlasClientSecret,
    AtlasBaseUrl,
}

impl ConfigKey {
    pub const ALL: [Self; 11] = [
        Self::DefaultMongoVersion,
        Self::DefaultAtlasProjectId,
        Self::DefaultInstanceSize,
        Self::DefaultRegion,
        Self::DefaultCloudProvider,
        Self::InteractiveMode,
        Self::DefaultDataPath,
        Self::DefaultLogPath,
        Self::AtlasClientId,
        Self::AtlasClientSecret,
        Self::AtlasBaseUrl,
    ];

    /// The canonical camelCase spelling.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::DefaultMongoVersion => "defaultMongoVersion",
            Self::DefaultAtlasProjectId => "defaultAtlasProjectId",
            Self::DefaultInstanceSize => "defaultInstanceSize",
            Self::DefaultRegion => "defaultRegion",
            Self::DefaultCloudProvider => "defaultCloudProvider",
            Self::InteractiveMode => "interactiveMode",
            Self::DefaultDataPath => "defaultDataPath",
            Self::DefaultLogPath => "defaultLogPath",
            Self::AtlasClientId => "atlasClientId",
            Self::AtlasClientSecret => "atlasClientSecret",
            Self::AtlasBaseUrl => "atlasBaseUrl",
        }
    }

    /// Case-insensitive lookup.
    #[must_use]
    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name().eq_ignore_ascii_case(key.trim()))
    }

    /// Whether the key holds a secret that must not be echoed.
    #[must_use]
    pub const fn is_secret(self) -> bool {
        matches!(self, Self::AtlasClientSecret)
    }

    /// The closest known key to a misspelled one.
    #[must_use]
    pub fn suggest(key: &str) -> Option<Self> {
        let key = key.to_lowercase();
        Self::ALL
            .into_iter()
            .map(|k| (k, strsim::levenshtein(&key, &k.name().to_lowercase())))
            .filter(|(_, distance)| *distance > 0 && *distance <= 3)
            .min_by_key(|(_, distance)| *distance)
            .map(|(k, _)| k)
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn default_data_path() -> String {
    default_app_path("data")
}

fn default_log_path() -> String {
    default_app_path("logs")
}

fn default_app_path(leaf: &str) -> String {
    if cfg!(windows) {
        dirs::home_dir()
            .map(|home| home.join("AppData").join("Local").join("MongoLauncher").join(leaf))
            .map_or_else(|| format!("MongoLauncher\\{leaf}"), |p| p.display().to_string())
    } else {
        format!("~/.mongo-launcher/{leaf}")
    }
}

/// Parse the boolean spellings accepted for `interactiveMode`.
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "y" | "on" | "1" => Some(true),
        "false" | "no" | "n" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// User configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserConfig {
    pub default_mongo_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_atlas_project_id: Option<String>,
    pub default_instance_size: String,
    pub default_region: String,
    pub default_cloud_provider: String,
    pub interactive_mode: bool,
    pub default_data_path: String,
    pub default_log_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atlas_client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atlas_client_secret: Option<String>,
    pub atlas_base_url: String,
    pub custom_properties: BTreeMap<String, String>,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            default_mongo_version: DEFAULT_MONGO_VERSION.to_string(),
            default_atlas_project_id: None,
            default_instance_size: DEFAULT_INSTANCE_SIZE.to_string(),
            default_region: DEFAULT_REGION.to_string(),
            default_cloud_provider: DEFAULT_CLOUD_PROVIDER.to_string(),
            interactive_mode: true,
            default_data_path: default_data_path(),
            default_log_path: default_log_path(),
            atlas_client_id: None,
            atlas_client_secret: None,
            atlas_base_url: ATLAS_BASE_URL.to_string(),
            custom_properties: BTreeMap::new(),
        }
    }
}

impl UserConfig {
    /// Value of a known key, `None` when an optional key is unset.
    #[must_use]
    pub fn get_known(&self, key: ConfigKey) -> Option<String> {
        match key {
            ConfigKey::DefaultMongoVersion => Some(self.default_mongo_version.clone()),
            ConfigKey::DefaultAtlasProjectId => self.default_atlas_project_id.clone(),
            ConfigKey::DefaultInstanceSize => Some(self.default_instance_size.clone()),
            ConfigKey::DefaultRegion => Some(self.default_region.clone()),
            ConfigKey::DefaultCloudProvider => Some(self.default_cloud_provider.clone()),
            ConfigKey::InteractiveMode => Some(self.interactive_mode.to_string()),
            ConfigKey::DefaultDataPath => Some(self.default_data_path.clone()),
            ConfigKey::DefaultLogPath => Some(self.default_log_path.clone()),
            ConfigKey::AtlasClientId => self.atlas_client_id.clone(),
            ConfigKey::AtlasClientSecret => self.atlas_client_secret.clone(),
            ConfigKey::AtlasBaseUrl => Some(self.atlas_base_url.clone()),
        }
    }

    /// Look up a key: known keys case-insensitively, anything else as a
    /// custom property.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        match ConfigKey::parse(key) {
            Some(known) => self.get_known(known),
            None => self.custom_properties.get(key).cloned(),
        }
    }

    /// Set a key. Unknown keys are stored as custom properties.
    ///
    /// # Errors
    ///
    /// Returns [`LauncherError::ConfigError`] for values a known key cannot
    /// hold (a non-boolean `interactiveMode`, an empty version).
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), LauncherError> {
        let Some(known) = ConfigKey::parse(key) else {
            self.custom_properties.insert(key.to_string(), value.to_string());
            return Ok(());
        };

        let value = value.trim().to_string();
        let invalid = |expected: &str| LauncherError::ConfigError {
            message: format!("Invalid value '{value}' for {known}: expected {expected}"),
        };

        match known {
            ConfigKey::InteractiveMode => {
                self.interactive_mode = parse_bool(&value).ok_or_else(|| invalid("true or false"))?;
            }
            _ if value.is_empty() => return Err(invalid("a non-empty value")),
            ConfigKey::DefaultMongoVersion => self.default_mongo_version = value,
            ConfigKey::DefaultAtlasProjectId => self.default_atlas_project_id = Some(value),
            ConfigKey::DefaultInstanceSize => self.default_instance_size = value.to_uppercase(),
            ConfigKey::DefaultRegion => self.default_region = value.to_uppercase(),
            ConfigKey::DefaultCloudProvider => self.default_cloud_provider = value.to_uppercase(),
            ConfigKey::DefaultDataPath => self.default_data_path = value,
            ConfigKey::DefaultLogPath => self.default_log_path = value,
            ConfigKey::AtlasClientId => self.atlas_client_id = Some(value),
            ConfigKey::AtlasClientSecret => self.atlas_client_secret = Some(value),
            ConfigKey::AtlasBaseUrl => self.atlas_base_url = value.trim_end_matches('/').to_string(),
        }
        Ok(())
    }

    /// Remove a setting.
    ///
    /// Optional keys are cleared, other known keys go back to their default
    /// and custom properties are deleted. Returns whether a custom property
    /// or known key was recognised.
    pub fn unset(&mut self, key: &str) -> bool {
        let Some(known) = ConfigKey::parse(key) else {
            return self.custom_properties.remove(key).is_some();
        };

        let defaults = Self::default();
        match known {
            ConfigKey::DefaultMongoVersion => self.default_mongo_version = defaults.default_mongo_version,
            ConfigKey::DefaultAtlasProjectId => self.default_atlas_project_id = None,
            ConfigKey::DefaultInstanceSize => self.default_instance_size = defaults.default_instance_size,
            ConfigKey::DefaultRegion => self.default_region = defaults.default_region,
            ConfigKey::DefaultCloudProvider => self.default_cloud_provider = defaults.default_cloud_provider,
            ConfigKey::InteractiveMode => self.interactive_mode = defaults.interactive_mode,
            ConfigKey::DefaultDataPath => self.default_data_path = defaults.default_data_path,
            ConfigKey::DefaultLogPath => self.default_log_path = defaults.default_log_path,
            ConfigKey::AtlasClientId => self.atlas_client_id = None,
            ConfigKey::AtlasClientSecret => self.atlas_client_secret = None,
            ConfigKey::AtlasBaseUrl => self.atlas_base_url = defaults.atlas_base_url,
        }
        true
    }

    /// Expanded default data directory.
    pub fn data_path(&self) -> Result<PathBuf> {
        resolve_path(&self.default_data_path)
    }

    /// Expanded default log directory.
    pub fn log_path(&self) -> Result<PathBuf> {
        resolve_path(&self.default_log_path)
    }

    /// Atlas service account credentials: configuration first, then the
    /// `MONGODB_ATLAS_CLIENT_ID`/`MONGODB_ATLAS_CLIENT_SECRET` environment.
    #[must_use]
    pub fn atlas_credentials(&self) -> Option<(String, String)> {
        let from_env = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        let id = self.atlas_client_id.clone().or_else(|| from_env(ATLAS_CLIENT_ID_ENV))?;
        let secret = self.atlas_client_secret.clone().or_else(|| from_env(ATLAS_CLIENT_SECRET_ENV))?;
        Some((id, secret))
    }
}

/// Mask a secret for display, keeping the last four characters.
#[must_use]
pub fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 4 {
        return "****".to_string();
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("****{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = UserConfig::default();
        assert_eq!(config.default_mongo_version, "7.0");
        assert_eq!(config.default_instance_size, "M10");
        assert_eq!(config.default_region, "US_EAST_1");
        assert_eq!(config.default_cloud_provider, "AWS");
        assert!(config.interactive_mode);
        assert!(config.default_atlas_project_id.is_none());
        assert!(config.custom_properties.is_empty());
    }

    #[test]
    fn test_json_uses_camel_case_and_fills_missing_keys() {
        let config: UserConfig =
            serde_json::from_str(r#"{"defaultMongoVersion": "8.0", "interactiveMode": false}"#).unwrap();
        assert_eq!(config.default_mongo_version, "8.0");
        assert!(!config.interactive_mode);
        assert_eq!(config.default_region, "US_EAST_1");

        let json = serde_json::to_string(&UserConfig::default()).unwrap();
        assert!(json.contains("\"defaultMongoVersion\""));
        assert!(json.contains("\"customProperties\""));
        assert!(!json.contains("atlasClientSecret"));
    }

    #[test]
    fn test_set_and_get_are_case_insensitive() {
        let mut config = UserConfig::default();
        config.set("DEFAULTATLASPROJECTID", "abc123").unwrap();
        assert_eq!(config.get("defaultAtlasProjectId").as_deref(), Some("abc123"));
        assert_eq!(config.get("defaultatlasprojectid").as_deref(), Some("abc123"));

        config.set("defaultRegion", "eu_west_1").unwrap();
        assert_eq!(config.default_region, "EU_WEST_1");
    }

    #[test]
    fn test_interactive_mode_parsing() {
        let mut config = UserConfig::default();
        config.set("interactiveMode", "no").unwrap();
        assert!(!config.interactive_mode);
        config.set("interactiveMode", "1").unwrap();
        assert!(config.interactive_mode);

        let err = config.set("interactiveMode", "maybe").unwrap_err();
        assert!(matches!(err, LauncherError::ConfigError { .. }));
        assert!(config.interactive_mode);
    }

    #[test]
    fn test_empty_value_rejected_for_known_keys() {
        let mut config = UserConfig::default();
        assert!(config.set("defaultMongoVersion", "  ").is_err());
        assert_eq!(config.default_mongo_version, "7.0");
    }

    #[test]
    fn test_custom_properties() {
        let mut config = UserConfig::default();
        config.set("team", "platform").unwrap();
        assert_eq!(config.get("team").as_deref(), Some("platform"));
        assert!(config.get("Team").is_none());

        assert!(config.unset("team"));
        assert!(config.get("team").is_none());
        assert!(!config.unset("team"));
    }

    #[test]
    fn test_unset_restores_defaults_and_clears_optionals() {
        let mut config = UserConfig::default();
        config.set("defaultMongoVersion", "6.0").unwrap();
        config.set("defaultAtlasProjectId", "p1").unwrap();

        assert!(config.unset("defaultMongoVersion"));
        assert!(config.unset("defaultAtlasProjectId"));

        assert_eq!(config.default_mongo_version, "7.0");
        assert!(config.get("defaultAtlasProjectId").is_none());
    }

    #[test]
    fn test_key_suggestions() {
        assert_eq!(ConfigKey::suggest("defaultRegoin"), Some(ConfigKey::DefaultRegion));
        assert_eq!(ConfigKey::suggest("interactivemod"), Some(ConfigKey::InteractiveMode));
        assert_eq!(ConfigKey::suggest("team"), None);
        assert_eq!(ConfigKey::suggest("defaultRegion"), None);
    }

    #[test]
    fn test_atlas_credentials_from_config() {
        let mut config = UserConfig::default();
        config.set("atlasClientId", "id").unwrap();
        config.set("atlasClientSecret", "secret").unwrap();
        assert_eq!(config.atlas_credentials(), Some(("id".to_string(), "secret".to_string())));
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("abc"), "****");
        assert_eq!(mask_secret("mdb_sa_sk_12345678"), "****5678");
    }
}

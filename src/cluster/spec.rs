//! Cluster specifications.
//!
//! A [`ClusterSpec`] describes the cluster a user wants. It is what `launch`
//! builds from flags, prompts or a JSON spec file, and it is stored with
//! every registered cluster so the cluster can be restarted later.
//!
//! Spec files are JSON tagged by `type`:
//!
//! ```json
//! {
//!   "type": "local",
//!   "name": "dev",
//!   "mongoVersion": "7.0",
//!   "topology": "replica-set",
//!   "replicaSetSize": 3
//! }
//! ```

use crate::constants::{
    DEFAULT_CLOUD_PROVIDER, DEFAULT_INSTANCE_SIZE, DEFAULT_MONGO_VERSION, DEFAULT_PORT, DEFAULT_REGION,
    DEFAULT_REPLICA_SET_SIZE, DEFAULT_SHARD_COUNT, MAX_REPLICA_SET_SIZE, MIN_REPLICA_SET_SIZE,
    MONGOS_PORT_OFFSET,
};
use crate::core::LauncherError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Where a cluster runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ClusterType {
    Local,
    Atlas,
}

impl fmt::Display for ClusterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Atlas => f.write_str("atlas"),
        }
    }
}

impl FromStr for ClusterType {
    type Err = LauncherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "atlas" => Ok(Self::Atlas),
            other => Err(LauncherError::NoLauncher {
                cluster_type: other.to_string(),
            }),
        }
    }
}

/// Shape of a local cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum LocalTopology {
    #[default]
    #[serde(alias = "STANDALONE")]
    Standalone,
    #[serde(alias = "REPLICA_SET")]
    ReplicaSet,
    #[serde(alias = "SHARDED")]
    Sharded,
}

impl fmt::Display for LocalTopology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standalone => f.write_str("standalone"),
            Self::ReplicaSet => f.write_str("replica-set"),
            Self::Sharded => f.write_str("sharded"),
        }
    }
}

/// Shape of an Atlas cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AtlasTopology {
    #[default]
    #[serde(alias = "REPLICA_SET")]
    ReplicaSet,
    #[serde(alias = "SHARDED")]
    Sharded,
}

impl AtlasTopology {
    /// The `clusterType` value used by the Atlas Administration API.
    #[must_use]
    pub const fn api_name(self) -> &'static str {
        match self {
            Self::ReplicaSet => "REPLICASET",
            Self::Sharded => "SHARDED",
        }
    }
}

impl fmt::Display for AtlasTopology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReplicaSet => f.write_str("replica-set"),
            Self::Sharded => f.write_str("sharded"),
        }
    }
}

impl TryFrom<LocalTopology> for AtlasTopology {
    type Error = LauncherError;

    fn try_from(value: LocalTopology) -> Result<Self, Self::Error> {
        match value {
            LocalTopology::ReplicaSet => Ok(Self::ReplicaSet),
            LocalTopology::Sharded => Ok(Self::Sharded),
            LocalTopology::Standalone => Err(LauncherError::ConfigError {
                message: "Atlas clusters cannot be standalone; use replica-set or sharded".to_string(),
            }),
        }
    }
}

/// A cluster of `mongod`/`mongos` processes on this machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LocalClusterSpec {
    pub name: String,
    pub mongo_version: String,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_path: Option<String>,
    pub topology: LocalTopology,
    pub replica_set_size: u32,
    pub shard_count: u32,
    pub enable_auth: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_password: Option<String>,
    pub additional_options: Vec<String>,
}

impl Default for LocalClusterSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            mongo_version: DEFAULT_MONGO_VERSION.to_string(),
            port: DEFAULT_PORT,
            data_path: None,
            log_path: None,
            topology: LocalTopology::Standalone,
            replica_set_size: DEFAULT_REPLICA_SET_SIZE,
            shard_count: DEFAULT_SHARD_COUNT,
            enable_auth: false,
            auth_user: None,
            auth_password: None,
            additional_options: Vec::new(),
        }
    }
}

impl LocalClusterSpec {
    #[must_use]
    pub fn new(name: impl Into<String>, mongo_version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mongo_version: mongo_version.into(),
            ..Self::default()
        }
    }

    /// Number of `mongod`/`mongos` processes the topology needs.
    #[must_use]
    pub const fn process_count(&self) -> u32 {
        match self.topology {
            LocalTopology::Standalone => 1,
            LocalTopology::ReplicaSet => self.replica_set_size,
            // shards, one config server, one mongos
            LocalTopology::Sharded => self.shard_count.saturating_mul(self.replica_set_size).saturating_add(2),
        }
    }

    /// Highest port the topology binds.
    #[must_use]
    pub const fn highest_port(&self) -> u32 {
        let base = self.port as u32;
        match self.topology {
            LocalTopology::Standalone => base,
            LocalTopology::ReplicaSet => base.saturating_add(self.replica_set_size.saturating_sub(1)),
            LocalTopology::Sharded => {
                let config_port = base.saturating_add(self.shard_count.saturating_mul(self.replica_set_size));
                let mongos_port = base + MONGOS_PORT_OFFSET as u32;
                if config_port > mongos_port {
                    config_port
                } else {
                    mongos_port
                }
            }
        }
    }

    fn validate(&self) -> Result<(), LauncherError> {
        let invalid = |message: String| LauncherError::ConfigError {
            message,
        };

        if self.port == 0 {
            return Err(invalid("Port must be between 1 and 65535".to_string()));
        }
        if self.topology != LocalTopology::Standalone
            && !(MIN_REPLICA_SET_SIZE..=MAX_REPLICA_SET_SIZE).contains(&self.replica_set_size)
        {
            return Err(invalid(format!(
                "Replica set size must be between {MIN_REPLICA_SET_SIZE} and {MAX_REPLICA_SET_SIZE}"
            )));
        }
        if self.topology == LocalTopology::Sharded && self.shard_count == 0 {
            return Err(invalid("Shard count must be at least 1".to_string()));
        }
        if self.highest_port() > u32::from(u16::MAX) {
            return Err(invalid(format!(
                "Port {} leaves no room for the {} topology; choose a lower port",
                self.port, self.topology
            )));
        }
        if self.topology == LocalTopology::Sharded
            && self.shard_count.saturating_mul(self.replica_set_size) >= u32::from(MONGOS_PORT_OFFSET)
        {
            return Err(invalid("Too many shard members: their ports would collide with mongos".to_string()));
        }
        if self.auth_user.is_some() != self.auth_password.is_some() {
            return Err(invalid("authUser and authPassword must be set together".to_string()));
        }
        Ok(())
    }
}

/// A cluster provisioned through MongoDB Atlas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AtlasClusterSpec {
    pub name: String,
    pub mongo_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub instance_size: String,
    pub region: String,
    pub cloud_provider: String,
    pub enable_backup: bool,
    pub topology: AtlasTopology,
    pub shard_count: u32,
}

impl Default for AtlasClusterSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            mongo_version: DEFAULT_MONGO_VERSION.to_string(),
            project_id: None,
            instance_size: DEFAULT_INSTANCE_SIZE.to_string(),
            region: DEFAULT_REGION.to_string(),
            cloud_provider: DEFAULT_CLOUD_PROVIDER.to_string(),
            enable_backup: true,
            topology: AtlasTopology::ReplicaSet,
            shard_count: DEFAULT_SHARD_COUNT,
        }
    }
}

impl AtlasClusterSpec {
    #[must_use]
    pub fn new(name: impl Into<String>, mongo_version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mongo_version: mongo_version.into(),
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<(), LauncherError> {
        if self.topology == AtlasTopology::Sharded && self.shard_count == 0 {
            return Err(LauncherError::ConfigError {
                message: "Shard count must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Either kind of cluster specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClusterSpec {
    #[serde(alias = "LOCAL")]
    Local(LocalClusterSpec),
    #[serde(alias = "ATLAS")]
    Atlas(AtlasClusterSpec),
}

impl ClusterSpec {
    #[must_use]
    pub const fn cluster_type(&self) -> ClusterType {
        match self {
            Self::Local(_) => ClusterType::Local,
            Self::Atlas(_) => ClusterType::Atlas,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Local(spec) => &spec.name,
            Self::Atlas(spec) => &spec.name,
        }
    }

    #[must_use]
    pub fn mongo_version(&self) -> &str {
        match self {
            Self::Local(spec) => &spec.mongo_version,
            Self::Atlas(spec) => &spec.mongo_version,
        }
    }

    /// Read a JSON spec file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read cluster spec file: {}", path.display()))?;
        let spec: Self = serde_json::from_str(&content)
            .with_context(|| format!("Invalid cluster spec file: {}", path.display()))?;
        Ok(spec)
    }

    /// Check the spec before anything is started or created.
    ///
    /// Names may contain letters, digits, `-` and `_` and must start with a
    /// letter or digit; they become directory names, replica set names and
    /// Atlas cluster names.
    pub fn validate(&self) -> Result<(), LauncherError> {
        let name = self.name();
        if name.trim().is_empty() {
            return Err(LauncherError::MissingOption {
                option: "Cluster name".to_string(),
                hint: "Use --name to specify a cluster name".to_string(),
            });
        }
        let valid_name = name.len() <= 64
            && name.chars().next().is_some_and(|c| c.is_ascii_alphanumeric())
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid_name {
            return Err(LauncherError::ConfigError {
                message: format!(
                    "Invalid cluster name '{name}': use up to 64 letters, digits, '-' or '_', starting with a letter or digit"
                ),
            });
        }
        if self.mongo_version().trim().is_empty() {
            return Err(LauncherError::MissingOption {
                option: "MongoDB version".to_string(),
                hint: "Use --mongo-version or set defaultMongoVersion".to_string(),
            });
        }

        match self {
            Self::Local(spec) => spec.validate(),
            Self::Atlas(spec) => spec.validate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_spec_json_defaults() {
        let spec: ClusterSpec = serde_json::from_str(r#"{"type": "local", "name": "dev"}"#).unwrap();
        let ClusterSpec::Local(local) = &spec else {
            panic!("expected local spec");
        };
        assert_eq!(local.port, 27017);
        assert_eq!(local.topology, LocalTopology::Standalone);
        assert_eq!(local.replica_set_size, 3);
        assert_eq!(local.shard_count, 2);
        assert!(!local.enable_auth);
        assert_eq!(spec.mongo_version(), "7.0");
        assert_eq!(spec.cluster_type(), ClusterType::Local);
    }

    #[test]
    fn test_atlas_spec_json_defaults() {
        let spec: ClusterSpec =
            serde_json::from_str(r#"{"type": "atlas", "name": "prod", "projectId": "p1"}"#).unwrap();
        let ClusterSpec::Atlas(atlas) = &spec else {
            panic!("expected atlas spec");
        };
        assert_eq!(atlas.instance_size, "M10");
        assert_eq!(atlas.region, "US_EAST_1");
        assert_eq!(atlas.cloud_provider, "AWS");
        assert!(atlas.enable_backup);
        assert_eq!(atlas.topology, AtlasTopology::ReplicaSet);
    }

    #[test]
    fn test_upper_case_enum_spellings_accepted() {
        let spec: ClusterSpec = serde_json::from_str(
            r#"{"type": "LOCAL", "name": "dev", "topology": "REPLICA_SET", "replicaSetSize": 5}"#,
        )
        .unwrap();
        let ClusterSpec::Local(local) = spec else {
            panic!("expected local spec");
        };
        assert_eq!(local.topology, LocalTopology::ReplicaSet);
        assert_eq!(local.replica_set_size, 5);
    }

    #[test]
    fn test_serialization_is_tagged_camel_case() {
        let mut local = LocalClusterSpec::new("dev", "7.0");
        local.topology = LocalTopology::ReplicaSet;
        let json = serde_json::to_value(ClusterSpec::Local(local)).unwrap();

        assert_eq!(json["type"], "local");
        assert_eq!(json["mongoVersion"], "7.0");
        assert_eq!(json["topology"], "replica-set");
        assert_eq!(json["replicaSetSize"], 3);
    }

    #[test]
    fn test_validate_name() {
        assert!(ClusterSpec::Local(LocalClusterSpec::new("dev-1_a", "7.0")).validate().is_ok());

        let err = ClusterSpec::Local(LocalClusterSpec::new("", "7.0")).validate().unwrap_err();
        assert!(matches!(err, LauncherError::MissingOption { .. }));

        for bad in ["-dev", "my cluster", "../etc", "dev/1"] {
            assert!(ClusterSpec::Local(LocalClusterSpec::new(bad, "7.0")).validate().is_err(), "{bad}");
        }
    }

    #[test]
    fn test_validate_local_topology_limits() {
        let mut spec = LocalClusterSpec::new("dev", "7.0");
        spec.topology = LocalTopology::ReplicaSet;
        spec.replica_set_size = 0;
        assert!(ClusterSpec::Local(spec.clone()).validate().is_err());

        spec.replica_set_size = 3;
        spec.port = 65534;
        assert!(ClusterSpec::Local(spec.clone()).validate().is_err());

        spec.port = 27017;
        spec.topology = LocalTopology::Sharded;
        spec.shard_count = 0;
        assert!(ClusterSpec::Local(spec.clone()).validate().is_err());

        spec.shard_count = 2;
        assert!(ClusterSpec::Local(spec).validate().is_ok());
    }

    #[test]
    fn test_validate_auth_pair() {
        let mut spec = LocalClusterSpec::new("dev", "7.0");
        spec.enable_auth = true;
        spec.auth_user = Some("admin".to_string());
        assert!(ClusterSpec::Local(spec.clone()).validate().is_err());

        spec.auth_password = Some("secret".to_string());
        assert!(ClusterSpec::Local(spec).validate().is_ok());
    }

    #[test]
    fn test_process_count_and_highest_port() {
        let mut spec = LocalClusterSpec::new("dev", "7.0");
        assert_eq!(spec.process_count(), 1);
        assert_eq!(spec.highest_port(), 27017);

        spec.topology = LocalTopology::ReplicaSet;
        assert_eq!(spec.process_count(), 3);
        assert_eq!(spec.highest_port(), 27019);

        spec.topology = LocalTopology::Sharded;
        assert_eq!(spec.process_count(), 8);
        assert_eq!(spec.highest_port(), 28017);
    }

    #[test]
    fn test_local_topology_to_atlas() {
        assert_eq!(AtlasTopology::try_from(LocalTopology::Sharded).unwrap(), AtlasTopology::Sharded);
        assert!(AtlasTopology::try_from(LocalTopology::Standalone).is_err());
    }

    #[test]
    fn test_from_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("spec.json");
        std::fs::write(&path, r#"{"type": "atlas", "name": "x", "instanceSize": "M0"}"#).unwrap();

        let spec = ClusterSpec::from_file(&path).unwrap();
        assert_eq!(spec.cluster_type(), ClusterType::Atlas);

        assert!(ClusterSpec::from_file(&temp.path().join("missing.json")).is_err());
    }
}

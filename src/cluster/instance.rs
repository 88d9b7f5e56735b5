//! Running (or once running) clusters.

use crate::cluster::spec::{ClusterSpec, ClusterType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Lifecycle state of a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClusterStatus {
    Creating,
    Ready,
    Starting,
    Stopping,
    Stopped,
    Error,
    Destroyed,
}

impl fmt::Display for ClusterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Creating => "CREATING",
            Self::Ready => "READY",
            Self::Starting => "STARTING",
            Self::Stopping => "STOPPING",
            Self::Stopped => "STOPPED",
            Self::Error => "ERROR",
            Self::Destroyed => "DESTROYED",
        };
        f.write_str(name)
    }
}

/// What a local process does within its cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessRole {
    /// A standalone server or replica set member.
    Mongod,
    /// A member of a shard replica set.
    Shard,
    /// A member of the config server replica set.
    ConfigServer,
    /// The query router.
    Mongos,
}

impl ProcessRole {
    /// Order in which processes are stopped: routers first, config servers
    /// last.
    #[must_use]
    pub const fn stop_order(self) -> u8 {
        match self {
            Self::Mongos => 0,
            Self::Shard | Self::Mongod => 1,
            Self::ConfigServer => 2,
        }
    }
}

impl fmt::Display for ProcessRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mongod => f.write_str("mongod"),
            Self::Shard => f.write_str("shard"),
            Self::ConfigServer => f.write_str("config-server"),
            Self::Mongos => f.write_str("mongos"),
        }
    }
}

/// A local `mongod`/`mongos` process started by the launcher.
///
/// `binary` and `args` are kept so the process can be restarted with the
/// exact same command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedProcess {
    pub pid: u32,
    pub port: u16,
    pub role: ProcessRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replica_set: Option<String>,
    pub binary: PathBuf,
    pub args: Vec<String>,
    pub log_path: PathBuf,
}

/// A cluster known to the launcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterInstance {
    pub id: String,
    pub name: String,
    pub spec: ClusterSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_string: Option<String>,
    pub status: ClusterStatus,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub processes: Vec<ManagedProcess>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl ClusterInstance {
    /// A new instance in the `CREATING` state.
    #[must_use]
    pub fn new(id: impl Into<String>, spec: ClusterSpec) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: spec.name().to_string(),
            spec,
            connection_string: None,
            status: ClusterStatus::Creating,
            created_at: now,
            last_updated: now,
            processes: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Build an id of the form `<prefix>-<name>-<epoch millis>`.
    #[must_use]
    pub fn generate_id(prefix: &str, name: &str) -> String {
        format!("{prefix}-{name}-{}", Utc::now().timestamp_millis())
    }

    /// Change the status and touch `last_updated`.
    pub fn set_status(&mut self, status: ClusterStatus) {
        self.status = status;
        self.last_updated = Utc::now();
    }

    #[must_use]
    pub const fn cluster_type(&self) -> ClusterType {
        self.spec.cluster_type()
    }

    /// A metadata value as a string, if present.
    #[must_use]
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(serde_json::Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::spec::LocalClusterSpec;

    #[test]
    fn test_new_instance_is_creating() {
        let instance = ClusterInstance::new("local-dev-1", ClusterSpec::Local(LocalClusterSpec::new("dev", "7.0")));
        assert_eq!(instance.status, ClusterStatus::Creating);
        assert_eq!(instance.name, "dev");
        assert_eq!(instance.created_at, instance.last_updated);
        assert_eq!(instance.cluster_type(), ClusterType::Local);
    }

    #[test]
    fn test_set_status_touches_last_updated() {
        let mut instance =
            ClusterInstance::new("local-dev-1", ClusterSpec::Local(LocalClusterSpec::new("dev", "7.0")));
        let before = instance.last_updated;
        std::thread::sleep(std::time::Duration::from_millis(5));

        instance.set_status(ClusterStatus::Ready);

        assert_eq!(instance.status, ClusterStatus::Ready);
        assert!(instance.last_updated > before);
    }

    #[test]
    fn test_generate_id() {
        let id = ClusterInstance::generate_id("atlas", "prod");
        assert!(id.starts_with("atlas-prod-"));
        assert!(id.rsplit('-').next().unwrap().parse::<i64>().is_ok());
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&ClusterStatus::Ready).unwrap(), "\"READY\"");
        assert_eq!(ClusterStatus::Stopped.to_string(), "STOPPED");
    }

    #[test]
    fn test_stop_order() {
        let mut roles = [ProcessRole::ConfigServer, ProcessRole::Shard, ProcessRole::Mongos];
        roles.sort_by_key(|r| r.stop_order());
        assert_eq!(roles, [ProcessRole::Mongos, ProcessRole::Shard, ProcessRole::ConfigServer]);
    }
}

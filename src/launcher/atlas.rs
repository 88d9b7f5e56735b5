//! Clusters provisioned through MongoDB Atlas.

use crate::cluster::{AtlasClusterSpec, AtlasTopology, ClusterInstance, ClusterSpec, ClusterStatus};
use crate::constants::{ATLAS_POLL_INTERVAL, ATLAS_TENANT_SIZES, ATLAS_WAIT_TIMEOUT};
use crate::core::LauncherError;
use crate::launcher::ClusterLauncher;
use crate::launcher::atlas_client::{AtlasClient, AtlasCluster};
use crate::utils::progress::spinner_with_message;
use crate::version::MongoVersion;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const PROJECT_ID_KEY: &str = "projectId";
const ATLAS_ID_KEY: &str = "atlasClusterId";

/// Map an Atlas `stateName` (and pause flag) to a [`ClusterStatus`].
#[must_use]
pub fn map_state(state_name: Option<&str>, paused: bool) -> ClusterStatus {
    match state_name.unwrap_or_default() {
        "IDLE" if paused => ClusterStatus::Stopped,
        "IDLE" => ClusterStatus::Ready,
        "CREATING" => ClusterStatus::Creating,
        "UPDATING" | "REPAIRING" => ClusterStatus::Starting,
        "DELETING" => ClusterStatus::Stopping,
        "DELETED" => ClusterStatus::Destroyed,
        other => {
            debug!("Unrecognised Atlas state '{}'", other);
            ClusterStatus::Error
        }
    }
}

/// Placeholder shown until Atlas publishes the real connection string.
#[must_use]
pub fn placeholder_connection_string(name: &str) -> String {
    format!("mongodb+srv://{name}.mongodb.net/test")
}

fn is_tenant(instance_size: &str) -> bool {
    ATLAS_TENANT_SIZES.iter().any(|size| size.eq_ignore_ascii_case(instance_size))
}

/// Request body for creating `spec`.
pub fn create_request(spec: &AtlasClusterSpec) -> Result<Value, LauncherError> {
    let tenant = is_tenant(&spec.instance_size);
    if tenant && spec.topology == AtlasTopology::Sharded {
        return Err(LauncherError::ConfigError {
            message: format!("{} clusters cannot be sharded; use M10 or larger", spec.instance_size),
        });
    }

    let major_version = MongoVersion::parse(&spec.mongo_version)
        .map_or_else(|_| spec.mongo_version.clone(), |v| v.major_minor());

    let region_config = if tenant {
        json!({
            "providerName": "TENANT",
            "backingProviderName": spec.cloud_provider,
            "regionName": spec.region,
            "priority": 7,
            "electableSpecs": { "instanceSize": spec.instance_size }
        })
    } else {
        json!({
            "providerName": spec.cloud_provider,
            "regionName": spec.region,
            "priority": 7,
            "electableSpecs": { "instanceSize": spec.instance_size, "nodeCount": 3 }
        })
    };

    let spec_count = match spec.topology {
        AtlasTopology::ReplicaSet => 1,
        AtlasTopology::Sharded => spec.shard_count,
    };
    let replication_specs: Vec<Value> = (0..spec_count)
        .map(|_| json!({ "zoneName": "Zone 1", "regionConfigs": [region_config.clone()] }))
        .collect();

    Ok(json!({
        "name": spec.name,
        "clusterType": spec.topology.api_name(),
        "mongoDBMajorVersion": major_version,
        // shared tiers have no configurable backup
        "backupEnabled": spec.enable_backup && !tenant,
        "replicationSpecs": replication_specs
    }))
}

/// Launcher for Atlas clusters.
pub struct AtlasClusterLauncher {
    client: Option<AtlasClient>,
    default_project_id: Option<String>,
    wait: bool,
    poll_interval: Duration,
    wait_timeout: Duration,
}

impl AtlasClusterLauncher {
    /// `credentials` is the service account `(client id, secret)`; without it
    /// every operation fails with [`LauncherError::AtlasCredentialsMissing`].
    #[must_use]
    pub fn new(base_url: &str, credentials: Option<(String, String)>, default_project_id: Option<String>) -> Self {
        Self {
            client: credentials.map(|(id, secret)| AtlasClient::new(base_url, id, secret)),
            default_project_id,
            wait: false,
            poll_interval: ATLAS_POLL_INTERVAL,
            wait_timeout: ATLAS_WAIT_TIMEOUT,
        }
    }

    /// Make `launch` poll until the cluster is ready.
    #[must_use]
    pub const fn with_wait(mut self, wait: bool) -> Self {
        self.wait = wait;
        self
    }

    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = interval;
        self.wait_timeout = timeout;
        self
    }

    fn client(&self) -> Result<&AtlasClient> {
        self.client.as_ref().ok_or_else(|| LauncherError::AtlasCredentialsMissing.into())
    }

    fn project_for_spec(&self, spec: &AtlasClusterSpec) -> Result<String> {
        spec.project_id.clone().or_else(|| self.default_project_id.clone()).ok_or_else(|| {
            LauncherError::MissingOption {
                option: "Atlas project id".to_string(),
                hint: "Use --project-id or `mongo-launcher config set defaultAtlasProjectId <id>`".to_string(),
            }
            .into()
        })
    }

    fn project_for_instance(&self, instance: &ClusterInstance) -> Result<String> {
        if let Some(project) = instance.metadata_str(PROJECT_ID_KEY) {
            return Ok(project.to_string());
        }
        match &instance.spec {
            ClusterSpec::Atlas(spec) => self.project_for_spec(spec),
            other => Err(LauncherError::NoLauncher {
                cluster_type: other.cluster_type().to_string(),
            }
            .into()),
        }
    }

    fn apply(instance: &mut ClusterInstance, cluster: &AtlasCluster) {
        let status = map_state(cluster.state_name.as_deref(), cluster.paused);
        if let Some(srv) = cluster.connection_strings.as_ref().and_then(|c| c.standard_srv.clone()) {
            instance.connection_string = Some(srv);
        } else if instance.connection_string.is_none() {
            instance.connection_string = Some(placeholder_connection_string(&instance.name));
        }
        if let Some(id) = &cluster.id {
            instance.metadata.insert(ATLAS_ID_KEY.to_string(), id.clone().into());
        }
        instance.set_status(status);
    }

    async fn wait_until_ready(&self, project_id: &str, instance: &mut ClusterInstance) -> Result<()> {
        let client = self.client()?;
        let started = Instant::now();
        let progress = spinner_with_message(format!("Waiting for {} to become ready...", instance.name));

        while started.elapsed() < self.wait_timeout {
            tokio::time::sleep(self.poll_interval).await;
            let Some(cluster) = client.get_cluster(project_id, &instance.name).await? else {
                progress.finish_and_clear();
                instance.set_status(ClusterStatus::Destroyed);
                return Ok(());
            };
            Self::apply(instance, &cluster);
            progress.set_message(format!("{} is {}", instance.name, cluster.state_name.as_deref().unwrap_or("?")));
            if instance.status == ClusterStatus::Ready {
                progress.finish_and_clear();
                return Ok(());
            }
        }

        progress.finish_and_clear();
        warn!(
            "{} was not ready after {} minutes; check it later with `mongo-launcher status {}`",
            instance.name,
            self.wait_timeout.as_secs() / 60,
            instance.name
        );
        Ok(())
    }
}

#[async_trait]
impl ClusterLauncher for AtlasClusterLauncher {
    fn name(&self) -> &'static str {
        "atlas"
    }

    fn supports(&self, spec: &ClusterSpec) -> bool {
        matches!(spec, ClusterSpec::Atlas(_))
    }

    async fn launch(&self, spec: &ClusterSpec) -> Result<ClusterInstance> {
        let ClusterSpec::Atlas(atlas) = spec else {
            return Err(LauncherError::NoLauncher {
                cluster_type: spec.cluster_type().to_string(),
            }
            .into());
        };
        info!("Launching Atlas cluster: {}", atlas.name);

        let project_id = self.project_for_spec(atlas)?;
        let body = create_request(atlas)?;
        let client = self.client()?;

        let created = client.create_cluster(&project_id, &body).await?;

        let mut instance = ClusterInstance::new(ClusterInstance::generate_id("atlas", &atlas.name), spec.clone());
        instance.metadata.insert(PROJECT_ID_KEY.to_string(), project_id.clone().into());
        Self::apply(&mut instance, &created);

        if self.wait && instance.status != ClusterStatus::Ready {
            self.wait_until_ready(&project_id, &mut instance).await?;
        }

        info!("Atlas cluster {} is {}", atlas.name, instance.status);
        Ok(instance)
    }

    async fn start(&self, instance: &mut ClusterInstance) -> Result<()> {
        let project_id = self.project_for_instance(instance)?;
        let client = self.client()?;
        let progress = spinner_with_message(format!("Resuming {}...", instance.name));
        let result = client.set_paused(&project_id, &instance.name, false).await;
        progress.finish_and_clear();
        Self::apply(instance, &result?);
        Ok(())
    }

    async fn stop(&self, instance: &mut ClusterInstance) -> Result<()> {
        let project_id = self.project_for_instance(instance)?;
        let client = self.client()?;
        let progress = spinner_with_message(format!("Pausing {}...", instance.name));
        let result = client.set_paused(&project_id, &instance.name, true).await;
        progress.finish_and_clear();
        result?;
        instance.set_status(ClusterStatus::Stopped);
        Ok(())
    }

    async fn destroy(&self, instance: &mut ClusterInstance) -> Result<()> {
        let project_id = self.project_for_instance(instance)?;
        let client = self.client()?;
        let progress = spinner_with_message(format!("Deleting {}...", instance.name));
        let deleted = client.delete_cluster(&project_id, &instance.name).await;
        progress.finish_and_clear();
        if !deleted? {
            debug!("Atlas cluster {} was already gone", instance.name);
        }
        instance.set_status(ClusterStatus::Destroyed);
        Ok(())
    }

    async fn status(&self, instance: &ClusterInstance) -> Result<ClusterStatus> {
        let project_id = self.project_for_instance(instance)?;
        Ok(match self.client()?.get_cluster(&project_id, &instance.name).await? {
            Some(cluster) => map_state(cluster.state_name.as_deref(), cluster.paused),
            None => ClusterStatus::Destroyed,
        })
    }

    async fn refresh(&self, instance: &mut ClusterInstance) -> Result<()> {
        let project_id = self.project_for_instance(instance)?;
        match self.client()?.get_cluster(&project_id, &instance.name).await? {
            Some(cluster) => Self::apply(instance, &cluster),
            None => instance.set_status(ClusterStatus::Destroyed),
        }
        Ok(())
    }
}

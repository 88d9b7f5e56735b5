//! Cluster launchers.
//!
//! A [`ClusterLauncher`] knows how to bring one kind of cluster to life and
//! manage it afterwards. The [`ClusterManager`] owns the available launchers
//! together with the [`ClusterRegistry`](crate::cluster::ClusterRegistry) and
//! is what the CLI talks to.
//!
//! - [`local`] - `mongod`/`mongos` processes on this machine
//! - [`atlas`] - clusters provisioned through the Atlas Administration API
//! - [`process`] - process spawning, readiness polling and shell scripts

pub mod atlas;
pub mod atlas_client;
pub mod local;
pub mod manager;
pub mod process;

pub use atlas::AtlasClusterLauncher;
pub use local::LocalClusterLauncher;
pub use manager::ClusterManager;

use crate::cluster::{ClusterInstance, ClusterSpec, ClusterStatus};
use anyhow::Result;
use async_trait::async_trait;

/// Creates and manages clusters of one kind.
#[async_trait]
pub trait ClusterLauncher: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Whether this launcher handles `spec`.
    fn supports(&self, spec: &ClusterSpec) -> bool;

    /// Create the cluster described by `spec`.
    ///
    /// On failure nothing is left running.
    async fn launch(&self, spec: &ClusterSpec) -> Result<ClusterInstance>;

    /// Start a stopped cluster again.
    async fn start(&self, instance: &mut ClusterInstance) -> Result<()>;

    async fn stop(&self, instance: &mut ClusterInstance) -> Result<()>;

    /// Stop the cluster and delete everything it owns.
    async fn destroy(&self, instance: &mut ClusterInstance) -> Result<()>;

    /// Observed state of the cluster.
    async fn status(&self, instance: &ClusterInstance) -> Result<ClusterStatus>;

    /// Bring the stored instance up to date with what is observed.
    async fn refresh(&self, instance: &mut ClusterInstance) -> Result<()> {
        let status = self.status(instance).await?;
        if status != instance.status {
            instance.set_status(status);
        }
        Ok(())
    }
}

//! Entry point for cluster lifecycle operations.

use crate::cluster::{ClusterInstance, ClusterRegistry, ClusterSpec, ClusterStatus};
use crate::core::LauncherError;
use crate::launcher::ClusterLauncher;
use anyhow::Result;
use tracing::{debug, info, warn};

/// Dispatches lifecycle operations to the right [`ClusterLauncher`] and keeps
/// the registry in sync.
pub struct ClusterManager {
    launchers: Vec<Box<dyn ClusterLauncher>>,
    registry: ClusterRegistry,
}

impl ClusterManager {
    #[must_use]
    pub fn new(registry: ClusterRegistry) -> Self {
        Self {
            launchers: Vec::new(),
            registry,
        }
    }

    /// Add a launcher. The first launcher supporting a spec wins.
    #[must_use]
    pub fn with_launcher(mut self, launcher: Box<dyn ClusterLauncher>) -> Self {
        self.launchers.push(launcher);
        self
    }

    #[must_use]
    pub fn registry(&self) -> &ClusterRegistry {
        &self.registry
    }

    fn launcher_for(&self, spec: &ClusterSpec) -> Result<&dyn ClusterLauncher> {
        self.launchers.iter().find(|l| l.supports(spec)).map(|l| l.as_ref()).ok_or_else(|| {
            LauncherError::NoLauncher {
                cluster_type: spec.cluster_type().to_string(),
            }
            .into()
        })
    }

    /// Validate `spec`, launch it and record the new cluster.
    pub async fn launch(&self, spec: &ClusterSpec) -> Result<ClusterInstance> {
        spec.validate()?;
        self.registry.ensure_name_available(spec.name()).await?;

        let launcher = self.launcher_for(spec)?;
        debug!("Launching {} with the {} launcher", spec.name(), launcher.name());
        let mut instance = launcher.launch(spec).await?;

        // another launch may have claimed the name while this one ran
        if let Err(e) = self.registry.insert(instance.clone()).await {
            warn!("Failed to register {}, tearing it down: {}", instance.name, e);
            if let Err(cleanup) = launcher.destroy(&mut instance).await {
                warn!("Failed to clean up unregistered cluster {} ({}): {}", instance.name, instance.id, cleanup);
            }
            return Err(e);
        }
        info!("Registered cluster {} ({})", instance.name, instance.id);
        Ok(instance)
    }

    /// Current state of a cluster, refreshed from the launcher.
    ///
    /// A cluster found to be gone (e.g. deleted in the Atlas UI) is removed
    /// from the registry.
    pub async fn status(&self, target: &str) -> Result<ClusterInstance> {
        let mut instance = self.registry.get(target).await?;
        let launcher = self.launcher_for(&instance.spec)?;
        launcher.refresh(&mut instance).await?;
        if instance.status == ClusterStatus::Destroyed {
            self.registry.remove(&instance.id).await?;
            info!("Cluster {} no longer exists, removed it from the registry", instance.name);
        } else {
            self.registry.update(&instance).await?;
        }
        Ok(instance)
    }

    pub async fn start(&self, target: &str) -> Result<ClusterInstance> {
        let mut instance = self.registry.get(target).await?;
        let launcher = self.launcher_for(&instance.spec)?;
        let result = launcher.start(&mut instance).await;
        self.registry.update(&instance).await?;
        result.map(|()| instance)
    }

    pub async fn stop(&self, target: &str) -> Result<ClusterInstance> {
        let mut instance = self.registry.get(target).await?;
        let launcher = self.launcher_for(&instance.spec)?;
        let result = launcher.stop(&mut instance).await;
        self.registry.update(&instance).await?;
        result.map(|()| instance)
    }

    /// Destroy a cluster and forget it.
    pub async fn destroy(&self, target: &str) -> Result<ClusterInstance> {
        let mut instance = self.registry.get(target).await?;
        let launcher = self.launcher_for(&instance.spec)?;
        if let Err(e) = launcher.destroy(&mut instance).await {
            instance.set_status(ClusterStatus::Error);
            if let Err(update) = self.registry.update(&instance).await {
                warn!("Failed to record error state for {}: {}", instance.name, update);
            }
            return Err(e);
        }

        self.registry.remove(&instance.id).await?;
        info!("Removed cluster {} from the registry", instance.name);
        Ok(instance)
    }

    /// Every registered cluster as last recorded.
    pub async fn list(&self) -> Result<Vec<ClusterInstance>> {
        self.registry.list().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{AtlasClusterSpec, LocalClusterSpec};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;

    /// Launcher that only flips statuses.
    #[derive(Default)]
    struct FakeLauncher {
        fail_launch: AtomicBool,
        gone: AtomicBool,
        /// Registers a cluster with the same name mid-launch, like a
        /// concurrent `launch` that finished first.
        rival: Option<ClusterRegistry>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl FakeLauncher {
        fn record(&self, call: &str) {
            self.calls.lock().unwrap().push(call.to_string());
        }
    }

    #[async_trait]
    impl ClusterLauncher for FakeLauncher {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn supports(&self, spec: &ClusterSpec) -> bool {
            matches!(spec, ClusterSpec::Local(_))
        }

        async fn launch(&self, spec: &ClusterSpec) -> Result<ClusterInstance> {
            self.record("launch");
            if self.fail_launch.load(Ordering::SeqCst) {
                anyhow::bail!("boom");
            }
            if let Some(registry) = &self.rival {
                registry.insert(ClusterInstance::new("local-rival-1", spec.clone())).await?;
            }
            let mut instance = ClusterInstance::new(ClusterInstance::generate_id("local", spec.name()), spec.clone());
            instance.connection_string = Some("mongodb://localhost:27017".to_string());
            instance.set_status(ClusterStatus::Ready);
            Ok(instance)
        }

        async fn start(&self, instance: &mut ClusterInstance) -> Result<()> {
            self.record("start");
            instance.set_status(ClusterStatus::Ready);
            Ok(())
        }

        async fn stop(&self, instance: &mut ClusterInstance) -> Result<()> {
            self.record("stop");
            instance.set_status(ClusterStatus::Stopped);
            Ok(())
        }

        async fn destroy(&self, instance: &mut ClusterInstance) -> Result<()> {
            self.record("destroy");
            instance.set_status(ClusterStatus::Destroyed);
            Ok(())
        }

        async fn status(&self, _instance: &ClusterInstance) -> Result<ClusterStatus> {
            if self.gone.load(Ordering::SeqCst) {
                return Ok(ClusterStatus::Destroyed);
            }
            Ok(ClusterStatus::Stopped)
        }
    }

    fn manager(temp: &TempDir, launcher: FakeLauncher) -> ClusterManager {
        ClusterManager::new(ClusterRegistry::new(temp.path())).with_launcher(Box::new(launcher))
    }

    fn local(name: &str) -> ClusterSpec {
        ClusterSpec::Local(LocalClusterSpec::new(name, "7.0"))
    }

    #[tokio::test]
    async fn test_launch_records_cluster() {
        let temp = TempDir::new().unwrap();
        let manager = manager(&temp, FakeLauncher::default());

        let instance = manager.launch(&local("dev")).await.unwrap();

        assert_eq!(instance.status, ClusterStatus::Ready);
        let listed = manager.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, instance.id);
    }

    #[tokio::test]
    async fn test_launch_rejects_duplicate_name() {
        let temp = TempDir::new().unwrap();
        let manager = manager(&temp, FakeLauncher::default());
        manager.launch(&local("dev")).await.unwrap();

        let err = manager.launch(&local("dev")).await.unwrap_err();
        assert!(matches!(err.downcast::<LauncherError>().unwrap(), LauncherError::ClusterAlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_launch_validates_before_launching() {
        let temp = TempDir::new().unwrap();
        let manager = manager(&temp, FakeLauncher::default());

        let err = manager.launch(&local("")).await.unwrap_err();
        assert!(matches!(err.downcast::<LauncherError>().unwrap(), LauncherError::MissingOption { .. }));
        assert!(manager.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_launch_is_not_recorded() {
        let temp = TempDir::new().unwrap();
        let launcher = FakeLauncher::default();
        launcher.fail_launch.store(true, Ordering::SeqCst);
        let manager = manager(&temp, launcher);

        assert!(manager.launch(&local("dev")).await.is_err());
        assert!(manager.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_launch_losing_name_race_is_torn_down() {
        let temp = TempDir::new().unwrap();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let launcher = FakeLauncher {
            rival: Some(ClusterRegistry::new(temp.path())),
            calls: Arc::clone(&calls),
            ..FakeLauncher::default()
        };
        let manager = manager(&temp, launcher);

        let err = manager.launch(&local("dev")).await.unwrap_err();

        assert!(matches!(err.downcast::<LauncherError>().unwrap(), LauncherError::ClusterAlreadyExists { .. }));
        assert_eq!(*calls.lock().unwrap(), ["launch", "destroy"]);
        let listed = manager.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "local-rival-1");
    }

    #[tokio::test]
    async fn test_status_forgets_vanished_cluster() {
        let temp = TempDir::new().unwrap();
        let launcher = FakeLauncher::default();
        launcher.gone.store(true, Ordering::SeqCst);
        let manager = manager(&temp, launcher);
        manager.launch(&local("dev")).await.unwrap();

        let instance = manager.status("dev").await.unwrap();

        assert_eq!(instance.status, ClusterStatus::Destroyed);
        assert!(manager.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_launcher_for_type() {
        let temp = TempDir::new().unwrap();
        let manager = manager(&temp, FakeLauncher::default());

        let err = manager.launch(&ClusterSpec::Atlas(AtlasClusterSpec::new("prod", "7.0"))).await.unwrap_err();
        match err.downcast::<LauncherError>().unwrap() {
            LauncherError::NoLauncher {
                cluster_type,
            } => assert_eq!(cluster_type, "atlas"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_lifecycle_by_name_and_id() {
        let temp = TempDir::new().unwrap();
        let manager = manager(&temp, FakeLauncher::default());
        let launched = manager.launch(&local("dev")).await.unwrap();

        let stopped = manager.stop("dev").await.unwrap();
        assert_eq!(stopped.status, ClusterStatus::Stopped);
        assert_eq!(manager.registry().get("dev").await.unwrap().status, ClusterStatus::Stopped);

        let started = manager.start(&launched.id).await.unwrap();
        assert_eq!(started.status, ClusterStatus::Ready);

        // the fake always observes Stopped
        let status = manager.status("dev").await.unwrap();
        assert_eq!(status.status, ClusterStatus::Stopped);

        let destroyed = manager.destroy("dev").await.unwrap();
        assert_eq!(destroyed.status, ClusterStatus::Destroyed);
        assert!(manager.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_target() {
        let temp = TempDir::new().unwrap();
        let manager = manager(&temp, FakeLauncher::default());

        for result in [manager.status("ghost").await, manager.stop("ghost").await, manager.destroy("ghost").await] {
            let err = result.unwrap_err();
            assert!(matches!(err.downcast::<LauncherError>().unwrap(), LauncherError::ClusterNotFound { .. }));
        }
    }
}

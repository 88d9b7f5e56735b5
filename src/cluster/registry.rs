//! Persistent registry of managed clusters.
//!
//! Every cluster the launcher creates is recorded in `clusters.json` in the
//! configuration directory so later invocations (`status`, `stop`, `list`,
//! ...) can find it by id or name. Each read-modify-write holds an exclusive
//! `fs4` lock on `clusters.json.lock`, so two launcher processes never lose
//! each other's updates.

use crate::cluster::instance::ClusterInstance;
use crate::constants::REGISTRY_FILE_NAME;
use crate::core::LauncherError;
use crate::utils::fs::atomic_write;
use anyhow::{Context, Result};
use fs4::fs_std::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    clusters: Vec<ClusterInstance>,
}

/// Exclusive lock on the registry, released on drop.
struct RegistryLock {
    file: File,
    path: PathBuf,
}

impl RegistryLock {
    async fn acquire(registry_path: &Path) -> Result<Self> {
        let lock_path = registry_path.with_extension("json.lock");
        if let Some(parent) = lock_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let path = lock_path.clone();
        let file = tokio::task::spawn_blocking(move || -> Result<File> {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(false)
                .open(&path)
                .with_context(|| format!("Failed to open lock file: {}", path.display()))?;

            file.lock_exclusive().context("Failed to lock the cluster registry")?;
            Ok(file)
        })
        .await
        .context("Failed to spawn blocking task for lock acquisition")??;

        Ok(Self {
            file,
            path: lock_path,
        })
    }
}

impl Drop for RegistryLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!("Failed to unlock {}: {}", self.path.display(), e);
        }
    }
}

/// The `clusters.json` registry.
#[derive(Debug, Clone)]
pub struct ClusterRegistry {
    path: PathBuf,
}

impl ClusterRegistry {
    /// Registry stored in `config_dir`.
    #[must_use]
    pub fn new(config_dir: &Path) -> Self {
        Self {
            path: config_dir.join(REGISTRY_FILE_NAME),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<RegistryFile> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(RegistryFile::default()),
            Ok(content) => serde_json::from_str(&content)
                .with_context(|| format!("Cluster registry is corrupt: {}", self.path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(RegistryFile::default()),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", self.path.display())),
        }
    }

    fn write(&self, registry: &RegistryFile) -> Result<()> {
        let json = serde_json::to_string_pretty(registry).context("Failed to serialize cluster registry")?;
        atomic_write(&self.path, json.as_bytes())
    }

    /// Apply `f` to the registered clusters under the registry lock and
    /// persist the result if `f` succeeds.
    async fn modify<T>(&self, f: impl FnOnce(&mut Vec<ClusterInstance>) -> Result<T>) -> Result<T> {
        let _lock = RegistryLock::acquire(&self.path).await?;
        let mut registry = self.read()?;
        let result = f(&mut registry.clusters)?;
        self.write(&registry)?;
        Ok(result)
    }

    /// All registered clusters, oldest first.
    pub async fn list(&self) -> Result<Vec<ClusterInstance>> {
        let _lock = RegistryLock::acquire(&self.path).await?;
        Ok(self.read()?.clusters)
    }

    /// Find a cluster by id, then by name.
    pub async fn find(&self, target: &str) -> Result<Option<ClusterInstance>> {
        let clusters = self.list().await?;
        let found = clusters
            .iter()
            .position(|c| c.id == target)
            .or_else(|| clusters.iter().position(|c| c.name == target))
            .map(|i| clusters[i].clone());
        Ok(found)
    }

    /// Like [`find`](Self::find) but a missing cluster is an error.
    pub async fn get(&self, target: &str) -> Result<ClusterInstance> {
        self.find(target).await?.ok_or_else(|| {
            LauncherError::ClusterNotFound {
                target: target.to_string(),
            }
            .into()
        })
    }

    /// Fail if a cluster named `name` is already registered.
    pub async fn ensure_name_available(&self, name: &str) -> Result<()> {
        if self.list().await?.iter().any(|c| c.name == name) {
            return Err(LauncherError::ClusterAlreadyExists {
                name: name.to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Register a new cluster. Names are unique.
    pub async fn insert(&self, instance: ClusterInstance) -> Result<()> {
        self.modify(|clusters| {
            if clusters.iter().any(|c| c.name == instance.name) {
                return Err(LauncherError::ClusterAlreadyExists {
                    name: instance.name.clone(),
                }
                .into());
            }
            debug!("Registering cluster {} ({})", instance.name, instance.id);
            clusters.push(instance);
            Ok(())
        })
        .await
    }

    /// Replace the stored record with the same id.
    pub async fn update(&self, instance: &ClusterInstance) -> Result<()> {
        self.modify(|clusters| {
            let slot = clusters.iter_mut().find(|c| c.id == instance.id).ok_or_else(|| {
                LauncherError::ClusterNotFound {
                    target: instance.id.clone(),
                }
            })?;
            *slot = instance.clone();
            Ok(())
        })
        .await
    }

    /// Remove a cluster by id. Returns whether it was registered.
    pub async fn remove(&self, id: &str) -> Result<bool> {
        self.modify(|clusters| {
            let before = clusters.len();
            clusters.retain(|c| c.id != id);
            Ok(clusters.len() != before)
        })
        .await
    }
}

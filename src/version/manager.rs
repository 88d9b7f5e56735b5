//! Installed MongoDB versions.
//!
//! Versions live in an [`m`](https://github.com/aheckmann/m)-compatible
//! layout so binaries installed by either tool are shared:
//!
//! ```text
//! <prefix>/
//! ├── bin/
//! └── versions/
//!     ├── 7.0.6/bin/mongod
//!     └── 8.0.1/bin/mongod
//! ```
//!
//! The primary versions directory is `$M_PREFIX/versions` when `M_PREFIX` is
//! set. Otherwise the well-known `m` locations are scanned and the writable
//! one holding the most versions wins, then the read-only one holding the
//! most, then `~/.local/m/versions`. Lookups always search every known
//! location so system-wide installs stay visible.

use crate::constants::{M_PREFIX_ENV, MONGODB_DOWNLOAD_BASE, MONGODB_RELEASES_URL};
use crate::core::LauncherError;
use crate::utils::fs::{is_dir_writable, make_files_executable, remove_dir_all};
use crate::utils::platform::get_home_dir;
use crate::utils::progress::ProgressBar;
use crate::version::platform::{Platform, detect_linux_distro};
use crate::version::verification::ChecksumVerifier;
use crate::version::{MongoVersion, archive};
use anyhow::{Context, Result};
use futures::StreamExt;
use serde::Deserialize;
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// One entry of the release/tag listing.
#[derive(Debug, Deserialize)]
struct ReleaseTag {
    tag_name: Option<String>,
    name: Option<String>,
}

/// A scanned versions location, as shown by `version info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionLocation {
    pub path: PathBuf,
    pub exists: bool,
    pub writable: bool,
    pub version_count: usize,
}

/// Finds, installs and removes MongoDB server versions.
#[derive(Debug, Clone)]
pub struct MongoVersionManager {
    versions_dir: PathBuf,
    search_dirs: Vec<PathBuf>,
    fallback_dir: Option<PathBuf>,
    releases_url: String,
    download_base: String,
    platform: Platform,
    distro: Option<String>,
    client: reqwest::Client,
}

/// The well-known `m` versions directories.
#[must_use]
pub fn default_search_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(home) = dirs::home_dir() {
        dirs.push(home.join(".local").join("m").join("versions"));
    }
    dirs.push(PathBuf::from("/usr/local/m/versions"));
    dirs.push(PathBuf::from("/opt/m/versions"));
    dirs
}

fn count_versions(dir: &Path) -> usize {
    scan_versions(dir).len()
}

fn scan_versions(dir: &Path) -> Vec<(MongoVersion, PathBuf)> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    entries
        .flatten()
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| {
            let name = entry.file_name();
            let version = MongoVersion::parse(name.to_str()?).ok()?;
            Some((version, entry.path()))
        })
        .collect()
}

/// Choose the primary versions directory.
///
/// `m_prefix` wins outright. Otherwise the writable candidate with the most
/// versions is chosen, then any candidate with versions, then `fallback`.
#[must_use]
pub fn resolve_versions_dir(m_prefix: Option<&Path>, candidates: &[PathBuf], fallback: &Path) -> PathBuf {
    if let Some(prefix) = m_prefix {
        return prefix.join("versions");
    }

    let mut best_writable: Option<(&PathBuf, usize)> = None;
    let mut best_any: Option<(&PathBuf, usize)> = None;

    for candidate in candidates {
        let count = count_versions(candidate);
        if count == 0 {
            continue;
        }
        if is_dir_writable(candidate) && best_writable.is_none_or(|(_, best)| count > best) {
            best_writable = Some((candidate, count));
        }
        if best_any.is_none_or(|(_, best)| count > best) {
            best_any = Some((candidate, count));
        }
    }

    best_writable
        .or(best_any)
        .map_or_else(|| fallback.to_path_buf(), |(dir, _)| dir.clone())
}

impl MongoVersionManager {
    /// Manager for the current user, honouring `M_PREFIX`.
    pub fn new() -> Result<Self> {
        let home = get_home_dir()?;
        let fallback = home.join(".local").join("m").join("versions");
        let prefix = std::env::var_os(M_PREFIX_ENV).filter(|p| !p.is_empty()).map(PathBuf::from);
        let candidates = default_search_dirs();

        let versions_dir = resolve_versions_dir(prefix.as_deref(), &candidates, &fallback);
        let mut manager = Self::with_versions_dir(versions_dir);
        let mut seen = HashSet::new();
        manager.search_dirs.extend(candidates);
        manager.search_dirs.retain(|dir| seen.insert(dir.clone()));
        manager.fallback_dir = Some(fallback);
        manager.distro = detect_linux_distro();
        manager.ensure_layout();
        Ok(manager)
    }

    /// Manager that only looks at `versions_dir`.
    #[must_use]
    pub fn with_versions_dir(versions_dir: PathBuf) -> Self {
        Self {
            search_dirs: vec![versions_dir.clone()],
            versions_dir,
            fallback_dir: None,
            releases_url: MONGODB_RELEASES_URL.to_string(),
            download_base: MONGODB_DOWNLOAD_BASE.to_string(),
            platform: Platform::current(),
            distro: None,
            client: reqwest::Client::new(),
        }
    }

    /// Override the release listing URL.
    #[must_use]
    pub fn with_releases_url(mut self, url: impl Into<String>) -> Self {
        self.releases_url = url.into();
        self
    }

    /// Override the archive download base URL.
    #[must_use]
    pub fn with_download_base(mut self, base: impl Into<String>) -> Self {
        self.download_base = base.into();
        self
    }

    #[must_use]
    pub fn with_platform(mut self, platform: Platform, distro: Option<String>) -> Self {
        self.platform = platform;
        self.distro = distro;
        self
    }

    /// Create `versions/` and the sibling `bin/`. Failure only means the
    /// manager runs read-only.
    fn ensure_layout(&self) {
        let mut dirs = vec![self.versions_dir.clone()];
        if let Some(parent) = self.versions_dir.parent() {
            dirs.push(parent.join("bin"));
        }
        for dir in dirs {
            if let Err(e) = std::fs::create_dir_all(&dir) {
                warn!("Cannot create {} ({}), running in read-only mode", dir.display(), e);
            }
        }
    }

    /// The primary versions directory.
    #[must_use]
    pub fn versions_dir(&self) -> &Path {
        &self.versions_dir
    }

    #[must_use]
    pub const fn platform(&self) -> Platform {
        self.platform
    }

    /// Every installed version across all known locations, newest first.
    #[must_use]
    pub fn installed_versions(&self) -> Vec<MongoVersion> {
        let versions: BTreeSet<MongoVersion> = self
            .search_dirs
            .iter()
            .flat_map(|dir| scan_versions(dir))
            .map(|(version, _)| version)
            .collect();
        versions.into_iter().rev().collect()
    }

    fn find_version_dir(&self, version: &MongoVersion) -> Option<PathBuf> {
        for dir in &self.search_dirs {
            let exact = dir.join(version.version());
            if exact.is_dir() {
                return Some(exact);
            }
        }
        // `7.0` and `7.0.0` name the same release
        self.search_dirs
            .iter()
            .flat_map(|dir| scan_versions(dir))
            .find(|(candidate, _)| candidate == version)
            .map(|(_, path)| path)
    }

    #[must_use]
    pub fn is_installed(&self, version: &MongoVersion) -> bool {
        self.find_version_dir(version).is_some()
    }

    /// Directory of `version`, or where it would be installed.
    #[must_use]
    pub fn version_dir(&self, version: &MongoVersion) -> PathBuf {
        self.find_version_dir(version).unwrap_or_else(|| self.versions_dir.join(version.version()))
    }

    /// Path of a server binary such as `mongod` or `mongos`.
    #[must_use]
    pub fn binary_path(&self, version: &MongoVersion, name: &str) -> PathBuf {
        self.version_dir(version).join("bin").join(self.platform.executable_name(name))
    }

    #[must_use]
    pub fn mongod_path(&self, version: &MongoVersion) -> PathBuf {
        self.binary_path(version, "mongod")
    }

    /// Versions published upstream, newest first.
    pub async fn available_versions(&self) -> Result<Vec<MongoVersion>> {
        info!("Fetching available MongoDB versions from {}", self.releases_url);
        let failed = |reason: String| LauncherError::DownloadFailed {
            url: self.releases_url.clone(),
            reason,
        };

        let response = self
            .client
            .get(&self.releases_url)
            .header(reqwest::header::USER_AGENT, concat!("mongo-launcher/", env!("CARGO_PKG_VERSION")))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(failed(format!("HTTP {}", response.status())).into());
        }

        let tags: Vec<ReleaseTag> = response.json().await.map_err(|e| failed(e.to_string()))?;

        let versions: BTreeSet<MongoVersion> = tags
            .into_iter()
            .filter_map(|tag| tag.tag_name.or(tag.name))
            .filter_map(|name| {
                let name = name.strip_prefix('r').unwrap_or(&name);
                MongoVersion::parse(name).ok()
            })
            .collect();

        debug!("Found {} available versions", versions.len());
        Ok(versions.into_iter().rev().collect())
    }

    /// Resolve a version pattern (`7.0.6`, `7.0`, `7` or `latest`).
    ///
    /// Installed versions are preferred; otherwise the newest matching
    /// release is used, falling back to pre-releases when no release matches.
    pub async fn find_version(&self, pattern: &str) -> Result<MongoVersion> {
        let pattern = pattern.trim();
        let not_found = || LauncherError::VersionNotFound {
            pattern: pattern.to_string(),
        };

        if pattern.eq_ignore_ascii_case("latest") {
            let available = self.available_versions().await?;
            return available.into_iter().find(|v| !v.is_pre_release()).ok_or_else(|| not_found().into());
        }

        if let Some(found) = self.installed_versions().into_iter().find(|v| v.matches(pattern)) {
            debug!("Pattern {} matched installed version {}", pattern, found);
            return Ok(found);
        }

        let available = self.available_versions().await?;
        let matching: Vec<MongoVersion> = available.into_iter().filter(|v| v.matches(pattern)).collect();
        matching
            .iter()
            .find(|v| !v.is_pre_release())
            .or_else(|| matching.first())
            .cloned()
            .ok_or_else(|| not_found().into())
    }

    /// Newest release (not pre-release) of a `major.minor` series.
    pub async fn latest_version(&self, major_minor: &str) -> Result<MongoVersion> {
        self.available_versions()
            .await?
            .into_iter()
            .find(|v| v.major_minor() == major_minor && !v.is_pre_release())
            .ok_or_else(|| {
                LauncherError::VersionNotFound {
                    pattern: major_minor.to_string(),
                }
                .into()
            })
    }

    fn install_root(&self) -> Result<PathBuf> {
        let primary_parent_writable = self.versions_dir.parent().is_some_and(is_dir_writable);
        if primary_parent_writable || is_dir_writable(&self.versions_dir) {
            return Ok(self.versions_dir.clone());
        }

        let fallback = match &self.fallback_dir {
            Some(dir) => dir.clone(),
            None => get_home_dir()?.join(".local").join("m").join("versions"),
        };
        std::fs::create_dir_all(&fallback)
            .with_context(|| format!("Failed to create {}", fallback.display()))?;
        Ok(fallback)
    }

    /// Download and install `version`. Returns its directory.
    ///
    /// Installing an already installed version is a no-op.
    pub async fn install(&self, version: &MongoVersion) -> Result<PathBuf> {
        if let Some(dir) = self.find_version_dir(version) {
            info!("Version {} is already installed", version);
            return Ok(dir);
        }

        let root = self.install_root()?;
        std::fs::create_dir_all(&root).with_context(|| format!("Failed to create {}", root.display()))?;
        let url = self.platform.download_url(&self.download_base, version, self.distro.as_deref())?;
        info!("Installing MongoDB {} from {} into {}", version, url, root.display());

        let staging = tempfile::Builder::new()
            .prefix(&format!(".install-{}-", version.version()))
            .tempdir_in(&root)
            .with_context(|| format!("Failed to create staging directory in {}", root.display()))?;
        let archive_path =
            staging.path().join(format!("{}.{}", version.version(), self.platform.archive_extension()));

        self.download(&url, &archive_path, version).await?;
        ChecksumVerifier::verify_from_release(&self.client, &archive_path, &url).await?;

        let extracted = staging.path().join("extracted");
        let (archive_clone, extracted_clone) = (archive_path.clone(), extracted.clone());
        tokio::task::spawn_blocking(move || archive::extract(&archive_clone, &extracted_clone))
            .await
            .context("Extraction task panicked")??;

        make_files_executable(&extracted.join("bin"))?;

        let target = root.join(version.version());
        tokio::fs::rename(&extracted, &target)
            .await
            .with_context(|| format!("Failed to move installation into {}", target.display()))?;

        info!("Successfully installed MongoDB version {}", version);
        Ok(target)
    }

    async fn download(&self, url: &str, dest: &Path, version: &MongoVersion) -> Result<()> {
        let failed = |reason: String| LauncherError::DownloadFailed {
            url: url.to_string(),
            reason,
        };

        let response = self.client.get(url).send().await.map_err(|e| failed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(failed(format!("HTTP {}", response.status())).into());
        }

        let progress = ProgressBar::download(version, response.content_length().unwrap_or(0));

        let mut file = tokio::fs::File::create(dest)
            .await
            .with_context(|| format!("Failed to create {}", dest.display()))?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| failed(e.to_string()))?;
            file.write_all(&chunk).await?;
            progress.inc(chunk.len() as u64);
        }
        file.flush().await?;
        progress.finish_and_clear();

        Ok(())
    }

    /// Delete an installed version.
    pub fn remove(&self, version: &MongoVersion) -> Result<PathBuf> {
        let dir = self.find_version_dir(version).ok_or_else(|| LauncherError::VersionNotInstalled {
            version: version.to_string(),
        })?;
        remove_dir_all(&dir)?;
        info!("Removed MongoDB version {}", version);
        Ok(dir)
    }

    /// Every scanned location with whether it exists and how many versions it
    /// holds.
    #[must_use]
    pub fn locations_report(&self) -> Vec<VersionLocation> {
        self.search_dirs
            .iter()
            .map(|dir| VersionLocation {
                path: dir.clone(),
                exists: dir.is_dir(),
                writable: is_dir_writable(dir),
                version_count: count_versions(dir),
            })
            .collect()
    }
}

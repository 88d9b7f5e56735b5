//! Extraction of MongoDB server archives.
//!
//! Server archives wrap everything in a single top-level directory
//! (`mongodb-linux-x86_64-ubuntu2204-7.0.6/bin/mongod`). Both extractors drop
//! that first path component so the result lands directly in the version
//! directory (`<versions>/7.0.6/bin/mongod`), the layout `m` uses.
//!
//! These functions do blocking IO; call them from `spawn_blocking`.

use crate::core::LauncherError;
use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Remove the first component of an archive entry path.
///
/// Returns `None` for the top-level directory itself and for paths that
/// could escape the destination (absolute paths or `..`).
fn strip_top_level(path: &Path) -> Option<PathBuf> {
    let mut components = path.components();
    match components.next()? {
        Component::Normal(_) => {}
        _ => return None,
    }

    let mut stripped = PathBuf::new();
    for component in components {
        match component {
            Component::Normal(part) => stripped.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    (!stripped.as_os_str().is_empty()).then_some(stripped)
}

/// Extract an archive into `dest`, choosing the format from the file name.
pub fn extract(archive: &Path, dest: &Path) -> Result<()> {
    let name = archive.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    if name.ends_with(".zip") {
        extract_zip(archive, dest)
    } else if name.ends_with(".tgz") || name.ends_with(".tar.gz") {
        extract_tgz(archive, dest)
    } else {
        Err(LauncherError::ExtractionFailed {
            archive: name.to_string(),
            reason: "unsupported archive format".to_string(),
        }
        .into())
    }
}

/// Extract a gzipped tarball, stripping the top-level directory.
pub fn extract_tgz(archive: &Path, dest: &Path) -> Result<()> {
    let file =
        File::open(archive).with_context(|| format!("Failed to open archive: {}", archive.display()))?;
    let mut tar = tar::Archive::new(GzDecoder::new(file));
    let failed = |reason: String| LauncherError::ExtractionFailed {
        archive: archive.display().to_string(),
        reason,
    };

    fs::create_dir_all(dest)
        .with_context(|| format!("Failed to create directory: {}", dest.display()))?;

    let mut count = 0usize;
    for entry in tar.entries().map_err(|e| failed(e.to_string()))? {
        let mut entry = entry.map_err(|e| failed(e.to_string()))?;
        let path = entry.path().map_err(|e| failed(e.to_string()))?.into_owned();
        let Some(relative) = strip_top_level(&path) else {
            continue;
        };

        let target = dest.join(&relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        entry
            .unpack(&target)
            .map_err(|e| failed(format!("{}: {e}", relative.display())))?;
        count += 1;
    }

    debug!("Extracted {} entries from {} into {}", count, archive.display(), dest.display());
    Ok(())
}

/// Extract a zip archive, stripping the top-level directory.
pub fn extract_zip(archive: &Path, dest: &Path) -> Result<()> {
    let file =
        File::open(archive).with_context(|| format!("Failed to open archive: {}", archive.display()))?;
    let failed = |reason: String| LauncherError::ExtractionFailed {
        archive: archive.display().to_string(),
        reason,
    };
    let mut zip = zip::ZipArchive::new(file).map_err(|e| failed(e.to_string()))?;

    fs::create_dir_all(dest)
        .with_context(|| format!("Failed to create directory: {}", dest.display()))?;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(|e| failed(e.to_string()))?;
        let Some(relative) = entry.enclosed_name().as_deref().and_then(strip_top_level) else {
            continue;
        };

        let target = dest.join(&relative);
        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)
            .with_context(|| format!("Failed to create file: {}", target.display()))?;
        io::copy(&mut entry, &mut out).map_err(|e| failed(format!("{}: {e}", relative.display())))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&target, fs::Permissions::from_mode(mode))?;
        }
    }

    debug!("Extracted {} entries from {} into {}", zip.len(), archive.display(), dest.display());
    Ok(())
}

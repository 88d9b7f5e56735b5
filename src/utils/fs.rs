//! File system helpers.
//!
//! Writes that other processes may observe (the configuration file, the
//! cluster registry, replica set key files) go through [`atomic_write`], which
//! writes a sibling temp file and renames it over the target so readers never
//! see a half-written file.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Create a directory and all of its parents if it does not exist.
///
/// # Errors
///
/// Fails when the directory cannot be created or the path exists but is not
/// a directory.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path).with_context(|| {
            format!(
                "Failed to create directory: {}\n\nCheck directory permissions and path validity",
                path.display()
            )
        })?;
    } else if !path.is_dir() {
        return Err(anyhow::anyhow!("Path exists but is not a directory: {}", path.display()));
    }
    Ok(())
}

/// Write bytes atomically using a temp file and rename.
///
/// Parent directories are created as needed.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    atomic_write_with_mode(path, content, None)
}

/// Write bytes atomically and, on Unix, apply `mode` to the file before it
/// becomes visible under its final name.
///
/// `mode` is ignored on other platforms.
pub fn atomic_write_with_mode(path: &Path, content: &[u8], mode: Option<u32>) -> Result<()> {
    use std::io::Write;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        ensure_dir(parent)?;
    }

    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("file");
    let temp_path = path.with_file_name(format!(".{file_name}.tmp"));

    {
        let mut file = fs::File::create(&temp_path)
            .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

        file.write_all(content)
            .with_context(|| format!("Failed to write to temp file: {}", temp_path.display()))?;

        file.sync_all().context("Failed to sync file to disk")?;
    }

    #[cfg(unix)]
    if let Some(mode) = mode {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&temp_path, fs::Permissions::from_mode(mode))
            .with_context(|| format!("Failed to set permissions on {}", temp_path.display()))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename temp file to: {}", path.display()))?;

    Ok(())
}

/// Remove a directory tree; a missing directory is not an error.
pub fn remove_dir_all(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("Failed to remove directory: {}", path.display()))?;
    }
    Ok(())
}

/// Whether new entries can be created inside `dir`.
///
/// Probes by creating and removing a temp file, which is the only check that
/// works the same for permissions, ACLs and read-only mounts.
#[must_use]
pub fn is_dir_writable(dir: &Path) -> bool {
    if !dir.is_dir() {
        return false;
    }
    tempfile::Builder::new().prefix(".write-test").tempfile_in(dir).is_ok()
}

/// Mark every regular file directly inside `dir` as executable (Unix only).
pub fn make_files_executable(dir: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        if !dir.is_dir() {
            return Ok(());
        }
        for entry in fs::read_dir(dir)
            .with_context(|| format!("Failed to read directory: {}", dir.display()))?
        {
            let path = entry?.path();
            if path.is_file() {
                let mut perms = fs::metadata(&path)?.permissions();
                perms.set_mode(perms.mode() | 0o755);
                fs::set_permissions(&path, perms)
                    .with_context(|| format!("Failed to make {} executable", path.display()))?;
            }
        }
    }
    #[cfg(not(unix))]
    let _ = dir;

    Ok(())
}

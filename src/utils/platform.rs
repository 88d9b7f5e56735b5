//! Platform helpers: home directory lookup and user path expansion.

use anyhow::Result;
use std::path::PathBuf;

/// Whether the launcher was built for Windows.
#[must_use]
pub const fn is_windows() -> bool {
    cfg!(windows)
}

/// Whether the launcher was built for macOS.
#[must_use]
pub const fn is_macos() -> bool {
    cfg!(target_os = "macos")
}

/// The current user's home directory.
///
/// # Errors
///
/// Returns an error with a platform hint when the home directory cannot be
/// determined.
pub fn get_home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| {
        let platform_help = if is_windows() {
            "On Windows: Check that the USERPROFILE environment variable is set"
        } else {
            "On Unix/Linux: Check that the HOME environment variable is set"
        };
        anyhow::anyhow!("Could not determine home directory.\n\n{platform_help}")
    })
}

/// Expand a user-supplied path.
///
/// A leading `~` becomes the home directory and `$VAR`/`${VAR}` references are
/// replaced from the environment.
///
/// # Examples
///
/// ```rust,no_run
/// use mongo_launcher::utils::platform::resolve_path;
///
/// let data = resolve_path("~/.mongo-launcher/data")?;
/// assert!(data.is_absolute());
/// # Ok::<(), anyhow::Error>(())
/// ```
///
/// # Errors
///
/// Fails when the home directory is unknown or a referenced variable is unset.
pub fn resolve_path(path: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full_with_context(
        path,
        || dirs::home_dir().map(|h| h.to_string_lossy().into_owned()),
        |var| std::env::var(var).map(Some),
    )
    .map_err(|e| anyhow::anyhow!("Invalid path '{path}': {e}"))?;

    Ok(PathBuf::from(expanded.as_ref()))
}

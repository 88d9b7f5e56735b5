//! Cross-platform utilities and helpers
//!
//! This module provides utility functions for file operations, platform-specific
//! code, retry timing and user interface elements like progress bars.
//!
//! # Modules
//!
//! - [`fs`] - File system operations with atomic writes
//! - [`platform`] - Home directory lookup and path expansion
//! - [`progress`] - Progress bars and spinners for downloads and launches
//! - [`backoff`] - Exponential backoff for polling loops
//!
//! # Example
//!
//! ```rust,no_run
//! use mongo_launcher::utils::{atomic_write, ensure_dir, spinner_with_message};
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! ensure_dir(Path::new("data/dev"))?;
//! atomic_write(Path::new("data/dev/keyfile"), b"secret")?;
//!
//! let progress = spinner_with_message("Starting mongod...");
//! progress.finish_and_clear();
//! # Ok(())
//! # }
//! ```

pub mod backoff;
pub mod fs;
pub mod platform;
pub mod progress;

pub use fs::{atomic_write, ensure_dir, remove_dir_all};
pub use platform::{get_home_dir, is_windows, resolve_path};
pub use progress::{ProgressBar, spinner_with_message};

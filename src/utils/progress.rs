//! Progress output for MongoDB downloads and cluster operations.
//!
//! Two shapes are used: a byte-counting bar while an archive downloads and a
//! spinner while processes start, stop or Atlas provisions. Both render on
//! stderr through `indicatif` and are hidden when [`disable`] was called
//! (`--no-progress`), when `MONGO_LAUNCHER_NO_PROGRESS` is set, or when
//! stderr is not a terminal.
//!
//! ```rust
//! use mongo_launcher::utils::progress::spinner_with_message;
//!
//! let spinner = spinner_with_message("Waiting for mongod on port 27017");
//! spinner.finish_and_clear();
//! ```

use crate::constants::NO_PROGRESS_ENV;
use indicatif::ProgressStyle;
use std::io::IsTerminal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

static PROGRESS_DISABLED: AtomicBool = AtomicBool::new(false);

const SPINNER_TICK: Duration = Duration::from_millis(100);

/// Turn off progress output for the rest of the process.
pub fn disable() {
    PROGRESS_DISABLED.store(true, Ordering::Relaxed);
}

fn hidden() -> bool {
    PROGRESS_DISABLED.load(Ordering::Relaxed)
        || std::env::var_os(NO_PROGRESS_ENV).is_some()
        || !std::io::stderr().is_terminal()
}

/// A progress indicator; clones share the same bar.
#[derive(Clone)]
pub struct ProgressBar {
    inner: indicatif::ProgressBar,
}

impl ProgressBar {
    /// A bar counting downloaded bytes of `version`. A `total` of 0 means the
    /// server sent no content length.
    #[must_use]
    pub fn download(version: impl std::fmt::Display, total: u64) -> Self {
        if hidden() {
            return Self::hidden();
        }
        let bar = indicatif::ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("━╸━"),
        );
        bar.set_prefix(format!("MongoDB {version}"));
        Self {
            inner: bar,
        }
    }

    /// A ticking spinner for work of unknown length.
    #[must_use]
    pub fn spinner() -> Self {
        if hidden() {
            return Self::hidden();
        }
        let bar = indicatif::ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✓"]),
        );
        bar.enable_steady_tick(SPINNER_TICK);
        Self {
            inner: bar,
        }
    }

    fn hidden() -> Self {
        Self {
            inner: indicatif::ProgressBar::hidden(),
        }
    }

    pub fn set_message(&self, msg: impl Into<String>) {
        self.inner.set_message(msg.into());
    }

    pub fn inc(&self, delta: u64) {
        self.inner.inc(delta);
    }

    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }

    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.inner.is_hidden()
    }
}

/// Spinner showing `msg`.
#[must_use]
pub fn spinner_with_message(msg: impl Into<String>) -> ProgressBar {
    let spinner = ProgressBar::spinner();
    spinner.set_message(msg);
    spinner
}

//! Test utilities for mongo-launcher
//!
//! Available to unit tests and, through the `test-utils` feature, to the
//! integration suite.
//!
//! # Example
//!
//! ```rust,no_run
//! use mongo_launcher::test_utils::{fake_version_install, init_test_logging};
//! use tempfile::TempDir;
//!
//! init_test_logging(None);
//! let versions = TempDir::new().unwrap();
//! let dir = fake_version_install(versions.path(), "7.0.14");
//! assert!(dir.join("bin").is_dir());
//! ```

use std::path::{Path, PathBuf};
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests, once per process.
///
/// Uses `level` when given, otherwise `RUST_LOG`; with neither, tests run
/// without a subscriber.
///
/// ```bash
/// RUST_LOG=mongo_launcher=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

/// Lay out `versions_dir/<version>/bin/{mongod,mongos}` the way an install
/// does, with placeholder binaries. Returns the version directory.
///
/// # Panics
///
/// Panics if the files cannot be written.
pub fn fake_version_install(versions_dir: &Path, version: &str) -> PathBuf {
    let dir = versions_dir.join(version);
    let bin = dir.join("bin");
    std::fs::create_dir_all(&bin).expect("create fake bin directory");
    for name in ["mongod", "mongos"] {
        let file = if cfg!(windows) { format!("{name}.exe") } else { name.to_string() };
        std::fs::write(bin.join(file), "#!/bin/sh\nexit 0\n").expect("write fake binary");
    }
    dir
}

/// Start a long-running stand-in for a server: an executable script named
/// `mongod` in `dir`, run as `mongod --port <port>`. Returns the script path
/// and the child, which the caller must kill and reap.
///
/// # Panics
///
/// Panics if the script cannot be written or started.
#[cfg(unix)]
pub fn spawn_fake_server(dir: &Path, port: u16) -> (PathBuf, std::process::Child) {
    use std::os::unix::fs::PermissionsExt;

    let binary = dir.join("mongod");
    std::fs::write(&binary, "#!/bin/sh\nwhile :; do sleep 1; done\n").expect("write fake server");
    std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).expect("chmod fake server");

    // exec fails briefly if another test thread forked while the script
    // was still open for writing
    let mut attempts = 0;
    let child = loop {
        match std::process::Command::new(&binary).args(["--port", &port.to_string()]).spawn() {
            Ok(child) => break child,
            Err(e) if e.kind() == std::io::ErrorKind::ExecutableFileBusy && attempts < 20 => {
                attempts += 1;
                std::thread::sleep(std::time::Duration::from_millis(50));
            }
            Err(e) => panic!("start fake server: {e}"),
        }
    };
    (binary, child)
}

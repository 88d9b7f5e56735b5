//! Shared harness for the mongo-launcher integration tests.
//!
//! Every [`TestEnv`] gets its own configuration directory, home directory
//! and `M_PREFIX`, so tests never see the developer's real clusters,
//! settings or MongoDB installations under `~`.

// not every helper is used by every test module
#![allow(dead_code)]

use assert_cmd::Command;
use mongo_launcher::test_utils::fake_version_install;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Captured result of one CLI invocation.
#[derive(Debug)]
pub struct RunOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// An isolated environment for running the `mongo-launcher` binary.
pub struct TestEnv {
    temp: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("create temp dir");
        for dir in ["config", "home", "m"] {
            std::fs::create_dir_all(temp.path().join(dir)).expect("create test dir");
        }
        Self {
            temp,
        }
    }

    pub fn config_dir(&self) -> PathBuf {
        self.temp.path().join("config")
    }

    pub fn home(&self) -> PathBuf {
        self.temp.path().join("home")
    }

    /// Versions directory selected through `M_PREFIX`.
    pub fn versions_dir(&self) -> PathBuf {
        self.temp.path().join("m").join("versions")
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// A command with the isolated environment applied and empty stdin.
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("mongo-launcher").expect("binary built");
        cmd.env("MONGO_LAUNCHER_CONFIG_DIR", self.config_dir())
            .env("M_PREFIX", self.temp.path().join("m"))
            .env("HOME", self.home())
            .env("USERPROFILE", self.home())
            .env("XDG_CONFIG_HOME", self.home().join(".config"))
            .env("MONGO_LAUNCHER_NO_PROGRESS", "1")
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG")
            .env_remove("MONGODB_ATLAS_CLIENT_ID")
            .env_remove("MONGODB_ATLAS_CLIENT_SECRET")
            .write_stdin("");
        cmd
    }

    pub fn run(&self, args: &[&str]) -> RunOutput {
        self.run_with_stdin(args, "")
    }

    pub fn run_with_stdin(&self, args: &[&str], stdin: &str) -> RunOutput {
        let output = self.command().args(args).write_stdin(stdin).output().expect("run mongo-launcher");
        RunOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }

    /// Write `config.json` directly.
    pub fn write_config(&self, json: &serde_json::Value) {
        std::fs::write(self.config_dir().join("config.json"), serde_json::to_string_pretty(json).unwrap())
            .expect("write config.json");
    }

    /// Write `clusters.json` directly.
    pub fn write_registry(&self, clusters: &serde_json::Value) {
        let registry = serde_json::json!({ "clusters": clusters });
        std::fs::write(self.config_dir().join("clusters.json"), serde_json::to_string_pretty(&registry).unwrap())
            .expect("write clusters.json");
    }

    pub fn read_registry(&self) -> serde_json::Value {
        let text = std::fs::read_to_string(self.config_dir().join("clusters.json")).expect("read clusters.json");
        serde_json::from_str(&text).expect("valid clusters.json")
    }

    /// Pretend `version` is installed.
    pub fn install_fake_version(&self, version: &str) -> PathBuf {
        fake_version_install(&self.versions_dir(), version)
    }
}

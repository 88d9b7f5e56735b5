//! Command-line interface for mongo-launcher.
//!
//! Each subcommand lives in its own module and exposes an `execute` method.
//! [`Cli`] parses the global flags, turns them into a [`CliConfig`] and
//! dispatches.
//!
//! # Commands
//!
//! | Command | Purpose |
//! |---------|---------|
//! | `launch` | Create a local or Atlas cluster |
//! | `status` | Show (and refresh) a cluster's state |
//! | `start` / `stop` | Start or stop a cluster without losing data |
//! | `destroy` | Tear a cluster down and delete its data |
//! | `list` | List managed clusters |
//! | `version` | Manage installed MongoDB versions |
//! | `config` | Inspect and change user configuration |
//!
//! # Global Options
//!
//! - `-v/--verbose`: debug logging (conflicts with `--quiet`)
//! - `-q/--quiet`: errors only
//! - `--no-progress`: hide spinners and progress bars
//! - `--config-dir <DIR>`: configuration and registry directory, also read
//!   from `MONGO_LAUNCHER_CONFIG_DIR`
//!
//! `RUST_LOG`, when set, overrides the verbosity flags.

mod cluster;
mod config;
mod launch;
mod list;
mod prompt;
mod version;

pub use prompt::Prompt;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::cluster::ClusterRegistry;
use crate::config::{ConfigManager, UserConfig};
use crate::launcher::{AtlasClusterLauncher, ClusterManager, LocalClusterLauncher};
use crate::utils::progress;
use crate::version::MongoVersionManager;

/// Runtime settings derived from the global flags.
///
/// Kept separate from [`Cli`] so tests can build one without parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    /// `tracing` filter directive used when `RUST_LOG` is not set.
    pub log_filter: String,
    /// Hide progress indicators.
    pub no_progress: bool,
    /// Configuration directory override.
    pub config_dir: Option<PathBuf>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            log_filter: "warn".to_string(),
            no_progress: false,
            config_dir: None,
        }
    }
}

impl CliConfig {
    /// Install the global `tracing` subscriber (stderr) and apply
    /// `no_progress`. Calling it twice leaves the first subscriber in place.
    pub fn apply(&self) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.log_filter));
        let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false).try_init();

        if self.no_progress {
            progress::disable();
        }
    }
}

/// Shared state handed to every command: the loaded configuration plus
/// factories for the registry and the launchers.
pub struct CliContext {
    config: ConfigManager,
}

impl CliContext {
    /// Load configuration from `config_dir`, or the platform default.
    pub fn open(config_dir: Option<PathBuf>) -> Result<Self> {
        let dir = match config_dir {
            Some(dir) => dir,
            None => ConfigManager::default_config_dir()?,
        };
        Ok(Self {
            config: ConfigManager::open(dir),
        })
    }

    #[must_use]
    pub fn config(&self) -> &UserConfig {
        self.config.config()
    }

    pub fn config_manager_mut(&mut self) -> &mut ConfigManager {
        &mut self.config
    }

    /// The cluster registry, stored next to the configuration file.
    #[must_use]
    pub fn registry(&self) -> ClusterRegistry {
        ClusterRegistry::new(self.config.config_dir())
    }

    pub fn version_manager(&self) -> Result<MongoVersionManager> {
        MongoVersionManager::new()
    }

    /// A manager with the local and Atlas launchers configured from the
    /// user configuration. `wait` makes Atlas launches block until ready.
    pub fn cluster_manager(&self, wait: bool) -> Result<ClusterManager> {
        let config = self.config();
        let local = LocalClusterLauncher::new(self.version_manager()?, config.data_path()?, config.log_path()?);
        let atlas = AtlasClusterLauncher::new(
            &config.atlas_base_url,
            config.atlas_credentials(),
            config.default_atlas_project_id.clone(),
        )
        .with_wait(wait);

        Ok(ClusterManager::new(self.registry()).with_launcher(Box::new(local)).with_launcher(Box::new(atlas)))
    }
}

/// Root command.
#[derive(Parser, Debug)]
#[command(
    name = "mongo-launcher",
    about = "MongoDB Cluster Management Tool",
    version,
    long_about = "MongoDB Cluster Management Tool\n\n\
                  Launches and manages local MongoDB clusters (standalone, replica set, sharded) \
                  and MongoDB Atlas clusters, and manages locally installed MongoDB versions."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable progress bars and spinners
    #[arg(long, global = true)]
    no_progress: bool,

    /// Configuration directory (holds config.json and clusters.json)
    #[arg(long, global = true, env = "MONGO_LAUNCHER_CONFIG_DIR", value_name = "DIR")]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Launch a new MongoDB cluster
    ///
    /// Without options an interactive session asks for the cluster details.
    Launch(launch::LaunchCommand),

    /// Show the status of a cluster
    Status(cluster::StatusCommand),

    /// Start a stopped cluster
    Start(cluster::StartCommand),

    /// Stop a running cluster
    Stop(cluster::StopCommand),

    /// Destroy a cluster and delete its data
    Destroy(cluster::DestroyCommand),

    /// List managed clusters
    List(list::ListCommand),

    /// Manage MongoDB versions
    Version(version::VersionCommand),

    /// Manage configuration
    Config(config::ConfigCommand),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    /// Translate the global flags into a [`CliConfig`].
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_filter = if self.verbose {
            "mongo_launcher=debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        };

        CliConfig {
            log_filter: log_filter.to_string(),
            no_progress: self.no_progress,
            config_dir: self.config_dir.clone(),
        }
    }

    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        config.apply();
        let mut ctx = CliContext::open(config.config_dir)?;

        match self.command {
            Commands::Launch(cmd) => cmd.execute(&ctx).await,
            Commands::Status(cmd) => cmd.execute(&ctx).await,
            Commands::Start(cmd) => cmd.execute(&ctx).await,
            Commands::Stop(cmd) => cmd.execute(&ctx).await,
            Commands::Destroy(cmd) => cmd.execute(&ctx).await,
            Commands::List(cmd) => cmd.execute(&ctx).await,
            Commands::Version(cmd) => cmd.execute().await,
            Commands::Config(cmd) => cmd.execute(ctx.config_manager_mut()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::TempDir;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_long_help_starts_with_tool_name() {
        let help = Cli::command().render_long_help().to_string();
        assert!(help.starts_with("MongoDB Cluster Management Tool"), "{help}");
        for command in ["launch", "destroy", "version", "config"] {
            assert!(help.contains(command));
        }
    }

    #[test]
    fn test_build_config_log_levels() {
        let cli = Cli::parse_from(["mongo-launcher", "list"]);
        assert_eq!(cli.build_config().log_filter, "warn");

        let cli = Cli::parse_from(["mongo-launcher", "-v", "list"]);
        assert_eq!(cli.build_config().log_filter, "mongo_launcher=debug");

        let cli = Cli::parse_from(["mongo-launcher", "list", "--quiet", "--no-progress"]);
        let config = cli.build_config();
        assert_eq!(config.log_filter, "error");
        assert!(config.no_progress);
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["mongo-launcher", "-v", "-q", "list"]).is_err());
    }

    #[test]
    fn test_config_dir_flag() {
        let cli = Cli::parse_from(["mongo-launcher", "--config-dir", "/tmp/ml", "list"]);
        assert_eq!(cli.build_config().config_dir, Some(PathBuf::from("/tmp/ml")));
    }

    #[test]
    fn test_launch_arguments() {
        let cli = Cli::try_parse_from([
            "mongo-launcher",
            "launch",
            "-t",
            "atlas",
            "-n",
            "prod",
            "--project-id",
            "p1",
            "--topology",
            "sharded",
            "--shard-count",
            "3",
            "--wait",
            "--non-interactive",
        ]);
        assert!(cli.is_ok());

        assert!(Cli::try_parse_from(["mongo-launcher", "launch", "-t", "cloud"]).is_err());
        assert!(Cli::try_parse_from(["mongo-launcher", "launch", "--port", "70000"]).is_err());
    }

    #[test]
    fn test_context_registry_lives_in_config_dir() {
        let temp = TempDir::new().unwrap();
        let ctx = CliContext::open(Some(temp.path().to_path_buf())).unwrap();
        assert_eq!(ctx.registry().path(), temp.path().join("clusters.json"));
        assert_eq!(ctx.config(), &UserConfig::default());
    }
}

//! mongo-launcher - MongoDB Cluster Management Tool
//!
//! Launches and manages MongoDB clusters on the local machine (standalone,
//! replica set or sharded) and in MongoDB Atlas, and manages the MongoDB
//! server versions used for local clusters.
//!
//! # Architecture Overview
//!
//! - A [`cluster::ClusterSpec`] describes what to launch. It comes from
//!   command-line options, an interactive session, or a JSON file.
//! - A [`launcher::ClusterLauncher`] turns a spec into a running
//!   [`cluster::ClusterInstance`]: [`launcher::LocalClusterLauncher`] starts
//!   `mongod`/`mongos` processes, [`launcher::AtlasClusterLauncher`] talks to
//!   the Atlas Administration API.
//! - [`launcher::ClusterManager`] picks the launcher for a spec and records
//!   every instance in the [`cluster::ClusterRegistry`] (`clusters.json`).
//! - [`version::MongoVersionManager`] finds, downloads and verifies MongoDB
//!   server builds, sharing the `m` version manager's directory layout.
//! - [`config::ConfigManager`] loads user defaults from `config.json`.
//!
//! # Core Modules
//!
//! - [`cli`] - Command-line interface
//! - [`cluster`] - Specs, instances and the registry
//! - [`config`] - User configuration
//! - [`core`] - Error types and friendly error output
//! - [`launcher`] - Local and Atlas launchers and the cluster manager
//! - [`version`] - MongoDB version model, download and installation
//! - [`utils`] - File system, platform, backoff and progress helpers
//!
//! # Example
//!
//! ```rust,no_run
//! use mongo_launcher::cluster::{ClusterRegistry, ClusterSpec, LocalClusterSpec, LocalTopology};
//! use mongo_launcher::launcher::{ClusterManager, LocalClusterLauncher};
//! use mongo_launcher::version::MongoVersionManager;
//! use std::path::Path;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config_dir = Path::new("/tmp/mongo-launcher");
//! let local = LocalClusterLauncher::new(
//!     MongoVersionManager::new()?,
//!     config_dir.join("data"),
//!     config_dir.join("logs"),
//! );
//! let manager = ClusterManager::new(ClusterRegistry::new(config_dir)).with_launcher(Box::new(local));
//!
//! let mut spec = LocalClusterSpec::new("dev", "7.0");
//! spec.topology = LocalTopology::ReplicaSet;
//! let instance = manager.launch(&ClusterSpec::Local(spec)).await?;
//! println!("{}", instance.connection_string.unwrap_or_default());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod cluster;
pub mod config;
pub mod constants;
pub mod core;
pub mod launcher;
pub mod utils;
pub mod version;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

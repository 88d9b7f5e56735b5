//! Launch a new local or Atlas cluster.
//!
//! The cluster is described by a JSON spec file, by command-line options, or
//! interactively. Interactive mode is on unless `interactiveMode` is `false`
//! in the configuration or `--non-interactive` is passed; it only asks for
//! what the options did not already provide.
//!
//! # Examples
//!
//! ```bash
//! # interactive
//! mongo-launcher launch
//!
//! # scripted
//! mongo-launcher launch --non-interactive -n dev --topology replica-set
//! mongo-launcher launch --non-interactive -t atlas -n prod --project-id 5f1a --instance-size M10 --wait
//!
//! # from a file
//! mongo-launcher launch cluster.json
//! ```

use anyhow::Result;
use clap::{Args, ValueEnum};
use colored::Colorize;
use std::fmt::Write as _;
use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::cli::CliContext;
use crate::cli::prompt::Prompt;
use crate::cluster::{
    AtlasClusterSpec, AtlasTopology, ClusterInstance, ClusterSpec, ClusterType, LocalClusterSpec, LocalTopology,
};
use crate::config::UserConfig;
use crate::constants::{
    ATLAS_INSTANCE_SIZES, DEFAULT_PORT, DEFAULT_REPLICA_SET_SIZE, DEFAULT_SHARD_COUNT, MAX_LISTED_VERSIONS,
    MAX_REPLICA_SET_SIZE, MIN_REPLICA_SET_SIZE,
};
use crate::core::LauncherError;
use crate::version::MongoVersion;

const DEFAULT_CLUSTER_NAME: &str = "test-cluster";

/// Command to launch a cluster.
#[derive(Args, Debug, Default)]
pub struct LaunchCommand {
    /// Cluster specification file (JSON); overrides all other options
    #[arg(value_name = "SPEC_FILE")]
    spec_file: Option<PathBuf>,

    /// Cluster type
    #[arg(short = 't', long = "type", value_enum)]
    cluster_type: Option<ClusterType>,

    /// Cluster name
    #[arg(short, long)]
    name: Option<String>,

    /// MongoDB version (e.g. 7.0, 7.0.14)
    #[arg(long)]
    mongo_version: Option<String>,

    /// Base port for local clusters
    #[arg(short, long)]
    port: Option<u16>,

    /// Cluster topology
    #[arg(long, value_enum)]
    topology: Option<LocalTopology>,

    /// Members per replica set (implies --topology replica-set)
    #[arg(long)]
    replica_set_size: Option<u32>,

    /// Number of shards (implies --topology sharded)
    #[arg(long)]
    shard_count: Option<u32>,

    /// Atlas project id
    #[arg(long)]
    project_id: Option<String>,

    /// Atlas instance size (M0..M50)
    #[arg(long)]
    instance_size: Option<String>,

    /// Atlas region (e.g. US_EAST_1)
    #[arg(long)]
    region: Option<String>,

    /// Atlas cloud provider (AWS, GCP, AZURE)
    #[arg(long)]
    cloud_provider: Option<String>,

    /// Wait for an Atlas cluster to become ready
    #[arg(long)]
    wait: bool,

    /// Never prompt; fail when a required option is missing
    #[arg(long)]
    non_interactive: bool,
}

impl LaunchCommand {
    pub async fn execute(self, ctx: &CliContext) -> Result<()> {
        let spec = if let Some(file) = &self.spec_file {
            ClusterSpec::from_file(file)?
        } else {
            let interactive = ctx.config().interactive_mode && !self.non_interactive;
            let installed = if interactive { ctx.version_manager()?.installed_versions() } else { Vec::new() };
            let mut prompt = Prompt::stdio();
            match self.build_spec(ctx.config(), &installed, interactive, &mut prompt)? {
                Some(spec) => spec,
                None => return Ok(()),
            }
        };

        println!("Launching {} cluster '{}'...", spec.cluster_type(), spec.name());
        let manager = ctx.cluster_manager(self.wait)?;
        let instance = manager.launch(&spec).await?;
        print!("{}", render_launched(&instance));
        Ok(())
    }

    /// Turn options, configuration defaults and (when interactive) answers
    /// into a spec. `None` means the user cancelled.
    fn build_spec<R: BufRead, W: Write>(
        &self,
        config: &UserConfig,
        installed: &[MongoVersion],
        interactive: bool,
        prompt: &mut Prompt<R, W>,
    ) -> Result<Option<ClusterSpec>> {
        if interactive && (self.name.is_none() || self.cluster_type.is_none()) {
            welcome(prompt)?;
        }

        let cluster_type = match self.cluster_type {
            Some(cluster_type) => cluster_type,
            None if interactive => prompt.choice("Cluster type:", &["local", "atlas"], "local")?.parse()?,
            None => ClusterType::Local,
        };

        let name = match &self.name {
            Some(name) => name.clone(),
            None if interactive => prompt
                .input("Cluster name", Some(DEFAULT_CLUSTER_NAME))?
                .unwrap_or_else(|| DEFAULT_CLUSTER_NAME.to_string()),
            None => {
                return Err(LauncherError::MissingOption {
                    option: "Cluster name".to_string(),
                    hint: "Use --name option or enable interactive mode.".to_string(),
                }
                .into());
            }
        };

        let version = match &self.mongo_version {
            Some(version) => version.clone(),
            None if interactive => prompt_version(prompt, installed, &config.default_mongo_version)?,
            None => config.default_mongo_version.clone(),
        };

        let spec = match cluster_type {
            ClusterType::Local => ClusterSpec::Local(self.local_spec(config, name, version, interactive, prompt)?),
            ClusterType::Atlas => ClusterSpec::Atlas(self.atlas_spec(config, name, version, interactive, prompt)?),
        };

        if interactive {
            prompt.say("")?;
            prompt.say(render_summary(&spec))?;
            if !prompt.confirm("Proceed with cluster creation?", true)? {
                prompt.say("Cluster creation cancelled.")?;
                return Ok(None);
            }
        }
        Ok(Some(spec))
    }

    fn local_spec<R: BufRead, W: Write>(
        &self,
        config: &UserConfig,
        name: String,
        version: String,
        interactive: bool,
        prompt: &mut Prompt<R, W>,
    ) -> Result<LocalClusterSpec> {
        let mut spec = LocalClusterSpec::new(name, version);

        spec.port = match self.port {
            Some(port) => port,
            None if interactive => prompt.number("Port", DEFAULT_PORT)?,
            None => DEFAULT_PORT,
        };

        spec.topology = match self.implied_topology() {
            Some(topology) => topology,
            None if interactive => {
                let choice = prompt.choice("Topology:", &["standalone", "replica-set", "sharded"], "standalone")?;
                LocalTopology::from_str(&choice, true).map_err(anyhow::Error::msg)?
            }
            None => LocalTopology::Standalone,
        };

        if spec.topology != LocalTopology::Standalone {
            spec.replica_set_size = match self.replica_set_size {
                Some(size) => size,
                None if interactive => prompt
                    .number("Replica set size", DEFAULT_REPLICA_SET_SIZE)?
                    .clamp(MIN_REPLICA_SET_SIZE, MAX_REPLICA_SET_SIZE),
                None => DEFAULT_REPLICA_SET_SIZE,
            };
        }
        if spec.topology == LocalTopology::Sharded {
            spec.shard_count = match self.shard_count {
                Some(count) => count,
                None if interactive => prompt.number("Shard count", DEFAULT_SHARD_COUNT)?.max(1),
                None => DEFAULT_SHARD_COUNT,
            };
        }

        if interactive && prompt.confirm("Use custom data/log paths?", false)? {
            spec.data_path = prompt.input("Data path", Some(&config.default_data_path))?;
            spec.log_path = prompt.input("Log path", Some(&config.default_log_path))?;
        }
        Ok(spec)
    }

    fn atlas_spec<R: BufRead, W: Write>(
        &self,
        config: &UserConfig,
        name: String,
        version: String,
        interactive: bool,
        prompt: &mut Prompt<R, W>,
    ) -> Result<AtlasClusterSpec> {
        let mut spec = AtlasClusterSpec::new(name, version);

        spec.project_id = match self.project_id.clone().or_else(|| config.default_atlas_project_id.clone()) {
            Some(project) => Some(project),
            None if interactive => prompt.input("Atlas Project ID", None)?,
            None => None,
        };
        if spec.project_id.is_none() {
            return Err(LauncherError::MissingOption {
                option: "Atlas project ID".to_string(),
                hint: "Use --project-id option or set defaultAtlasProjectId in config.".to_string(),
            }
            .into());
        }

        spec.instance_size = match &self.instance_size {
            Some(size) => size.to_uppercase(),
            None if interactive => prompt.choice("Instance size:", ATLAS_INSTANCE_SIZES, &config.default_instance_size)?,
            None => config.default_instance_size.clone(),
        };
        spec.region = self.region.as_deref().map_or_else(|| config.default_region.clone(), str::to_uppercase);
        spec.cloud_provider =
            self.cloud_provider.as_deref().map_or_else(|| config.default_cloud_provider.clone(), str::to_uppercase);

        spec.topology = match self.implied_topology() {
            Some(topology) => AtlasTopology::try_from(topology)?,
            None if interactive => match prompt.choice("Topology:", &["replica-set", "sharded"], "replica-set")?.as_str() {
                "sharded" => AtlasTopology::Sharded,
                _ => AtlasTopology::ReplicaSet,
            },
            None => AtlasTopology::ReplicaSet,
        };
        if spec.topology == AtlasTopology::Sharded {
            spec.shard_count = match self.shard_count {
                Some(count) => count,
                None if interactive => prompt.number("Shard count", DEFAULT_SHARD_COUNT)?.max(1),
                None => DEFAULT_SHARD_COUNT,
            };
        }
        Ok(spec)
    }

    /// `--topology`, or the topology implied by `--shard-count` or
    /// `--replica-set-size`.
    fn implied_topology(&self) -> Option<LocalTopology> {
        self.topology.or_else(|| {
            if self.shard_count.is_some() {
                Some(LocalTopology::Sharded)
            } else if self.replica_set_size.is_some() {
                Some(LocalTopology::ReplicaSet)
            } else {
                None
            }
        })
    }
}

fn welcome<R: BufRead, W: Write>(prompt: &mut Prompt<R, W>) -> Result<()> {
    let width = 40;
    prompt.say(format!("╔{}╗", "═".repeat(width)))?;
    prompt.say(format!("║{:^width$}║", "MongoLauncher Interactive"))?;
    prompt.say(format!("║{:^width$}║", "MongoDB Cluster Management Tool"))?;
    prompt.say(format!("╚{}╝", "═".repeat(width)))?;
    prompt.say("")?;
    prompt.say("Let's set up your MongoDB cluster...")?;
    prompt.say("")
}

/// Offer installed versions by number; free text is taken as a version.
fn prompt_version<R: BufRead, W: Write>(
    prompt: &mut Prompt<R, W>,
    installed: &[MongoVersion],
    default: &str,
) -> Result<String> {
    if installed.is_empty() {
        return Ok(prompt.input("MongoDB version", Some(default))?.unwrap_or_else(|| default.to_string()));
    }

    prompt.say("Installed MongoDB versions:")?;
    let shown = &installed[..installed.len().min(MAX_LISTED_VERSIONS)];
    for (i, version) in shown.iter().enumerate() {
        prompt.say(format!("  {}) {}", i + 1, version))?;
    }
    if installed.len() > shown.len() {
        prompt.say(format!("  ... and {} more", installed.len() - shown.len()))?;
    }

    let answer = prompt
        .input("MongoDB version (number or version)", Some(default))?
        .unwrap_or_else(|| default.to_string());
    match answer.parse::<usize>() {
        Ok(n) if (1..=shown.len()).contains(&n) => Ok(shown[n - 1].to_string()),
        _ => Ok(answer),
    }
}

fn render_summary(spec: &ClusterSpec) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", "Cluster Configuration Summary:".bold());
    let _ = writeln!(out, "  Type:     {}", spec.cluster_type());
    let _ = writeln!(out, "  Name:     {}", spec.name());
    let _ = writeln!(out, "  Version:  {}", spec.mongo_version());
    match spec {
        ClusterSpec::Local(local) => {
            let topology = match local.topology {
                LocalTopology::Standalone => "standalone".to_string(),
                LocalTopology::ReplicaSet => format!("replica-set ({} members)", local.replica_set_size),
                LocalTopology::Sharded => {
                    format!("sharded ({} shards x {} members)", local.shard_count, local.replica_set_size)
                }
            };
            let _ = writeln!(out, "  Topology: {topology}");
            let _ = writeln!(out, "  Port:     {}", local.port);
            if let Some(data) = &local.data_path {
                let _ = writeln!(out, "  Data:     {data}");
            }
            if let Some(logs) = &local.log_path {
                let _ = writeln!(out, "  Logs:     {logs}");
            }
        }
        ClusterSpec::Atlas(atlas) => {
            let topology = match atlas.topology {
                AtlasTopology::ReplicaSet => "replica-set".to_string(),
                AtlasTopology::Sharded => format!("sharded ({} shards)", atlas.shard_count),
            };
            let _ = writeln!(out, "  Topology: {topology}");
            let _ = writeln!(out, "  Project:  {}", atlas.project_id.as_deref().unwrap_or_default());
            let _ = writeln!(out, "  Size:     {}", atlas.instance_size);
            let _ = writeln!(out, "  Region:   {} ({})", atlas.region, atlas.cloud_provider);
        }
    }
    out
}

fn render_launched(instance: &ClusterInstance) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", "Cluster launched successfully!".green().bold());
    let _ = writeln!(out, "  ID:                {}", instance.id);
    let _ = writeln!(out, "  Name:              {}", instance.name);
    let _ = writeln!(out, "  Status:            {}", instance.status);
    let _ = writeln!(
        out,
        "  Connection String: {}",
        instance.connection_string.as_deref().unwrap_or("(pending)")
    );
    out
}

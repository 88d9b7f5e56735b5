//! Local clusters built from installed server binaries.
//!
//! Port layout for a cluster whose base port is `P`:
//!
//! | topology    | processes                                                    |
//! |-------------|--------------------------------------------------------------|
//! | standalone  | `mongod` on `P`                                              |
//! | replica-set | members on `P..P+n-1`, replica set named after the cluster   |
//! | sharded     | shard `i` member `j` on `P+i*n+j`, config server on `P+s*n`, |
//! |             | `mongos` on `P+1000`                                         |
//!
//! Data lives in `<dataPath>/<name>/<port>` and logs in
//! `<logPath>/<name>/mongod-<port>.log` (`mongos-<port>.log` for the router).

use crate::cluster::{ClusterInstance, ClusterSpec, ClusterStatus, LocalClusterSpec, LocalTopology, ManagedProcess, ProcessRole};
use crate::constants::{MONGOS_PORT_OFFSET, PROCESS_STOP_TIMEOUT};
use crate::core::LauncherError;
use crate::launcher::ClusterLauncher;
use crate::launcher::process::{
    ShellAuth, find_shell, is_server_running, port_in_use, run_shell_script, start_process, terminate_server,
};
use crate::utils::fs::{atomic_write_with_mode, ensure_dir, remove_dir_all};
use crate::utils::platform::resolve_path;
use crate::utils::progress::spinner_with_message;
use crate::version::{MongoVersion, MongoVersionManager};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::cmp::Reverse;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const DATA_DIR_KEY: &str = "dataDir";
const LOG_DIR_KEY: &str = "logDir";
const VERSION_KEY: &str = "mongoVersion";

/// One process the launcher will start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessPlan {
    pub role: ProcessRole,
    pub port: u16,
    pub replica_set: Option<String>,
    /// `None` for `mongos`, which keeps no data.
    pub db_path: Option<PathBuf>,
    pub log_path: PathBuf,
    pub args: Vec<String>,
}

/// A replica set to initiate once its members are up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaSetPlan {
    pub name: String,
    pub config_server: bool,
    pub ports: Vec<u16>,
}

/// Directories, processes and replica sets of a local cluster.
#[derive(Debug, Clone)]
pub struct ClusterLayout {
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub key_file: Option<PathBuf>,
    pub processes: Vec<ProcessPlan>,
    pub replica_sets: Vec<ReplicaSetPlan>,
}

fn role_label(role: ProcessRole) -> &'static str {
    match role {
        ProcessRole::Mongod => "mongod",
        ProcessRole::Shard => "shard member",
        ProcessRole::ConfigServer => "config server",
        ProcessRole::Mongos => "mongos",
    }
}

impl ClusterLayout {
    /// Lay out `spec` under `data_root`/`log_root`.
    pub fn plan(spec: &LocalClusterSpec, data_root: &Path, log_root: &Path) -> Result<Self, LauncherError> {
        let data_dir = data_root.join(&spec.name);
        let log_dir = log_root.join(&spec.name);
        let key_file = (spec.enable_auth && spec.topology != LocalTopology::Standalone).then(|| data_dir.join("keyfile"));

        let port_at = |offset: u32| {
            u16::try_from(u32::from(spec.port) + offset).map_err(|_| LauncherError::ConfigError {
                message: format!("Port {} leaves no room for the {} topology", spec.port, spec.topology),
            })
        };

        let mut layout = Self {
            data_dir,
            log_dir,
            key_file,
            processes: Vec::new(),
            replica_sets: Vec::new(),
        };

        match spec.topology {
            LocalTopology::Standalone => {
                layout.push_mongod(spec, ProcessRole::Mongod, spec.port, None);
            }
            LocalTopology::ReplicaSet => {
                let mut ports = Vec::new();
                for member in 0..spec.replica_set_size {
                    let port = port_at(member)?;
                    layout.push_mongod(spec, ProcessRole::Mongod, port, Some(&spec.name));
                    ports.push(port);
                }
                layout.replica_sets.push(ReplicaSetPlan {
                    name: spec.name.clone(),
                    config_server: false,
                    ports,
                });
            }
            LocalTopology::Sharded => {
                for shard in 0..spec.shard_count {
                    let name = format!("{}-shard{}", spec.name, shard);
                    let mut ports = Vec::new();
                    for member in 0..spec.replica_set_size {
                        let port = port_at(shard * spec.replica_set_size + member)?;
                        layout.push_mongod(spec, ProcessRole::Shard, port, Some(&name));
                        ports.push(port);
                    }
                    layout.replica_sets.push(ReplicaSetPlan {
                        name,
                        config_server: false,
                        ports,
                    });
                }

                let config_rs = format!("{}-configRS", spec.name);
                let config_port = port_at(spec.shard_count * spec.replica_set_size)?;
                layout.push_mongod(spec, ProcessRole::ConfigServer, config_port, Some(&config_rs));
                layout.replica_sets.push(ReplicaSetPlan {
                    name: config_rs.clone(),
                    config_server: true,
                    ports: vec![config_port],
                });

                let mongos_port = port_at(u32::from(MONGOS_PORT_OFFSET))?;
                let log_path = layout.log_dir.join(format!("mongos-{mongos_port}.log"));
                let mut args = vec![
                    "--port".to_string(),
                    mongos_port.to_string(),
                    "--configdb".to_string(),
                    format!("{config_rs}/localhost:{config_port}"),
                    "--logpath".to_string(),
                    log_path.display().to_string(),
                ];
                if let Some(key_file) = &layout.key_file {
                    args.extend(["--keyFile".to_string(), key_file.display().to_string()]);
                }
                layout.processes.push(ProcessPlan {
                    role: ProcessRole::Mongos,
                    port: mongos_port,
                    replica_set: None,
                    db_path: None,
                    log_path,
                    args,
                });
            }
        }

        Ok(layout)
    }

    fn push_mongod(&mut self, spec: &LocalClusterSpec, role: ProcessRole, port: u16, replica_set: Option<&str>) {
        let db_path = self.data_dir.join(port.to_string());
        let log_path = self.log_dir.join(format!("mongod-{port}.log"));

        let mut args = vec![
            "--port".to_string(),
            port.to_string(),
            "--dbpath".to_string(),
            db_path.display().to_string(),
            "--logpath".to_string(),
            log_path.display().to_string(),
        ];
        if spec.enable_auth {
            args.push("--auth".to_string());
        }
        if let Some(key_file) = &self.key_file {
            args.extend(["--keyFile".to_string(), key_file.display().to_string()]);
        }
        if let Some(name) = replica_set {
            args.extend(["--replSet".to_string(), name.to_string()]);
        }
        match role {
            ProcessRole::ConfigServer => args.push("--configsvr".to_string()),
            ProcessRole::Shard => args.push("--shardsvr".to_string()),
            ProcessRole::Mongod | ProcessRole::Mongos => {}
        }
        args.extend(spec.additional_options.iter().cloned());

        self.processes.push(ProcessPlan {
            role,
            port,
            replica_set: replica_set.map(str::to_string),
            db_path: Some(db_path),
            log_path,
            args,
        });
    }
}

/// Connection string clients use for a local cluster.
#[must_use]
pub fn connection_string(spec: &LocalClusterSpec) -> String {
    let base = u32::from(spec.port);
    match spec.topology {
        LocalTopology::Standalone => format!("mongodb://localhost:{base}"),
        LocalTopology::ReplicaSet => {
            let hosts: Vec<String> = (0..spec.replica_set_size).map(|i| format!("localhost:{}", base + i)).collect();
            format!("mongodb://{}/?replicaSet={}", hosts.join(","), spec.name)
        }
        LocalTopology::Sharded => format!("mongodb://localhost:{}", base + u32::from(MONGOS_PORT_OFFSET)),
    }
}

fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// `rs.initiate` for `rs`, then wait until the first member is primary.
///
/// The first member gets a higher priority so it is the one that wins the
/// election and later scripts can target it.
#[must_use]
pub fn initiate_script(rs: &ReplicaSetPlan) -> String {
    let members: Vec<String> = rs
        .ports
        .iter()
        .enumerate()
        .map(|(i, port)| {
            let priority = if i == 0 { 2 } else { 1 };
            format!("{{_id: {i}, host: 'localhost:{port}', priority: {priority}}}")
        })
        .collect();
    let config_server = if rs.config_server { "configsvr: true, " } else { "" };
    format!(
        "rs.initiate({{_id: {}, {config_server}members: [{}]}}); \
         while (!db.adminCommand({{isMaster: 1}}).ismaster) {{ sleep(200); }}",
        js_string(&rs.name),
        members.join(", ")
    )
}

/// Create a `root` user in `admin`.
#[must_use]
pub fn create_user_script(user: &str, password: &str) -> String {
    format!(
        "db.getSiblingDB('admin').createUser({{user: {}, pwd: {}, roles: [{{role: 'root', db: 'admin'}}]}})",
        js_string(user),
        js_string(password)
    )
}

/// Register every shard replica set with `mongos`.
#[must_use]
pub fn add_shards_script(layout: &ClusterLayout) -> String {
    layout
        .replica_sets
        .iter()
        .filter(|rs| !rs.config_server)
        .map(|rs| {
            let hosts: Vec<String> = rs.ports.iter().map(|p| format!("localhost:{p}")).collect();
            format!("sh.addShard({});", js_string(&format!("{}/{}", rs.name, hosts.join(","))))
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn write_key_file(path: &Path) -> Result<()> {
    let material = format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple());
    atomic_write_with_mode(path, material.as_bytes(), Some(0o600))
        .with_context(|| format!("Failed to write key file {}", path.display()))
}

/// Launcher for clusters on this machine.
pub struct LocalClusterLauncher {
    versions: MongoVersionManager,
    data_root: PathBuf,
    log_root: PathBuf,
}

impl LocalClusterLauncher {
    /// Launcher placing clusters under `data_root` and `log_root` unless a
    /// spec names its own paths.
    #[must_use]
    pub fn new(versions: MongoVersionManager, data_root: PathBuf, log_root: PathBuf) -> Self {
        Self {
            versions,
            data_root,
            log_root,
        }
    }

    fn roots(&self, spec: &LocalClusterSpec) -> Result<(PathBuf, PathBuf)> {
        let data_root = match &spec.data_path {
            Some(path) => resolve_path(path)?,
            None => self.data_root.clone(),
        };
        let log_root = match &spec.log_path {
            Some(path) => resolve_path(path)?,
            None => self.log_root.clone(),
        };
        Ok((data_root, log_root))
    }

    /// Resolve `pattern` to a concrete version and install it if needed.
    async fn ensure_version(&self, pattern: &str) -> Result<MongoVersion> {
        let version = self.versions.find_version(pattern).await?;
        if !self.versions.is_installed(&version) {
            info!("MongoDB {} not found locally, installing", version);
            self.versions.install(&version).await?;
        }
        Ok(version)
    }

    async fn check_preconditions(&self, spec: &LocalClusterSpec, layout: &ClusterLayout) -> Result<()> {
        if spec.topology == LocalTopology::Sharded && spec.enable_auth && spec.auth_user.is_none() {
            return Err(LauncherError::ConfigError {
                message: "Sharded clusters with authentication need authUser and authPassword".to_string(),
            }
            .into());
        }

        let leftover = std::fs::read_dir(&layout.data_dir).is_ok_and(|mut entries| entries.next().is_some());
        if leftover {
            return Err(LauncherError::LaunchFailed {
                name: spec.name.clone(),
                reason: format!(
                    "data directory {} already exists; remove it or choose another name",
                    layout.data_dir.display()
                ),
            }
            .into());
        }

        for plan in &layout.processes {
            if port_in_use(plan.port).await {
                return Err(LauncherError::LaunchFailed {
                    name: spec.name.clone(),
                    reason: format!("port {} is already in use", plan.port),
                }
                .into());
            }
        }
        Ok(())
    }

    async fn start_cluster(
        &self,
        spec: &LocalClusterSpec,
        layout: &ClusterLayout,
        version: &MongoVersion,
        instance: &mut ClusterInstance,
    ) -> Result<()> {
        let mongod = self.versions.mongod_path(version);
        let mongos = self.versions.binary_path(version, "mongos");

        ensure_dir(&layout.data_dir)?;
        ensure_dir(&layout.log_dir)?;
        if let Some(key_file) = &layout.key_file {
            write_key_file(key_file)?;
        }

        let progress = spinner_with_message(format!("Launching {}...", spec.name));

        for plan in layout.processes.iter().filter(|p| p.role != ProcessRole::Mongos) {
            if let Some(db_path) = &plan.db_path {
                ensure_dir(db_path)?;
            }
            progress.set_message(format!("Starting {} on port {}", role_label(plan.role), plan.port));
            let pid = start_process(&mongod, &plan.args, plan.port).await?;
            debug!("Started {} on port {} (pid {})", role_label(plan.role), plan.port, pid);
            instance.processes.push(managed(plan, pid, &mongod));
        }

        let needs_shell = !layout.replica_sets.is_empty() || spec.auth_user.is_some();
        let shell = if needs_shell { Some(find_shell(mongod.parent())?) } else { None };

        if let Some(shell) = &shell {
            for rs in &layout.replica_sets {
                progress.set_message(format!("Initiating replica set {}", rs.name));
                let primary = rs.ports.first().copied().ok_or_else(|| empty_layout(spec))?;
                run_shell_script(shell, primary, &initiate_script(rs), None).await?;
            }
        }

        let credentials = spec.auth_user.as_deref().zip(spec.auth_password.as_deref());

        if spec.topology == LocalTopology::Sharded {
            for plan in layout.processes.iter().filter(|p| p.role == ProcessRole::Mongos) {
                progress.set_message(format!("Starting mongos on port {}", plan.port));
                let pid = start_process(&mongos, &plan.args, plan.port).await?;
                instance.processes.push(managed(plan, pid, &mongos));

                if let Some(shell) = &shell {
                    let auth = match credentials {
                        Some((user, password)) => {
                            run_shell_script(shell, plan.port, &create_user_script(user, password), None).await?;
                            Some(ShellAuth {
                                user,
                                password,
                            })
                        }
                        None => None,
                    };
                    progress.set_message("Adding shards");
                    run_shell_script(shell, plan.port, &add_shards_script(layout), auth).await?;
                }
            }
        } else if let (Some(shell), Some((user, password))) = (&shell, credentials) {
            // the first process is the standalone or the preferred primary
            let port = layout.processes.first().ok_or_else(|| empty_layout(spec))?.port;
            progress.set_message("Creating root user");
            run_shell_script(shell, port, &create_user_script(user, password), None).await?;
        }

        progress.finish_and_clear();
        Ok(())
    }

    async fn terminate_all(processes: &[ManagedProcess]) {
        let mut ordered: Vec<&ManagedProcess> = processes.iter().collect();
        ordered.sort_by_key(|p| p.role.stop_order());
        for process in ordered {
            match terminate_server(process, PROCESS_STOP_TIMEOUT).await {
                Ok(true) => debug!("Stopped {} on port {}", role_label(process.role), process.port),
                Ok(false) => debug!("{} on port {} was not running", role_label(process.role), process.port),
                Err(e) => warn!("Failed to stop pid {}: {}", process.pid, e),
            }
        }
    }

    fn cluster_dirs(&self, instance: &ClusterInstance) -> Result<(PathBuf, PathBuf)> {
        if let (Some(data), Some(log)) = (instance.metadata_str(DATA_DIR_KEY), instance.metadata_str(LOG_DIR_KEY)) {
            return Ok((PathBuf::from(data), PathBuf::from(log)));
        }
        let ClusterSpec::Local(spec) = &instance.spec else {
            return Err(unsupported(&instance.spec));
        };
        let (data_root, log_root) = self.roots(spec)?;
        Ok((data_root.join(&spec.name), log_root.join(&spec.name)))
    }
}

fn managed(plan: &ProcessPlan, pid: u32, binary: &Path) -> ManagedProcess {
    ManagedProcess {
        pid,
        port: plan.port,
        role: plan.role,
        replica_set: plan.replica_set.clone(),
        binary: binary.to_path_buf(),
        args: plan.args.clone(),
        log_path: plan.log_path.clone(),
    }
}

fn empty_layout(spec: &LocalClusterSpec) -> LauncherError {
    LauncherError::LaunchFailed {
        name: spec.name.clone(),
        reason: "the cluster layout has no processes".to_string(),
    }
}

fn unsupported(spec: &ClusterSpec) -> anyhow::Error {
    LauncherError::NoLauncher {
        cluster_type: spec.cluster_type().to_string(),
    }
    .into()
}

#[async_trait]
impl ClusterLauncher for LocalClusterLauncher {
    fn name(&self) -> &'static str {
        "local"
    }

    fn supports(&self, spec: &ClusterSpec) -> bool {
        matches!(spec, ClusterSpec::Local(_))
    }

    async fn launch(&self, spec: &ClusterSpec) -> Result<ClusterInstance> {
        let ClusterSpec::Local(local) = spec else {
            return Err(unsupported(spec));
        };
        spec.validate()?;
        info!("Launching local cluster: {}", local.name);

        let (data_root, log_root) = self.roots(local)?;
        let layout = ClusterLayout::plan(local, &data_root, &log_root)?;
        self.check_preconditions(local, &layout).await?;

        let version = self.ensure_version(&local.mongo_version).await?;

        let mut instance = ClusterInstance::new(ClusterInstance::generate_id("local", &local.name), spec.clone());
        instance.metadata.insert(VERSION_KEY.to_string(), version.version().into());
        instance.metadata.insert(DATA_DIR_KEY.to_string(), layout.data_dir.display().to_string().into());
        instance.metadata.insert(LOG_DIR_KEY.to_string(), layout.log_dir.display().to_string().into());

        if let Err(e) = self.start_cluster(local, &layout, &version, &mut instance).await {
            warn!("Launch of {} failed, cleaning up: {}", local.name, e);
            Self::terminate_all(&instance.processes).await;
            instance.set_status(ClusterStatus::Error);
            if let Err(cleanup) = remove_dir_all(&layout.data_dir) {
                warn!("{}", cleanup);
            }
            return Err(e.context(format!("Failed to launch local cluster '{}'", local.name)));
        }

        instance.connection_string = Some(connection_string(local));
        instance.set_status(ClusterStatus::Ready);
        info!("Local cluster {} launched successfully", local.name);
        Ok(instance)
    }

    async fn start(&self, instance: &mut ClusterInstance) -> Result<()> {
        info!("Starting local cluster: {}", instance.name);
        instance.set_status(ClusterStatus::Starting);

        // config servers first, mongos last
        let mut order: Vec<usize> = (0..instance.processes.len()).collect();
        order.sort_by_key(|&i| Reverse(instance.processes[i].role.stop_order()));

        let progress = spinner_with_message(format!("Starting {}...", instance.name));
        let mut started = Vec::new();
        for i in order {
            let process = &instance.processes[i];
            if is_server_running(process) && port_in_use(process.port).await {
                debug!("{} on port {} is already running", role_label(process.role), process.port);
                continue;
            }
            if let Some(parent) = process.log_path.parent() {
                ensure_dir(parent)?;
            }

            progress.set_message(format!("Starting {} on port {}", role_label(process.role), process.port));
            match start_process(&process.binary, &process.args, process.port).await {
                Ok(pid) => {
                    instance.processes[i].pid = pid;
                    started.push(instance.processes[i].clone());
                }
                Err(e) => {
                    progress.finish_and_clear();
                    Self::terminate_all(&started).await;
                    instance.set_status(ClusterStatus::Error);
                    return Err(e.context(format!("Failed to start cluster '{}'", instance.name)));
                }
            }
        }
        progress.finish_and_clear();

        instance.set_status(ClusterStatus::Ready);
        Ok(())
    }

    async fn stop(&self, instance: &mut ClusterInstance) -> Result<()> {
        info!("Stopping local cluster: {}", instance.name);
        instance.set_status(ClusterStatus::Stopping);

        let progress = spinner_with_message(format!("Stopping {}...", instance.name));
        Self::terminate_all(&instance.processes).await;
        progress.finish_and_clear();

        instance.set_status(ClusterStatus::Stopped);
        Ok(())
    }

    async fn destroy(&self, instance: &mut ClusterInstance) -> Result<()> {
        info!("Destroying local cluster: {}", instance.name);
        self.stop(instance).await?;

        let (data_dir, log_dir) = self.cluster_dirs(instance)?;
        remove_dir_all(&data_dir)?;
        remove_dir_all(&log_dir)?;

        instance.set_status(ClusterStatus::Destroyed);
        Ok(())
    }

    async fn status(&self, instance: &ClusterInstance) -> Result<ClusterStatus> {
        if instance.status == ClusterStatus::Destroyed {
            return Ok(ClusterStatus::Destroyed);
        }
        if instance.processes.is_empty() {
            return Ok(ClusterStatus::Stopped);
        }

        let alive = instance.processes.iter().filter(|p| is_server_running(p)).count();
        let status = if alive == instance.processes.len() {
            ClusterStatus::Ready
        } else if alive == 0 {
            ClusterStatus::Stopped
        } else {
            ClusterStatus::Error
        };
        debug!("{}: {}/{} processes alive", instance.name, alive, instance.processes.len());
        Ok(status)
    }
}

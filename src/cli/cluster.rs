//! Lifecycle commands for registered clusters: `status`, `start`, `stop` and
//! `destroy`. Clusters are addressed by id or by name.

use anyhow::Result;
use clap::Args;
use colored::{ColoredString, Colorize};
use std::fmt::Write as _;
use std::io::{BufRead, Write};

use crate::cli::CliContext;
use crate::cli::prompt::Prompt;
use crate::cluster::{ClusterInstance, ClusterStatus};
use crate::launcher::ClusterManager;

/// Show the current state of a cluster.
#[derive(Args, Debug)]
pub struct StatusCommand {
    /// Cluster id or name
    target: String,
}

impl StatusCommand {
    pub async fn execute(self, ctx: &CliContext) -> Result<()> {
        let instance = ctx.cluster_manager(false)?.status(&self.target).await?;
        print!("{}", render_status(&instance));
        Ok(())
    }
}

/// Start a stopped cluster.
#[derive(Args, Debug)]
pub struct StartCommand {
    /// Cluster id or name
    target: String,
}

impl StartCommand {
    pub async fn execute(self, ctx: &CliContext) -> Result<()> {
        let manager = ctx.cluster_manager(false)?;
        // the launcher reports its own progress
        let instance = manager.start(&self.target).await?;
        println!("{} '{}' ({})", "Started cluster".green(), instance.name, status_label(instance.status));
        if let Some(uri) = &instance.connection_string {
            println!("  Connection String: {uri}");
        }
        Ok(())
    }
}

/// Stop a running cluster, keeping its data.
#[derive(Args, Debug)]
pub struct StopCommand {
    /// Cluster id or name
    target: String,
}

impl StopCommand {
    pub async fn execute(self, ctx: &CliContext) -> Result<()> {
        let manager = ctx.cluster_manager(false)?;
        let instance = manager.stop(&self.target).await?;
        println!("{} '{}'", "Stopped cluster".green(), instance.name);
        Ok(())
    }
}

/// Destroy a cluster and delete its data.
#[derive(Args, Debug)]
pub struct DestroyCommand {
    /// Cluster id or name
    target: String,

    /// Do not ask for confirmation
    #[arg(short, long)]
    force: bool,
}

impl DestroyCommand {
    pub async fn execute(self, ctx: &CliContext) -> Result<()> {
        let manager = ctx.cluster_manager(false)?;
        self.run(&manager, &mut Prompt::stdio()).await
    }

    async fn run<R: BufRead, W: Write>(&self, manager: &ClusterManager, prompt: &mut Prompt<R, W>) -> Result<()> {
        // resolve first so a typo fails before the question is asked
        let instance = manager.registry().get(&self.target).await?;

        if !self.force {
            let question = format!("Destroy cluster '{}' and delete all of its data?", instance.name);
            if !prompt.confirm(&question, false)? {
                prompt.say("Destroy cancelled.")?;
                return Ok(());
            }
        }

        let destroyed = manager.destroy(&instance.id).await?;
        prompt.say(format!("{} '{}'", "Destroyed cluster".green(), destroyed.name))
    }
}

pub(crate) fn status_label(status: ClusterStatus) -> ColoredString {
    let text = status.to_string();
    match status {
        ClusterStatus::Ready => text.green(),
        ClusterStatus::Creating | ClusterStatus::Starting | ClusterStatus::Stopping => text.yellow(),
        ClusterStatus::Stopped | ClusterStatus::Destroyed => text.dimmed(),
        ClusterStatus::Error => text.red(),
    }
}

fn render_status(instance: &ClusterInstance) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {} ({})", "Cluster:".bold(), instance.name, instance.id);
    let _ = writeln!(out, "  Type:              {}", instance.cluster_type());
    let _ = writeln!(out, "  Status:            {}", status_label(instance.status));
    let _ = writeln!(out, "  MongoDB Version:   {}", instance.spec.mongo_version());
    if let Some(uri) = &instance.connection_string {
        let _ = writeln!(out, "  Connection String: {uri}");
    }
    let _ = writeln!(out, "  Created:           {}", instance.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    let _ = writeln!(out, "  Last Updated:      {}", instance.last_updated.format("%Y-%m-%d %H:%M:%S UTC"));

    if !instance.processes.is_empty() {
        let _ = writeln!(out, "  Processes:");
        for process in &instance.processes {
            let replica_set = process.replica_set.as_deref().map(|rs| format!("  {rs}")).unwrap_or_default();
            let _ = writeln!(
                out,
                "    {:<14} port {:<6} pid {:<8}{}",
                process.role.to_string(),
                process.port,
                process.pid,
                replica_set
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{ClusterRegistry, ClusterSpec, LocalClusterSpec, ManagedProcess, ProcessRole};
    use crate::launcher::ClusterLauncher;
    use async_trait::async_trait;
    use std::io::Cursor;
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct NoopLauncher;

    #[async_trait]
    impl ClusterLauncher for NoopLauncher {
        fn name(&self) -> &'static str {
            "noop"
        }

        fn supports(&self, _spec: &ClusterSpec) -> bool {
            true
        }

        async fn launch(&self, spec: &ClusterSpec) -> Result<ClusterInstance> {
            Ok(ClusterInstance::new(ClusterInstance::generate_id("local", spec.name()), spec.clone()))
        }

        async fn start(&self, _instance: &mut ClusterInstance) -> Result<()> {
            Ok(())
        }

        async fn stop(&self, _instance: &mut ClusterInstance) -> Result<()> {
            Ok(())
        }

        async fn destroy(&self, instance: &mut ClusterInstance) -> Result<()> {
            instance.set_status(ClusterStatus::Destroyed);
            Ok(())
        }

        async fn status(&self, instance: &ClusterInstance) -> Result<ClusterStatus> {
            Ok(instance.status)
        }
    }

    async fn manager_with_cluster(temp: &TempDir) -> ClusterManager {
        let manager = ClusterManager::new(ClusterRegistry::new(temp.path())).with_launcher(Box::new(NoopLauncher));
        manager.launch(&ClusterSpec::Local(LocalClusterSpec::new("dev", "7.0"))).await.unwrap();
        manager
    }

    fn prompt(input: &str) -> Prompt<Cursor<Vec<u8>>, Vec<u8>> {
        Prompt::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[tokio::test]
    async fn test_destroy_declined() {
        let temp = TempDir::new().unwrap();
        let manager = manager_with_cluster(&temp).await;
        let cmd = DestroyCommand {
            target: "dev".to_string(),
            force: false,
        };

        let mut p = prompt("n\n");
        cmd.run(&manager, &mut p).await.unwrap();

        assert_eq!(manager.list().await.unwrap().len(), 1);
        let out = String::from_utf8(p.into_output()).unwrap();
        assert!(out.contains("Destroy cluster 'dev' and delete all of its data? [y/N]: "));
        assert!(out.contains("Destroy cancelled."));
    }

    #[tokio::test]
    async fn test_destroy_eof_keeps_cluster() {
        let temp = TempDir::new().unwrap();
        let manager = manager_with_cluster(&temp).await;
        let cmd = DestroyCommand {
            target: "dev".to_string(),
            force: false,
        };

        cmd.run(&manager, &mut prompt("")).await.unwrap();
        assert_eq!(manager.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_destroy_forced() {
        let temp = TempDir::new().unwrap();
        let manager = manager_with_cluster(&temp).await;
        let cmd = DestroyCommand {
            target: "dev".to_string(),
            force: true,
        };

        let mut p = prompt("");
        cmd.run(&manager, &mut p).await.unwrap();

        assert!(manager.list().await.unwrap().is_empty());
        assert!(String::from_utf8(p.into_output()).unwrap().contains("Destroyed cluster"));
    }

    #[tokio::test]
    async fn test_destroy_unknown_fails_before_prompt() {
        let temp = TempDir::new().unwrap();
        let manager = manager_with_cluster(&temp).await;
        let cmd = DestroyCommand {
            target: "ghost".to_string(),
            force: false,
        };

        let mut p = prompt("y\n");
        assert!(cmd.run(&manager, &mut p).await.is_err());
        assert!(p.into_output().is_empty());
    }

    #[test]
    fn test_render_status_lists_processes() {
        let mut instance = ClusterInstance::new(
            "local-dev-1",
            ClusterSpec::Local(LocalClusterSpec::new("dev", "7.0")),
        );
        instance.connection_string = Some("mongodb://localhost:27017/?replicaSet=dev".to_string());
        instance.processes.push(ManagedProcess {
            pid: 4242,
            port: 27017,
            role: ProcessRole::Mongod,
            replica_set: Some("dev".to_string()),
            binary: PathBuf::from("mongod"),
            args: Vec::new(),
            log_path: PathBuf::from("mongod-27017.log"),
        });

        let out = render_status(&instance);
        assert!(out.contains("local-dev-1"));
        assert!(out.contains("Connection String: mongodb://localhost:27017/?replicaSet=dev"));
        assert!(out.contains("port 27017"));
        assert!(out.contains("pid 4242"));
    }
}

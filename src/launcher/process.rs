//! Local process plumbing: starting `mongod`/`mongos`, waiting for them to
//! accept connections, stopping them, and running mongo shell scripts.

use crate::cluster::ManagedProcess;
use crate::constants::{PROCESS_READY_TIMEOUT, SHELL_SCRIPT_TIMEOUT};
use crate::core::LauncherError;
use crate::utils::backoff::exponential_backoff_with_delay;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use sysinfo::{Pid, Process, ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, Signal, System, UpdateKind};
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Whether something on localhost accepts connections on `port`.
pub async fn port_in_use(port: u16) -> bool {
    TcpStream::connect(("127.0.0.1", port)).await.is_ok()
}

fn spawn(binary: &Path, args: &[String]) -> Result<Child> {
    debug!("Executing command: {} {}", binary.display(), args.join(" "));

    let mut cmd = Command::new(binary);
    cmd.args(args).stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());
    // Own process group, so a Ctrl-C in the launcher's terminal does not
    // take the server down with it.
    #[cfg(unix)]
    cmd.process_group(0);

    cmd.spawn().map_err(|e| {
        LauncherError::ProcessStartFailed {
            binary: binary.display().to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

/// Poll `port` with exponential backoff until it accepts connections, the
/// child exits, or `limit` elapses.
async fn wait_until_ready(child: &mut Child, binary: &Path, port: u16, limit: Duration) -> Result<()> {
    let started = Instant::now();
    let mut attempt = 0;

    loop {
        if port_in_use(port).await {
            debug!("Port {} is accepting connections after {:?}", port, started.elapsed());
            return Ok(());
        }

        if let Some(status) = child.try_wait().context("Failed to poll child process")? {
            return Err(LauncherError::ProcessStartFailed {
                binary: binary.display().to_string(),
                reason: format!("exited with {status} before accepting connections"),
            }
            .into());
        }

        if started.elapsed() >= limit {
            return Err(LauncherError::PortTimeout {
                port,
                seconds: limit.as_secs(),
            }
            .into());
        }

        attempt = exponential_backoff_with_delay(attempt).await;
    }
}

/// Start `binary` detached and wait until it listens on `port`.
///
/// Returns the pid. A process that never becomes ready is killed.
pub async fn start_process(binary: &Path, args: &[String], port: u16) -> Result<u32> {
    start_process_with_timeout(binary, args, port, PROCESS_READY_TIMEOUT).await
}

pub(crate) async fn start_process_with_timeout(
    binary: &Path,
    args: &[String],
    port: u16,
    limit: Duration,
) -> Result<u32> {
    let mut child = spawn(binary, args)?;
    let pid = child.id().ok_or_else(|| LauncherError::ProcessStartFailed {
        binary: binary.display().to_string(),
        reason: "process exited immediately".to_string(),
    })?;

    if let Err(e) = wait_until_ready(&mut child, binary, port, limit).await {
        if let Err(kill_err) = child.kill().await {
            debug!("Failed to kill pid {}: {}", pid, kill_err);
        }
        return Err(e);
    }

    Ok(pid)
}

fn refreshed_system(pid: Pid) -> System {
    let mut system = System::new();
    system.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[pid]),
        true,
        ProcessRefreshKind::nothing().with_exe(UpdateKind::Always).with_cmd(UpdateKind::Always),
    );
    system
}

fn is_live(process: &Process) -> bool {
    !matches!(process.status(), ProcessStatus::Zombie | ProcessStatus::Dead)
}

/// Whether `process` is the server that was started as `binary ... --port <port>`.
///
/// The kernel's short name, the executable and `argv[0]` are compared by
/// file name, since installs are often reached through symlinks.
fn is_same_server(process: &Process, binary: &Path, port: u16) -> bool {
    let Some(expected) = binary.file_name() else {
        return false;
    };
    let same_binary = process.name() == expected
        || process.exe().and_then(Path::file_name) == Some(expected)
        || process.cmd().first().and_then(|arg0| Path::new(arg0).file_name()) == Some(expected);

    let port = port.to_string();
    let inline = format!("--port={port}");
    let cmd = process.cmd();
    let same_port = cmd.windows(2).any(|w| w[0] == "--port" && w[1] == port.as_str())
        || cmd.iter().any(|arg| *arg == inline.as_str());

    same_binary && same_port
}

/// Whether the recorded process is still running.
///
/// A pid that is now held by some other program (pids are recycled once a
/// server exits) counts as not running.
#[must_use]
pub fn is_server_running(server: &ManagedProcess) -> bool {
    let pid = Pid::from_u32(server.pid);
    let system = refreshed_system(pid);
    system.process(pid).is_some_and(|p| is_live(p) && is_same_server(p, &server.binary, server.port))
}

/// Ask the recorded server to terminate and wait up to `limit` for it to
/// exit, killing it if it does not.
///
/// Returns `false` if it was not running. A recycled pid is never signalled.
pub async fn terminate_server(server: &ManagedProcess, limit: Duration) -> Result<bool> {
    if !is_server_running(server) {
        return Ok(false);
    }

    let pid = Pid::from_u32(server.pid);
    {
        let system = refreshed_system(pid);
        if let Some(process) = system.process(pid) {
            // kill_with returns None where SIGTERM does not exist (Windows)
            if process.kill_with(Signal::Term).is_none() {
                process.kill();
            }
        }
    }

    let started = Instant::now();
    let mut attempt = 0;
    while started.elapsed() < limit {
        if !is_server_running(server) {
            debug!("Process {} exited after {:?}", server.pid, started.elapsed());
            return Ok(true);
        }
        attempt = exponential_backoff_with_delay(attempt).await;
    }

    warn!("Process {} did not exit within {}s, killing it", server.pid, limit.as_secs());
    let system = refreshed_system(pid);
    if let Some(process) = system.process(pid)
        && is_same_server(process, &server.binary, server.port)
    {
        process.kill();
    }
    Ok(true)
}

/// Locate a MongoDB shell: `mongosh`, then the legacy `mongo`, then a
/// `mongo` shipped in `bin_dir` (older server archives include one).
pub fn find_shell(bin_dir: Option<&Path>) -> Result<PathBuf> {
    for name in ["mongosh", "mongo"] {
        if let Ok(path) = which::which(name) {
            debug!("Using MongoDB shell at {}", path.display());
            return Ok(path);
        }
    }

    if let Some(dir) = bin_dir {
        let bundled = dir.join(if cfg!(windows) { "mongo.exe" } else { "mongo" });
        if bundled.is_file() {
            return Ok(bundled);
        }
    }

    Err(LauncherError::ShellNotFound.into())
}

/// Credentials passed to the shell once a root user exists.
#[derive(Debug, Clone, Copy)]
pub struct ShellAuth<'a> {
    pub user: &'a str,
    pub password: &'a str,
}

/// Arguments for evaluating `script` against `localhost:<port>`.
#[must_use]
pub fn shell_args(port: u16, script: &str, auth: Option<ShellAuth<'_>>) -> Vec<String> {
    let mut args = vec!["--quiet".to_string(), "--port".to_string(), port.to_string()];
    if let Some(auth) = auth {
        args.extend([
            "-u".to_string(),
            auth.user.to_string(),
            "-p".to_string(),
            auth.password.to_string(),
            "--authenticationDatabase".to_string(),
            "admin".to_string(),
        ]);
    }
    args.push("--eval".to_string());
    args.push(script.to_string());
    args
}

/// Evaluate `script` with the shell and return its stdout.
pub async fn run_shell_script(
    shell: &Path,
    port: u16,
    script: &str,
    auth: Option<ShellAuth<'_>>,
) -> Result<String> {
    debug!("Running shell script on port {}: {}", port, script);

    let mut cmd = Command::new(shell);
    cmd.args(shell_args(port, script, auth))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = match timeout(SHELL_SCRIPT_TIMEOUT, cmd.output()).await {
        Ok(result) => result.map_err(|e| LauncherError::ProcessStartFailed {
            binary: shell.display().to_string(),
            reason: e.to_string(),
        })?,
        Err(_) => {
            return Err(LauncherError::ShellCommandFailed {
                port,
                stderr: format!("timed out after {} seconds", SHELL_SCRIPT_TIMEOUT.as_secs()),
            }
            .into());
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(LauncherError::ShellCommandFailed {
            port,
            stderr: if stderr.is_empty() { stdout.trim().to_string() } else { stderr },
        }
        .into());
    }

    Ok(stdout)
}

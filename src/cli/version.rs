//! Manage locally installed MongoDB server versions.
//!
//! Versions are installed into the same directory layout the `m` version
//! manager uses, so installations made by either tool are shared.
//!
//! # Examples
//!
//! ```bash
//! mongo-launcher version list
//! mongo-launcher version install 7.0
//! mongo-launcher version available --limit 10
//! mongo-launcher version remove 7.0.14
//! mongo-launcher version info
//! ```

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;
use std::fmt::Write as _;

use crate::constants::DEFAULT_AVAILABLE_LIMIT;
use crate::utils::progress::spinner_with_message;
use crate::version::{MongoVersion, MongoVersionManager};

/// Command to list, install and remove MongoDB versions.
#[derive(Args, Debug)]
pub struct VersionCommand {
    #[command(subcommand)]
    command: Option<VersionSubcommands>,
}

#[derive(Subcommand, Debug)]
enum VersionSubcommands {
    /// List installed MongoDB versions
    List,

    /// Install a MongoDB version
    Install {
        /// Version to install (e.g. 7.0.14, 7.0 or latest)
        version: String,
    },

    /// Remove an installed MongoDB version
    Remove {
        /// Exact installed version (e.g. 7.0.14)
        version: String,
    },

    /// List versions available for download
    Available {
        /// Number of versions to show
        #[arg(short, long, default_value_t = DEFAULT_AVAILABLE_LIMIT)]
        limit: usize,
    },

    /// Show where versions are installed
    Info,
}

impl VersionCommand {
    pub async fn execute(self) -> Result<()> {
        let Some(command) = self.command else {
            print!("{}", render_help());
            return Ok(());
        };

        let manager = MongoVersionManager::new()?;
        match command {
            VersionSubcommands::List => print!("{}", render_list(&manager.installed_versions())),
            VersionSubcommands::Install {
                version,
            } => install(&manager, &version).await?,
            VersionSubcommands::Remove {
                version,
            } => {
                let version = MongoVersion::parse(&version)?;
                manager.remove(&version)?;
                println!("{} {}", "Removed MongoDB version".green(), version);
            }
            VersionSubcommands::Available {
                limit,
            } => {
                let spinner = spinner_with_message("Fetching available MongoDB versions");
                let available = manager.available_versions().await;
                spinner.finish_and_clear();
                print!("{}", render_available(&available?, limit));
            }
            VersionSubcommands::Info => print!("{}", render_info(&manager)),
        }
        Ok(())
    }
}

async fn install(manager: &MongoVersionManager, pattern: &str) -> Result<()> {
    let version = manager.find_version(pattern).await?;
    if manager.is_installed(&version) {
        println!("MongoDB {version} is already installed");
        return Ok(());
    }

    println!("Installing MongoDB version {version}...");
    manager.install(&version).await?;
    println!("{} {}", "Successfully installed MongoDB".green(), version);
    Ok(())
}

fn render_help() -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", "MongoDB Version Manager".bold());
    let _ = writeln!(out);
    let _ = writeln!(out, "Commands:");
    let _ = writeln!(out, "  list                 List installed MongoDB versions");
    let _ = writeln!(out, "  install <version>    Install a MongoDB version");
    let _ = writeln!(out, "  remove <version>     Remove an installed MongoDB version");
    let _ = writeln!(out, "  available            List versions available for download");
    let _ = writeln!(out, "  info                 Show where versions are installed");
    out
}

fn render_list(installed: &[MongoVersion]) -> String {
    if installed.is_empty() {
        return "No MongoDB versions installed\n".to_string();
    }
    let mut out = format!("{}\n", "Installed MongoDB versions:".bold());
    for version in installed {
        let _ = writeln!(out, "  {version}");
    }
    out
}

fn render_available(available: &[MongoVersion], limit: usize) -> String {
    let shown = limit.min(available.len());
    let mut out = format!("{}\n", format!("Available MongoDB versions (showing latest {shown}):").bold());
    for version in available.iter().take(limit) {
        let _ = writeln!(out, "  {version}");
    }
    out
}

fn render_info(manager: &MongoVersionManager) -> String {
    let title = "MongoDB Installation Information";
    let mut out = String::new();
    let _ = writeln!(out, "{}", title.bold());
    let _ = writeln!(out, "{}", "=".repeat(title.len()));
    let _ = writeln!(out);
    let _ = writeln!(out, "Primary installation location: {}", manager.versions_dir().display());
    let _ = writeln!(out);

    let _ = writeln!(out, "Scanning for existing installations:");
    for location in manager.locations_report() {
        let marker = match (location.exists, location.version_count) {
            (true, n) if n > 0 => format!("{} ({} versions)", "✓".green(), n),
            (true, _) => "✗".yellow().to_string(),
            (false, _) => "- (not found)".dimmed().to_string(),
        };
        let read_only = if location.exists && !location.writable { " [read-only]" } else { "" };
        let _ = writeln!(out, "  {} {}{}", location.path.display(), marker, read_only);
    }

    let installed = manager.installed_versions();
    if !installed.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Installed versions:");
        for version in &installed {
            let dir = manager.version_dir(version);
            let parent = dir.parent().map_or_else(|| dir.display().to_string(), |p| p.display().to_string());
            let state = if manager.mongod_path(version).is_file() {
                "✓".green().to_string()
            } else {
                "✗ (mongod missing)".red().to_string()
            };
            let _ = writeln!(out, "  {version} @ {parent} {state}");
        }
    }
    out
}

//! List every cluster in the registry.
//!
//! Statuses are shown as last recorded; use `status <cluster>` to refresh
//! one.
//!
//! # Output Formats
//!
//! ## Table Format (Default)
//! ```text
//! NAME     TYPE    STATUS   CONNECTION STRING                           ID
//! dev      local   READY    mongodb://localhost:27017                   local-dev-1718000000
//! prod     atlas   CREATING mongodb+srv://prod.mongodb.net/test         atlas-prod-1718000100
//! ```
//!
//! ## JSON Format
//! The registry entries as a JSON array.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;
use std::fmt::Write as _;

use crate::cli::CliContext;
use crate::cli::cluster::status_label;
use crate::cluster::ClusterInstance;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ListFormat {
    #[default]
    Table,
    Json,
}

/// Command to list managed clusters.
#[derive(Args, Debug)]
pub struct ListCommand {
    /// Output format
    #[arg(long, value_enum, default_value_t = ListFormat::Table)]
    format: ListFormat,
}

impl ListCommand {
    pub async fn execute(self, ctx: &CliContext) -> Result<()> {
        let clusters = ctx.registry().list().await?;
        match self.format {
            ListFormat::Json => {
                let json = serde_json::to_string_pretty(&clusters).context("Failed to serialize clusters")?;
                println!("{json}");
            }
            ListFormat::Table => print!("{}", render_table(&clusters)),
        }
        Ok(())
    }
}

fn render_table(clusters: &[ClusterInstance]) -> String {
    if clusters.is_empty() {
        return "No clusters found\n".to_string();
    }

    let rows: Vec<[String; 5]> = clusters
        .iter()
        .map(|c| {
            [
                c.name.clone(),
                c.cluster_type().to_string(),
                c.status.to_string(),
                c.connection_string.clone().unwrap_or_else(|| "-".to_string()),
                c.id.clone(),
            ]
        })
        .collect();

    let headers = ["NAME", "TYPE", "STATUS", "CONNECTION STRING", "ID"];
    let mut widths = headers.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    let header: Vec<String> = headers.iter().zip(widths).map(|(h, w)| format!("{h:<w$}")).collect();
    let _ = writeln!(out, "{}", header.join("  ").trim_end().bold());

    for (row, cluster) in rows.iter().zip(clusters) {
        // escape codes would skew `{:<w$}`, so pad by hand
        let status = format!("{}{}", status_label(cluster.status), " ".repeat(widths[2] - row[2].len()));
        let line = format!(
            "{:<w0$}  {:<w1$}  {}  {:<w3$}  {}",
            row[0],
            row[1],
            status,
            row[3],
            row[4],
            w0 = widths[0],
            w1 = widths[1],
            w3 = widths[3],
        );
        let _ = writeln!(out, "{line}");
    }
    out
}

//! mongo-launcher CLI entry point
//!
//! Parses the command line, runs the selected command and turns any error
//! into a friendly message with exit code 1.
//!
//! - `launch` - Launch a local or Atlas cluster
//! - `status` / `start` / `stop` / `destroy` - Manage a launched cluster
//! - `list` - List managed clusters
//! - `version` - Manage installed MongoDB versions
//! - `config` - Manage user configuration

use anyhow::Result;
use clap::Parser;
use mongo_launcher::cli;
use mongo_launcher::core::error::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}

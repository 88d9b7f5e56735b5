//! Error handling for mongo-launcher
//!
//! This module provides the error types used across the launcher and the
//! machinery that turns them into friendly terminal output. Library code
//! returns [`LauncherError`] (usually wrapped in `anyhow::Error` with extra
//! context); the binary converts whatever reaches `main` into an
//! [`ErrorContext`] with [`user_friendly_error`] and prints it.
//!
//! # Output format
//!
//! ```text
//! error: No MongoDB version found matching: 9.9
//! details: The version was neither installed locally nor listed by the release index
//! suggestion: Run 'mongo-launcher version available' to see downloadable versions
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for mongo-launcher operations.
#[derive(Error, Debug)]
pub enum LauncherError {
    /// A configuration value could not be applied or the config file is unusable.
    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
    },

    /// A required option was not supplied and could not be prompted for.
    #[error("{option} is required")]
    MissingOption {
        option: String,
        hint: String,
    },

    /// A version string does not follow the `major.minor[.patch][-pre]` format.
    #[error("Invalid MongoDB version format: {version}")]
    InvalidVersion {
        version: String,
    },

    /// No installed or downloadable version matches the requested pattern.
    #[error("No MongoDB version found matching: {pattern}")]
    VersionNotFound {
        pattern: String,
    },

    /// The requested version is not installed locally.
    #[error("MongoDB version {version} is not installed")]
    VersionNotInstalled {
        version: String,
    },

    /// The current OS/architecture has no MongoDB server build.
    #[error("Unsupported platform: {platform}")]
    UnsupportedPlatform {
        platform: String,
    },

    /// An HTTP download or API listing failed.
    #[error("Download failed: {url}")]
    DownloadFailed {
        url: String,
        reason: String,
    },

    /// A downloaded archive did not match its published checksum.
    #[error("Checksum mismatch for {file}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        file: String,
        expected: String,
        actual: String,
    },

    /// An archive could not be unpacked.
    #[error("Failed to extract {archive}: {reason}")]
    ExtractionFailed {
        archive: String,
        reason: String,
    },

    /// No registered launcher handles the given cluster type.
    #[error("No launcher found for cluster type: {cluster_type}")]
    NoLauncher {
        cluster_type: String,
    },

    /// The cluster id or name is not in the registry.
    #[error("Cluster '{target}' not found")]
    ClusterNotFound {
        target: String,
    },

    /// A cluster with the same name is already registered.
    #[error("A cluster named '{name}' already exists")]
    ClusterAlreadyExists {
        name: String,
    },

    /// A cluster could not be launched.
    #[error("Failed to launch cluster '{name}': {reason}")]
    LaunchFailed {
        name: String,
        reason: String,
    },

    /// A mongod/mongos/shell process could not be started.
    #[error("Failed to start {binary}: {reason}")]
    ProcessStartFailed {
        binary: String,
        reason: String,
    },

    /// A started process never accepted connections.
    #[error("Process on port {port} did not accept connections within {seconds}s")]
    PortTimeout {
        port: u16,
        seconds: u64,
    },

    /// A mongo shell script exited unsuccessfully.
    #[error("Shell command failed on port {port}: {stderr}")]
    ShellCommandFailed {
        port: u16,
        stderr: String,
    },

    /// Neither `mongosh` nor the legacy `mongo` shell is available.
    #[error("No MongoDB shell (mongosh or mongo) found")]
    ShellNotFound,

    /// Atlas service account credentials are not configured.
    #[error("Atlas credentials are not configured")]
    AtlasCredentialsMissing,

    /// The Atlas Administration API returned an error response.
    #[error("Atlas API request failed with HTTP {status}: {detail}")]
    AtlasApiError {
        status: u16,
        detail: String,
    },

    /// IO error from the standard library.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Generic error for cases not covered above.
    #[error("{message}")]
    Other {
        message: String,
    },
}

/// Error context wrapper that adds a suggestion and details to an error.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: LauncherError,
    /// Optional actionable suggestion for the user
    pub suggestion: Option<String>,
    /// Optional extra explanation
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context without suggestion or details.
    #[must_use]
    pub const fn new(error: LauncherError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining the error.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into a user-friendly [`ErrorContext`].
///
/// Known [`LauncherError`] variants get tailored suggestions; IO errors are
/// mapped by kind; everything else keeps its full cause chain so nothing is
/// lost when it is printed.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    // Context layers added with `.context()` would be dropped by the downcast,
    // so keep them around as details.
    let outer = error.to_string();

    let error = match error.downcast::<LauncherError>() {
        Ok(launcher_error) => {
            let inner = launcher_error.to_string();
            let ctx = create_error_context(launcher_error);
            if outer != inner && ctx.details.is_none() {
                return ctx.with_details(outer);
            }
            return ctx;
        }
        Err(error) => error,
    };

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(LauncherError::Other {
                    message: format!("Permission denied: {outer}"),
                })
                .with_suggestion("Check file ownership and permissions, or choose a different directory with --config-dir")
                .with_details("mongo-launcher could not read or write a file it needs");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(LauncherError::Other {
                    message: format!("File not found: {outer}"),
                })
                .with_suggestion("Check that the file or directory exists and the path is correct");
            }
            _ => {}
        }
    }

    let mut message = outer;
    let chain: Vec<String> = error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(LauncherError::Other {
        message,
    })
}

fn create_error_context(error: LauncherError) -> ErrorContext {
    match &error {
        LauncherError::MissingOption {
            hint,
            ..
        } => {
            let hint = hint.clone();
            ErrorContext::new(error).with_suggestion(hint)
        }
        LauncherError::InvalidVersion {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Use a version like '7.0', '7.0.6' or '8.0.0-rc1'"),
        LauncherError::VersionNotFound {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Run 'mongo-launcher version available' to see downloadable versions")
            .with_details("The version was neither installed locally nor listed by the release index"),
        LauncherError::VersionNotInstalled {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Run 'mongo-launcher version list' to see installed versions"),
        LauncherError::UnsupportedPlatform {
            ..
        } => ErrorContext::new(error)
            .with_details("MongoDB publishes server builds for Linux, macOS and Windows on x86_64 and arm64"),
        LauncherError::DownloadFailed {
            reason,
            ..
        } => {
            let reason = reason.clone();
            ErrorContext::new(error)
                .with_details(reason)
                .with_suggestion("Check your internet connection and that the version exists for this platform")
        }
        LauncherError::ChecksumMismatch {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Retry the installation; if it keeps failing the download mirror may be serving a corrupt file"),
        LauncherError::NoLauncher {
            ..
        } => ErrorContext::new(error).with_suggestion("Use cluster type 'local' or 'atlas'"),
        LauncherError::ClusterNotFound {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Run 'mongo-launcher list' to see managed clusters"),
        LauncherError::ClusterAlreadyExists {
            name,
        } => {
            let suggestion = format!(
                "Choose another name, or remove the existing cluster with 'mongo-launcher destroy {name}'"
            );
            ErrorContext::new(error).with_suggestion(suggestion)
        }
        LauncherError::PortTimeout {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Check the mongod log files and make sure the port is not already in use"),
        LauncherError::ShellNotFound => ErrorContext::new(error)
            .with_suggestion("Install mongosh (https://www.mongodb.com/try/download/shell) and make sure it is on your PATH")
            .with_details("Replica sets and sharded clusters are initiated through the MongoDB shell"),
        LauncherError::AtlasCredentialsMissing => ErrorContext::new(error)
            .with_suggestion(
                "Run 'mongo-launcher config set atlasClientId <id>' and 'mongo-launcher config set atlasClientSecret <secret>', \
                 or export MONGODB_ATLAS_CLIENT_ID and MONGODB_ATLAS_CLIENT_SECRET",
            )
            .with_details("Atlas clusters are managed with an Atlas service account"),
        LauncherError::AtlasApiError {
            status,
            ..
        } => {
            let suggestion = match status {
                401 | 403 => "Verify the service account credentials and its project permissions",
                404 => "Verify the Atlas project id",
                409 => "A cluster with this name may already exist in the project",
                _ => "Retry later or check the Atlas status page",
            };
            ErrorContext::new(error).with_suggestion(suggestion)
        }
        _ => ErrorContext::new(error),
    }
}

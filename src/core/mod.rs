//! Core types shared by every part of mongo-launcher.
//!
//! At the moment this is the error system:
//! - [`LauncherError`] - strongly-typed failures raised by library code
//! - [`ErrorContext`] - an error plus an optional suggestion and details
//! - [`user_friendly_error`] - converts any `anyhow::Error` for display
//!
//! # Examples
//!
//! ```rust
//! use mongo_launcher::core::{LauncherError, user_friendly_error};
//!
//! fn find_cluster() -> anyhow::Result<()> {
//!     Err(LauncherError::ClusterNotFound {
//!         target: "dev".to_string(),
//!     }
//!     .into())
//! }
//!
//! if let Err(e) = find_cluster() {
//!     let ctx = user_friendly_error(e);
//!     assert!(ctx.suggestion.is_some());
//! }
//! ```

pub mod error;

pub use error::{ErrorContext, LauncherError, user_friendly_error};

//! Integration test suite for mongo-launcher
//!
//! These tests run the real binary in an isolated environment (see
//! [`common::TestEnv`]). None of them start `mongod` or reach the network.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **cli_basics**: Version, help and global flag handling
//! - **config**: The `config` command family
//! - **lifecycle**: `launch` validation, `list`, `status`, `stop`, `destroy`
//! - **version**: The `version` command family

#[path = "../common/mod.rs"]
mod common;

mod cli_basics;
mod config;
mod lifecycle;
mod version;

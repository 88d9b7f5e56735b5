//! Cluster model: what a user asked for, what is running, and where it is
//! recorded.
//!
//! - [`spec`] - [`ClusterSpec`] and its local/Atlas variants
//! - [`instance`] - [`ClusterInstance`], [`ClusterStatus`] and local processes
//! - [`registry`] - the locked `clusters.json` registry

pub mod instance;
pub mod registry;
pub mod spec;

pub use instance::{ClusterInstance, ClusterStatus, ManagedProcess, ProcessRole};
pub use registry::ClusterRegistry;
pub use spec::{AtlasClusterSpec, AtlasTopology, ClusterSpec, ClusterType, LocalClusterSpec, LocalTopology};

//! Global constants used throughout the mongo-launcher codebase.
//!
//! This module contains default values, timeouts, retry parameters and
//! well-known URLs that are shared across modules. Defining them centrally
//! keeps magic numbers discoverable.

use std::time::Duration;

/// Name of the configuration file inside the configuration directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Name of the cluster registry file inside the configuration directory.
pub const REGISTRY_FILE_NAME: &str = "clusters.json";

/// Environment variable overriding the configuration directory.
pub const CONFIG_DIR_ENV: &str = "MONGO_LAUNCHER_CONFIG_DIR";

/// Environment variable disabling progress bars and spinners.
pub const NO_PROGRESS_ENV: &str = "MONGO_LAUNCHER_NO_PROGRESS";

/// Environment variable pointing at an `m` installation prefix.
pub const M_PREFIX_ENV: &str = "M_PREFIX";

/// Default MongoDB version used when nothing else is configured.
pub const DEFAULT_MONGO_VERSION: &str = "7.0";

/// Default port of the first local mongod.
pub const DEFAULT_PORT: u16 = 27017;

/// Default number of members in a local replica set.
pub const DEFAULT_REPLICA_SET_SIZE: u32 = 3;

/// Default number of shards in a sharded cluster.
pub const DEFAULT_SHARD_COUNT: u32 = 2;

/// Offset from the base port at which `mongos` listens.
pub const MONGOS_PORT_OFFSET: u16 = 1000;

/// Bounds applied to interactively entered replica set sizes.
pub const MIN_REPLICA_SET_SIZE: u32 = 1;
pub const MAX_REPLICA_SET_SIZE: u32 = 50;

/// Default Atlas instance size.
pub const DEFAULT_INSTANCE_SIZE: &str = "M10";

/// Default Atlas region.
pub const DEFAULT_REGION: &str = "US_EAST_1";

/// Default Atlas cloud provider.
pub const DEFAULT_CLOUD_PROVIDER: &str = "AWS";

/// Instance sizes offered by the interactive prompt.
pub const ATLAS_INSTANCE_SIZES: &[&str] = &["M0", "M2", "M5", "M10", "M20", "M30", "M40", "M50"];

/// Shared-tier instance sizes that Atlas provisions through the `TENANT` provider.
pub const ATLAS_TENANT_SIZES: &[&str] = &["M0", "M2", "M5"];

/// Base URL of the MongoDB Atlas Administration API.
pub const ATLAS_BASE_URL: &str = "https://cloud.mongodb.com";

/// Versioned media type for the Atlas Administration API v2.
pub const ATLAS_API_MEDIA_TYPE: &str = "application/vnd.atlas.2024-08-05+json";

/// Environment variables carrying Atlas service account credentials.
pub const ATLAS_CLIENT_ID_ENV: &str = "MONGODB_ATLAS_CLIENT_ID";
pub const ATLAS_CLIENT_SECRET_ENV: &str = "MONGODB_ATLAS_CLIENT_SECRET";

/// Interval between Atlas status polls while waiting for a cluster.
pub const ATLAS_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Maximum time to wait for an Atlas cluster to become ready.
pub const ATLAS_WAIT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Listing of MongoDB release tags.
pub const MONGODB_RELEASES_URL: &str = "https://api.github.com/repos/mongodb/mongo/tags?per_page=100";

/// Base URL for MongoDB server archives.
pub const MONGODB_DOWNLOAD_BASE: &str = "https://fastdl.mongodb.org";

/// Maximum time a started mongod/mongos has to accept connections.
pub const PROCESS_READY_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum time a process has to exit after being asked to terminate.
pub const PROCESS_STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum time for a mongo shell script (replica set initiation, addShard).
pub const SHELL_SCRIPT_TIMEOUT: Duration = Duration::from_secs(120);

/// Exponential backoff bounds used when polling for readiness.
pub const STARTING_BACKOFF_DELAY_MS: u64 = 50;
pub const MAX_BACKOFF_DELAY_MS: u64 = 1000;

/// Number of installed versions listed by the interactive version prompt.
pub const MAX_LISTED_VERSIONS: usize = 10;

/// Number of available versions shown by `version available` by default.
pub const DEFAULT_AVAILABLE_LIMIT: usize = 20;

//! MongoDB server versions.
//!
//! MongoDB versions are not strict semver: users routinely write `7.0` for the
//! 7.0 release series and release candidates look like `8.0.0-rc1`. This
//! module provides [`MongoVersion`], a small parsed representation with the
//! ordering and matching rules the launcher needs, plus the submodules that
//! find, download and install server binaries.
//!
//! # Modules
//!
//! - [`platform`] - OS/architecture detection and download URLs
//! - [`manager`] - Installed versions in an `m`-compatible layout
//! - [`verification`] - SHA-256 verification of downloaded archives
//! - [`archive`] - `.tgz` and `.zip` extraction
//!
//! # Examples
//!
//! ```rust
//! use mongo_launcher::version::MongoVersion;
//!
//! let v = MongoVersion::parse("7.0.6")?;
//! assert_eq!(v.major_minor(), "7.0");
//! assert!(v.matches("7.0"));
//! assert!(v.matches("7"));
//! assert!(MongoVersion::parse("8.0.0-rc1")?.is_pre_release());
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod archive;
pub mod manager;
pub mod platform;
pub mod verification;

use crate::core::LauncherError;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::LazyLock;

pub use manager::MongoVersionManager;
pub use platform::Platform;

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\.(\d+)(?:\.(\d+))?(?:-(.+))?$").expect("version regex is valid")
});

/// A parsed MongoDB version.
///
/// Equality and hashing ignore the original spelling, so `7.0` and `7.0.0`
/// are the same version.
#[derive(Debug, Clone)]
pub struct MongoVersion {
    major: u32,
    minor: u32,
    patch: u32,
    pre_release: Option<String>,
    original: String,
}

impl MongoVersion {
    /// Parse `major.minor[.patch][-prerelease]`.
    ///
    /// # Errors
    ///
    /// Returns [`LauncherError::InvalidVersion`] for anything else.
    pub fn parse(text: &str) -> Result<Self, LauncherError> {
        let text = text.trim();
        let invalid = || LauncherError::InvalidVersion {
            version: text.to_string(),
        };

        let caps = VERSION_RE.captures(text).ok_or_else(invalid)?;
        let number = |i: usize| -> Result<u32, LauncherError> {
            caps.get(i).map_or(Ok(0), |m| m.as_str().parse().map_err(|_| invalid()))
        };

        Ok(Self {
            major: number(1)?,
            minor: number(2)?,
            patch: number(3)?,
            pre_release: caps.get(4).map(|m| m.as_str().to_string()),
            original: text.to_string(),
        })
    }

    /// Build a version from components.
    ///
    /// The patch number is only rendered when non-zero.
    #[must_use]
    pub fn from_parts(major: u32, minor: u32, patch: u32, pre_release: Option<String>) -> Self {
        let mut original = format!("{major}.{minor}");
        if patch > 0 {
            original.push_str(&format!(".{patch}"));
        }
        if let Some(pre) = &pre_release {
            original.push('-');
            original.push_str(pre);
        }
        Self {
            major,
            minor,
            patch,
            pre_release,
            original,
        }
    }

    /// The version as it was written.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.original
    }

    #[must_use]
    pub const fn major(&self) -> u32 {
        self.major
    }

    #[must_use]
    pub const fn minor(&self) -> u32 {
        self.minor
    }

    #[must_use]
    pub const fn patch(&self) -> u32 {
        self.patch
    }

    #[must_use]
    pub fn pre_release(&self) -> Option<&str> {
        self.pre_release.as_deref()
    }

    /// `"major.minor"`, the release series.
    #[must_use]
    pub fn major_minor(&self) -> String {
        format!("{}.{}", self.major, self.minor)
    }

    #[must_use]
    pub const fn is_pre_release(&self) -> bool {
        self.pre_release.is_some()
    }

    /// Whether `pattern` names this version: the full version, its
    /// `major.minor` series or its major number.
    #[must_use]
    pub fn matches(&self, pattern: &str) -> bool {
        let pattern = pattern.trim();
        pattern == self.original
            || pattern == self.major_minor()
            || pattern == self.major.to_string()
            || Self::parse(pattern).is_ok_and(|p| p.original.matches('.').count() == 2 && p == *self)
    }
}

impl PartialEq for MongoVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MongoVersion {}

impl Hash for MongoVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.major.hash(state);
        self.minor.hash(state);
        self.patch.hash(state);
        self.pre_release.hash(state);
    }
}

impl PartialOrd for MongoVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MongoVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
            .then_with(|| match (&self.pre_release, &other.pre_release) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl fmt::Display for MongoVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl FromStr for MongoVersion {
    type Err = LauncherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for MongoVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.original)
    }
}

impl<'de> Deserialize<'de> for MongoVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_parse_variants() {
        let v = MongoVersion::parse("7.0").unwrap();
        assert_eq!((v.major(), v.minor(), v.patch()), (7, 0, 0));
        assert_eq!(v.version(), "7.0");

        let v = MongoVersion::parse("8.0.0-rc1").unwrap();
        assert_eq!(v.pre_release(), Some("rc1"));
        assert!(v.is_pre_release());

        let v = MongoVersion::parse(" 6.0.14 ").unwrap();
        assert_eq!(v.version(), "6.0.14");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", "7", "seven", "7.x", "v7.0.1", "7.0.1.2"] {
            let err = MongoVersion::parse(bad).unwrap_err();
            assert!(matches!(err, LauncherError::InvalidVersion { .. }), "{bad} should fail");
        }
    }

    #[test]
    fn test_from_parts_rendering() {
        assert_eq!(MongoVersion::from_parts(7, 0, 0, None).version(), "7.0");
        assert_eq!(MongoVersion::from_parts(7, 0, 6, None).version(), "7.0.6");
        assert_eq!(MongoVersion::from_parts(8, 0, 0, Some("rc2".into())).version(), "8.0-rc2");
    }

    #[test]
    fn test_matches() {
        let v = MongoVersion::parse("7.0.6").unwrap();
        assert!(v.matches("7.0.6"));
        assert!(v.matches("7.0"));
        assert!(v.matches("7"));
        assert!(!v.matches("7.1"));
        assert!(!v.matches("6"));
        assert!(!v.matches("7.0.5"));
    }

    #[test]
    fn test_ordering_release_above_prerelease() {
        let mut versions: Vec<MongoVersion> = ["7.0.2", "8.0.0-rc1", "6.0.14", "8.0.0", "7.0.10", "8.0.0-rc2"]
            .iter()
            .map(|s| MongoVersion::parse(s).unwrap())
            .collect();
        versions.sort();

        let ordered: Vec<&str> = versions.iter().map(MongoVersion::version).collect();
        assert_eq!(ordered, ["6.0.14", "7.0.2", "7.0.10", "8.0.0-rc1", "8.0.0-rc2", "8.0.0"]);
    }

    #[test]
    fn test_equality_ignores_spelling() {
        let a = MongoVersion::parse("7.0").unwrap();
        let b = MongoVersion::parse("7.0.0").unwrap();
        assert_eq!(a, b);

        let set: HashSet<MongoVersion> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_serde_as_string() {
        let v: MongoVersion = serde_json::from_str("\"7.0.6\"").unwrap();
        assert_eq!(serde_json::to_string(&v).unwrap(), "\"7.0.6\"");
        assert!(serde_json::from_str::<MongoVersion>("\"nope\"").is_err());
    }
}

//! Platform detection for MongoDB server downloads.
//!
//! MongoDB publishes one archive per OS, CPU architecture and (on Linux)
//! distribution. [`Platform`] captures the first two from the compile target;
//! the distribution comes from `/etc/os-release` via
//! [`linux_distro_from_os_release`].

use crate::core::LauncherError;
use crate::version::MongoVersion;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    Linux,
    MacOs,
    Windows,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X86_64,
    Arm64,
    Unknown,
}

/// An operating system and CPU architecture pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
}

impl Platform {
    /// The platform this binary was compiled for.
    #[must_use]
    pub const fn current() -> Self {
        let os = if cfg!(target_os = "linux") {
            Os::Linux
        } else if cfg!(target_os = "macos") {
            Os::MacOs
        } else if cfg!(windows) {
            Os::Windows
        } else {
            Os::Unknown
        };

        let arch = if cfg!(target_arch = "x86_64") {
            Arch::X86_64
        } else if cfg!(target_arch = "aarch64") {
            Arch::Arm64
        } else {
            Arch::Unknown
        };

        Self {
            os,
            arch,
        }
    }

    #[must_use]
    pub const fn new(os: Os, arch: Arch) -> Self {
        Self {
            os,
            arch,
        }
    }

    /// Platform-specific executable file name (`mongod` or `mongod.exe`).
    #[must_use]
    pub fn executable_name(&self, base: &str) -> String {
        if self.os == Os::Windows {
            format!("{base}.exe")
        } else {
            base.to_string()
        }
    }

    /// Extension of the server archive for this platform.
    #[must_use]
    pub const fn archive_extension(&self) -> &'static str {
        if matches!(self.os, Os::Windows) {
            "zip"
        } else {
            "tgz"
        }
    }

    /// Download URL of the server archive for `version`.
    ///
    /// `distro` is only used on Linux; without it the generic Linux build is
    /// requested.
    ///
    /// # Errors
    ///
    /// Returns [`LauncherError::UnsupportedPlatform`] when MongoDB publishes no
    /// build for this OS/architecture.
    pub fn download_url(
        &self,
        base: &str,
        version: &MongoVersion,
        distro: Option<&str>,
    ) -> Result<String, LauncherError> {
        let base = base.trim_end_matches('/');
        let v = version.version();

        match (self.os, self.arch) {
            (Os::Linux, Arch::X86_64 | Arch::Arm64) => {
                let arch = if self.arch == Arch::X86_64 {
                    "x86_64"
                } else {
                    "aarch64"
                };
                let name = match distro {
                    Some(distro) => format!("mongodb-linux-{arch}-{distro}-{v}"),
                    None => format!("mongodb-linux-{arch}-{v}"),
                };
                Ok(format!("{base}/linux/{name}.tgz"))
            }
            (Os::MacOs, Arch::X86_64 | Arch::Arm64) => {
                let arch = if self.arch == Arch::X86_64 {
                    "x86_64"
                } else {
                    "arm64"
                };
                Ok(format!("{base}/osx/mongodb-macos-{arch}-{v}.tgz"))
            }
            (Os::Windows, Arch::X86_64) => Ok(format!("{base}/windows/mongodb-windows-x86_64-{v}.zip")),
            _ => Err(LauncherError::UnsupportedPlatform {
                platform: self.to_string(),
            }),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let os = match self.os {
            Os::Linux => "linux",
            Os::MacOs => "macos",
            Os::Windows => "windows",
            Os::Unknown => "unknown-os",
        };
        let arch = match self.arch {
            Arch::X86_64 => "x86_64",
            Arch::Arm64 => "arm64",
            Arch::Unknown => "unknown-arch",
        };
        write!(f, "{os}-{arch}")
    }
}

/// Map the contents of `/etc/os-release` to a MongoDB Linux build target
/// such as `ubuntu2204`, `debian12` or `rhel90`.
///
/// Returns `None` for distributions without a dedicated build.
#[must_use]
pub fn linux_distro_from_os_release(content: &str) -> Option<String> {
    let field = |key: &str| {
        content.lines().find_map(|line| {
            let value = line.strip_prefix(key)?.strip_prefix('=')?;
            Some(value.trim().trim_matches('"').to_string())
        })
    };

    let id = field("ID")?.to_lowercase();
    let version = field("VERSION_ID").unwrap_or_default();
    let major = version.split('.').next().unwrap_or_default().to_string();

    match id.as_str() {
        "ubuntu" => {
            let compact = version.replace('.', "");
            (!compact.is_empty()).then(|| format!("ubuntu{compact}"))
        }
        "debian" => (!major.is_empty()).then(|| format!("debian{major}")),
        "rhel" | "centos" | "rocky" | "almalinux" | "ol" => {
            (!major.is_empty()).then(|| format!("rhel{major}0"))
        }
        "amzn" => match major.as_str() {
            "2" => Some("amazon2".to_string()),
            "2023" => Some("amazon2023".to_string()),
            _ => None,
        },
        "sles" | "opensuse-leap" => (!major.is_empty()).then(|| format!("suse{major}")),
        _ => None,
    }
}

/// Detect the Linux build target of the running system.
#[must_use]
pub fn detect_linux_distro() -> Option<String> {
    if Platform::current().os != Os::Linux {
        return None;
    }
    std::fs::read_to_string("/etc/os-release")
        .ok()
        .and_then(|content| linux_distro_from_os_release(&content))
}

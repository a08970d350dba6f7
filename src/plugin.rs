//! Plugin identity and the capability gate.
//!
//! Every plugin variant (filesystem extractor, standalone extractor,
//! detector) shares the same identity: a process-unique name, an integer
//! version, and the [`Capabilities`] it requires from the host. The gate
//! compares those requirements against the host's capabilities and excludes
//! plugins that cannot run, before any extraction starts.
//!
//! # Example
//!
//! ```
//! use hostscan::plugin::{Capabilities, Os};
//!
//! let host = Capabilities::running_host();
//! assert!(host.direct_fs);
//! assert_ne!(host.os, Os::Any);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ScanError;

/// Operating system tag used both for host identification and plugin
/// requirements. `Any` only appears in requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    /// No OS requirement.
    Any,
    Linux,
    #[serde(rename = "mac")]
    MacOs,
    Windows,
    /// Host OS could not be identified.
    Unknown,
}

impl Os {
    /// Returns the OS tag of the compilation target.
    pub fn current() -> Self {
        if cfg!(target_os = "linux") {
            Os::Linux
        } else if cfg!(target_os = "macos") {
            Os::MacOs
        } else if cfg!(target_os = "windows") {
            Os::Windows
        } else {
            Os::Unknown
        }
    }
}

/// Host properties a plugin may depend on.
///
/// As a plugin requirement, each field names something the plugin needs:
/// `network: true` means the plugin makes network calls, `running_system:
/// true` means it only works against the live host rather than a mounted
/// image. As a host description, each field names what the runtime
/// environment provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Required/available operating system.
    pub os: Os,
    /// Whether network access is required/allowed.
    pub network: bool,
    /// Whether direct filesystem access is required/available.
    pub direct_fs: bool,
    /// Whether the scan must target/targets the running system.
    pub running_system: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            os: Os::Any,
            network: false,
            direct_fs: false,
            running_system: false,
        }
    }
}

impl Capabilities {
    /// Capabilities of the host when scanning the live system directly, the
    /// way the CLI binary runs: everything is available.
    pub fn running_host() -> Self {
        Self {
            os: Os::current(),
            network: true,
            direct_fs: true,
            running_system: true,
        }
    }
}

/// Identity shared by all plugin variants.
///
/// Names are unique across the process and stable across releases; they are
/// what configuration, error trails, and detector requirements refer to.
pub trait Plugin: Send + Sync {
    /// Stable, process-unique plugin name, e.g. `os/homebrew`.
    fn name(&self) -> &'static str;

    /// Plugin version, bumped on behavior changes.
    fn version(&self) -> i32;

    /// Host capabilities this plugin requires.
    fn requirements(&self) -> Capabilities;
}

/// Checks a plugin's requirements against the host capabilities.
///
/// # Errors
///
/// Returns [`ScanError::IncompatibleCapability`] naming the first unmet
/// requirement.
pub fn validate_requirements(plugin: &dyn Plugin, host: &Capabilities) -> Result<(), ScanError> {
    let required = plugin.requirements();
    let fail = |reason: &str| {
        Err(ScanError::IncompatibleCapability {
            plugin: plugin.name().to_string(),
            reason: reason.to_string(),
        })
    };

    if required.os != Os::Any && required.os != host.os {
        return fail("unsupported operating system");
    }
    if required.network && !host.network {
        return fail("network access denied");
    }
    if required.direct_fs && !host.direct_fs {
        return fail("direct filesystem access unavailable");
    }
    if required.running_system && !host.running_system {
        return fail("scan target is not the running system");
    }
    Ok(())
}

/// Keeps only the plugins whose requirements the host satisfies.
///
/// Ordering is preserved and the operation is idempotent: filtering an
/// already-filtered list is a no-op.
pub fn filter_by_capabilities<P: Plugin>(plugins: Vec<P>, host: &Capabilities) -> Vec<P> {
    plugins
        .into_iter()
        .filter(|p| validate_requirements(p, host).is_ok())
        .collect()
}

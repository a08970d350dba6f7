//! Engine error types.
//!
//! [`ScanError`] is the closed set of errors the engine itself can surface.
//! Configuration-group errors (bad flag combinations, unknown plugins,
//! capability mismatches, paths outside every scan root) are returned to the
//! caller before any extraction starts. `InodeBudgetExceeded` and `Cancelled`
//! are terminal: they abort the walk and the scan returns with whatever
//! inventory was accumulated up to that point.
//!
//! Per-file I/O failures and errors returned by individual plugins are *not*
//! represented here; they are recorded in per-plugin error trails and end up
//! in [`PluginStatus`](crate::model::PluginStatus), never aborting a run.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the scan engine.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Invalid configuration: bad flag combination, unknown plugin name,
    /// uncompilable regex, or an unsupported output format tag.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A plugin's capability requirements cannot be met by this host.
    #[error("plugin {plugin} cannot run on this host: {reason}")]
    IncompatibleCapability { plugin: String, reason: String },

    /// A detector's required extractor is not part of the configured set.
    #[error("extractor {extractor} must be enabled for detector {detector} to run")]
    MissingExtractor { detector: String, extractor: String },

    /// A file or skip-directory is not under any of the scan roots.
    #[error("path {0} is not relative to any of the scan roots")]
    NotRelativeToScanRoots(PathBuf),

    /// The walker observed more filesystem entries than allowed.
    #[error("max inodes ({0}) exceeded")]
    InodeBudgetExceeded(u64),

    /// The scan context was cancelled or its deadline passed.
    #[error("scan cancelled")]
    Cancelled,

    /// An I/O failure outside the per-file tolerance paths, e.g. while
    /// resolving a scan root.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ScanError>;

/// True if the error is a permission failure. The walker logs these at debug
/// level: scanning a whole host always trips over unreadable directories and
/// they must not drown out real errors.
pub fn is_permission_error(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::PermissionDenied
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = ScanError::Configuration("bad flag".into());
        assert_eq!(err.to_string(), "configuration error: bad flag");

        let err = ScanError::MissingExtractor {
            detector: "vuln/openssl".into(),
            extractor: "os/homebrew".into(),
        };
        assert!(err.to_string().contains("os/homebrew"));
        assert!(err.to_string().contains("vuln/openssl"));

        let err = ScanError::InodeBudgetExceeded(2);
        assert_eq!(err.to_string(), "max inodes (2) exceeded");
    }

    #[test]
    fn test_permission_classification() {
        let denied = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        let missing = std::io::Error::from(std::io::ErrorKind::NotFound);
        assert!(is_permission_error(&denied));
        assert!(!is_permission_error(&missing));
    }
}

//! Platform-specific defaults for scan roots and ignored directories.

use std::path::PathBuf;

use crate::error::{Result, ScanError};
use crate::root::ScanRoot;

/// Computes the default scan roots when none are configured.
///
/// On Unix-like hosts this is the single root `/`. On Windows it is `C:\`,
/// or every mounted drive when `all_drives` is set.
///
/// # Errors
///
/// `all_drives` is a Windows-only option and is rejected elsewhere.
pub fn default_scan_roots(all_drives: bool) -> Result<Vec<ScanRoot>> {
    if all_drives && !cfg!(target_os = "windows") {
        return Err(ScanError::Configuration(
            "scanning all drives is only supported on Windows".into(),
        ));
    }

    if cfg!(target_os = "windows") {
        let drives = if all_drives {
            mounted_drives()
        } else {
            vec![PathBuf::from("C:\\")]
        };
        return drives.into_iter().map(ScanRoot::new).collect();
    }

    Ok(vec![ScanRoot::new("/")?])
}

/// Enumerates mounted drive roots by probing drive letters.
fn mounted_drives() -> Vec<PathBuf> {
    (b'A'..=b'Z')
        .map(|letter| PathBuf::from(format!("{}:\\", letter as char)))
        .filter(|p| p.exists())
        .collect()
}

/// Directories that are never worth walking: virtual filesystems whose
/// pseudo-files stall reads or recurse infinitely.
///
/// Only entries that actually fall under one of the scan roots are returned,
/// so scans anchored below them are unaffected.
pub fn default_ignored_dirs(roots: &[ScanRoot]) -> Vec<PathBuf> {
    let candidates: &[&str] = if cfg!(target_os = "windows") {
        &[]
    } else {
        &["/proc", "/sys", "/dev"]
    };

    candidates
        .iter()
        .map(PathBuf::from)
        .filter(|c| roots.iter().any(|r| c.starts_with(r.path())))
        .collect()
}

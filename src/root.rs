//! Scan roots and path resolution.
//!
//! A [`ScanRoot`] anchors one filesystem walk: an absolute, lexically
//! normalized directory path. User-supplied candidate paths (files to
//! extract, directories to skip) are validated against the root list and
//! rewritten relative to the first root that contains them; the relativized
//! form is what the walker compares against.
//!
//! Multiple roots may be configured. A later root that is a subdirectory of
//! an earlier one is permitted, but any candidate path is attributed to the
//! first matching root.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanError};

/// An absolute directory path anchoring one filesystem walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRoot {
    path: PathBuf,
}

impl ScanRoot {
    /// Builds a scan root from a user-supplied path, making it absolute
    /// (against the current directory) and lexically normalized.
    ///
    /// # Errors
    ///
    /// Fails only when the current directory cannot be determined for a
    /// relative input.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            path: absolutize(path.as_ref())?,
        })
    }

    /// The absolute root path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolves a walk-relative path back to an absolute one under this root.
    pub fn join(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.path.join(rel)
    }
}

/// Makes `path` absolute and resolves `.` and `..` lexically, without
/// touching the filesystem. Skip directories may name paths that do not
/// exist, so symlink-resolving canonicalization is deliberately not used.
pub fn absolutize(path: &Path) -> Result<PathBuf> {
    let abs = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut out = PathBuf::new();
    for component in abs.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    Ok(out)
}

/// Attributes `path` to the first root containing it, returning the root's
/// index and the path made relative to it.
///
/// Containment is component-wise on the normalized absolute forms, so
/// `/opt/app` never claims `/opt/app-data`.
///
/// # Errors
///
/// [`ScanError::NotRelativeToScanRoots`] when no root contains the path.
pub fn attribute(path: &Path, roots: &[ScanRoot]) -> Result<(usize, PathBuf)> {
    let abs = absolutize(path)?;
    for (idx, root) in roots.iter().enumerate() {
        if let Ok(rel) = abs.strip_prefix(root.path()) {
            return Ok((idx, rel.to_path_buf()));
        }
    }
    Err(ScanError::NotRelativeToScanRoots(abs))
}

/// Returns `path` relative to the first root containing it.
///
/// # Errors
///
/// [`ScanError::NotRelativeToScanRoots`] when no root contains the path.
pub fn relativize(path: &Path, roots: &[ScanRoot]) -> Result<PathBuf> {
    attribute(path, roots).map(|(_, rel)| rel)
}

/// Relativizes every candidate, failing on the first one outside all roots.
pub fn relativize_all(paths: &[PathBuf], roots: &[ScanRoot]) -> Result<Vec<PathBuf>> {
    paths.iter().map(|p| relativize(p, roots)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roots(paths: &[&str]) -> Vec<ScanRoot> {
        paths.iter().map(|p| ScanRoot::new(p).unwrap()).collect()
    }

    #[test]
    fn test_absolutize_resolves_dots() {
        let p = absolutize(Path::new("/a/b/../c/./d")).unwrap();
        assert_eq!(p, PathBuf::from("/a/c/d"));
    }

    #[test]
    fn test_absolutize_relative_uses_cwd() {
        let p = absolutize(Path::new("some/dir")).unwrap();
        assert!(p.is_absolute());
        assert!(p.ends_with("some/dir"));
    }

    #[test]
    fn test_relativize_first_matching_root_wins() {
        let roots = roots(&["/scan/a", "/scan"]);
        let rel = relativize(Path::new("/scan/a/x/y"), &roots).unwrap();
        assert_eq!(rel, PathBuf::from("x/y"));
    }

    #[test]
    fn test_attribute_returns_first_root_index() {
        let roots = roots(&["/scan/a", "/scan"]);
        let (idx, rel) = attribute(Path::new("/scan/b/file"), &roots).unwrap();
        assert_eq!(idx, 1);
        assert_eq!(rel, PathBuf::from("b/file"));
    }

    #[test]
    fn test_relativize_rejects_outside_paths() {
        let roots = roots(&["/scan/a"]);
        let err = relativize(Path::new("/other/place"), &roots).unwrap_err();
        assert!(matches!(err, ScanError::NotRelativeToScanRoots(_)));
    }

    #[test]
    fn test_relativize_is_component_wise() {
        // /scan/a is not a prefix of /scan/abc.
        let roots = roots(&["/scan/a"]);
        assert!(relativize(Path::new("/scan/abc/file"), &roots).is_err());
    }

    #[test]
    fn test_relativize_root_itself_is_empty() {
        let roots = roots(&["/scan/a"]);
        let rel = relativize(Path::new("/scan/a"), &roots).unwrap();
        assert_eq!(rel, PathBuf::new());
    }

    #[test]
    fn test_relativize_all_surfaces_offender() {
        let roots = roots(&["/scan"]);
        let paths = vec![PathBuf::from("/scan/ok"), PathBuf::from("/elsewhere")];
        match relativize_all(&paths, &roots) {
            Err(ScanError::NotRelativeToScanRoots(p)) => {
                assert_eq!(p, PathBuf::from("/elsewhere"));
            }
            other => panic!("expected NotRelativeToScanRoots, got {other:?}"),
        }
    }
}

//! Filesystem inventory extraction plugins.
//!
//! A [`FilesystemExtractor`] does not traverse the filesystem itself; the
//! walker does that and asks each extractor, per observed file, whether the
//! file is relevant ([`file_required`](FilesystemExtractor::file_required)).
//! Relevant files are opened by the engine and handed to
//! [`extract`](FilesystemExtractor::extract) as a [`ScanInput`].
//!
//! # Available extractors
//!
//! | Name | Recognizes |
//! |------|------------|
//! | `os/homebrew` | Homebrew cellar receipts and cask wrappers |
//! | `javascript/packagejson` | Node `package.json` manifests |
//!
//! Standalone extractors, which query the live system instead of consuming
//! walk output, live in [`standalone`].

pub mod homebrew;
pub mod packagejson;
pub mod standalone;

use std::fs::Metadata;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::context::ScanContext;
use crate::model::Inventory;
use crate::plugin::{Capabilities, Plugin};

/// One file to extract from, as handed to a filesystem extractor.
///
/// The reader is owned by the engine: it is opened before the extract call
/// and closed after it returns, on success and failure alike.
pub struct ScanInput<'a> {
    /// Path of the file, relative to the scan root.
    pub path: PathBuf,
    /// Absolute path of the scan root the walk started from.
    pub root: PathBuf,
    /// Metadata obtained through the open handle.
    pub info: Metadata,
    /// Contents of the file.
    pub reader: &'a mut (dyn std::io::Read + Send),
}

/// Error returned by an extract call.
///
/// Extraction can fail halfway through a file and still have produced usable
/// records; `partial` carries those and the engine keeps them while recording
/// `source` in the plugin's error trail.
#[derive(Debug)]
pub struct ExtractorError {
    /// Inventory produced before the failure. Usually empty.
    pub partial: Vec<Inventory>,
    pub source: anyhow::Error,
}

impl ExtractorError {
    /// An error that still hands back the inventory extracted so far.
    pub fn with_partial(partial: Vec<Inventory>, source: anyhow::Error) -> Self {
        Self { partial, source }
    }
}

impl std::fmt::Display for ExtractorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#}", self.source)
    }
}

impl From<anyhow::Error> for ExtractorError {
    fn from(source: anyhow::Error) -> Self {
        Self {
            partial: Vec::new(),
            source,
        }
    }
}

pub type ExtractResult = Result<Vec<Inventory>, ExtractorError>;

/// A plugin that extracts inventory from files observed by the walker.
#[async_trait]
pub trait FilesystemExtractor: Plugin {
    /// Whether the file described by `path` and `info` is relevant for this
    /// extractor. Called for every observed file; must be cheap.
    fn file_required(&self, path: &Path, info: &Metadata) -> bool;

    /// Extracts inventory from one relevant file.
    ///
    /// # Errors
    ///
    /// Errors are recorded in the plugin's error trail and never abort the
    /// walk. Return [`ExtractorError::with_partial`] to keep records
    /// produced before the failure.
    async fn extract(&self, ctx: &ScanContext, input: &mut ScanInput<'_>) -> ExtractResult;
}

impl Plugin for Box<dyn FilesystemExtractor> {
    fn name(&self) -> &'static str {
        self.as_ref().name()
    }
    fn version(&self) -> i32 {
        self.as_ref().version()
    }
    fn requirements(&self) -> Capabilities {
        self.as_ref().requirements()
    }
}

/// Returns every filesystem extractor known to this build.
pub fn all_filesystem_extractors() -> Vec<Box<dyn FilesystemExtractor>> {
    vec![
        Box::new(homebrew::HomebrewExtractor::default()),
        Box::new(packagejson::PackageJsonExtractor),
    ]
}

/// Looks up one filesystem extractor by its stable name.
pub fn filesystem_extractor_from_name(name: &str) -> Option<Box<dyn FilesystemExtractor>> {
    all_filesystem_extractors()
        .into_iter()
        .find(|e| e.as_ref().name() == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_names_are_unique() {
        let mut names: Vec<_> = all_filesystem_extractors()
            .iter()
            .map(|e| e.as_ref().name())
            .collect();
        let before = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), before);
    }

    #[test]
    fn test_lookup_by_name() {
        assert!(filesystem_extractor_from_name("os/homebrew").is_some());
        assert!(filesystem_extractor_from_name("no/such").is_none());
    }
}

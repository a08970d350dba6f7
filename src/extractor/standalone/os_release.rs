//! Standalone extractor for the running system's OS release identity.

use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;

use crate::context::ScanContext;
use crate::extractor::standalone::StandaloneExtractor;
use crate::model::Inventory;
use crate::plugin::{Capabilities, Os, Plugin};

const DEFAULT_PATH: &str = "/etc/os-release";

/// Reports the host distribution as one inventory record, parsed from the
/// live system's `os-release` file.
#[derive(Debug)]
pub struct OsReleaseExtractor {
    path: PathBuf,
}

impl Default for OsReleaseExtractor {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_PATH),
        }
    }
}

impl OsReleaseExtractor {
    /// Reads from a non-standard location. Used by tests.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Plugin for OsReleaseExtractor {
    fn name(&self) -> &'static str {
        "os/os-release"
    }

    fn version(&self) -> i32 {
        0
    }

    fn requirements(&self) -> Capabilities {
        Capabilities {
            os: Os::Linux,
            direct_fs: true,
            running_system: true,
            ..Capabilities::default()
        }
    }
}

#[async_trait]
impl StandaloneExtractor for OsReleaseExtractor {
    async fn extract(&self, _ctx: &ScanContext) -> anyhow::Result<Vec<Inventory>> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;

        let mut id = None;
        let mut version_id = None;
        for line in content.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches('"');
            match key.trim() {
                "ID" => id = Some(value.to_string()),
                "VERSION_ID" => version_id = Some(value.to_string()),
                _ => {}
            }
        }

        let Some(id) = id else {
            return Ok(Vec::new());
        };
        Ok(vec![Inventory::new(id, version_id, [self.path.clone()])])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_extract_parses_id_and_version() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            "NAME=\"Debian GNU/Linux\"\nID=debian\nVERSION_ID=\"12\"\n",
        )
        .unwrap();

        let ex = OsReleaseExtractor::with_path(file.path());
        let inventory = ex.extract(&ScanContext::new()).await.unwrap();

        assert_eq!(inventory.len(), 1);
        assert_eq!(inventory[0].name, "debian");
        assert_eq!(inventory[0].version.as_deref(), Some("12"));
    }

    #[tokio::test]
    async fn test_extract_without_id_yields_nothing() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "PRETTY_NAME=\"mystery\"\n").unwrap();

        let ex = OsReleaseExtractor::with_path(file.path());
        assert!(ex.extract(&ScanContext::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let ex = OsReleaseExtractor::with_path("/no/such/os-release");
        assert!(ex.extract(&ScanContext::new()).await.is_err());
    }
}

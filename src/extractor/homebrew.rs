//! Extracts package information from Homebrew install paths.
//!
//! Homebrew leaves a recognizable trail per installed package:
//! `../Cellar/<name>/<version>/INSTALL_RECEIPT.json` for formulae and
//! `../Caskroom/<name>/<version>/<name>.wrapper.sh` for casks. Name and
//! version come from the path itself; the file contents are not parsed.

use std::fs::Metadata;
use std::path::Path;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::context::ScanContext;
use crate::extractor::{ExtractResult, FilesystemExtractor, ScanInput};
use crate::model::Inventory;
use crate::plugin::{Capabilities, Os, Plugin};

const CELLAR_DIR: &str = "cellar";
const CASKROOM_DIR: &str = "caskroom";
const CELLAR_FILE: &str = "install_receipt.json";
const CASK_FILE_SUFFIX: &str = ".wrapper.sh";

static BREW_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(cellar|caskroom)/\w+/[^a-z /]+/(install_receipt\.json|\w+\.wrapper\.sh)")
        .expect("static pattern")
});

/// Name, version, and file components of a Homebrew package path.
struct BrewPath {
    name: String,
    version: String,
    file: String,
}

impl BrewPath {
    /// Splits a lowercased brew path into its trailing three components.
    fn split(path: &str) -> Option<Self> {
        let mut parts = path.rsplit('/');
        let file = parts.next()?.to_string();
        let version = parts.next()?.to_string();
        let name = parts.next()?.to_string();
        Some(Self { name, version, file })
    }
}

#[derive(Debug, Default)]
pub struct HomebrewExtractor;

impl Plugin for HomebrewExtractor {
    fn name(&self) -> &'static str {
        "os/homebrew"
    }

    fn version(&self) -> i32 {
        0
    }

    fn requirements(&self) -> Capabilities {
        Capabilities {
            os: Os::MacOs,
            ..Capabilities::default()
        }
    }
}

#[async_trait]
impl FilesystemExtractor for HomebrewExtractor {
    fn file_required(&self, path: &Path, _info: &Metadata) -> bool {
        let lower = path.to_string_lossy().replace('\\', "/").to_lowercase();
        if !BREW_PATH.is_match(&lower) {
            return false;
        }
        let Some(brew) = BrewPath::split(&lower) else {
            return false;
        };
        if lower.contains(CELLAR_DIR) && brew.file != CELLAR_FILE {
            return false;
        }
        if lower.contains(CASKROOM_DIR) && brew.file != format!("{}{}", brew.name, CASK_FILE_SUFFIX)
        {
            return false;
        }
        true
    }

    async fn extract(&self, _ctx: &ScanContext, input: &mut ScanInput<'_>) -> ExtractResult {
        let lower = input.path.to_string_lossy().replace('\\', "/").to_lowercase();
        let brew = BrewPath::split(&lower).ok_or_else(|| {
            anyhow::anyhow!("path {} has too few components", input.path.display())
        })?;
        Ok(vec![Inventory::new(
            brew.name,
            Some(brew.version),
            [input.path.clone()],
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    fn meta() -> Metadata {
        NamedTempFile::new().unwrap().as_file().metadata().unwrap()
    }

    #[test]
    fn test_file_required_cellar_receipt() {
        let ex = HomebrewExtractor;
        let info = meta();
        assert!(ex.file_required(
            Path::new("Cellar/tree/1.1/INSTALL_RECEIPT.json"),
            &info
        ));
        assert!(ex.file_required(
            Path::new("usr/local/cellar/wget/1.21.4/install_receipt.json"),
            &info
        ));
    }

    #[test]
    fn test_file_required_cask_wrapper() {
        let ex = HomebrewExtractor;
        let info = meta();
        assert!(ex.file_required(
            Path::new("Caskroom/firefox/1.1/firefox.wrapper.sh"),
            &info
        ));
        // Wrapper name must match the cask name.
        assert!(!ex.file_required(
            Path::new("Caskroom/firefox/1.1/other.wrapper.sh"),
            &info
        ));
    }

    #[test]
    fn test_file_required_rejects_other_files() {
        let ex = HomebrewExtractor;
        let info = meta();
        assert!(!ex.file_required(Path::new("cellar/tree/1.1/README.md"), &info));
        assert!(!ex.file_required(Path::new("opt/tree/bin/tree"), &info));
        // Version segment may not contain letters.
        assert!(!ex.file_required(
            Path::new("cellar/tree/latest/install_receipt.json"),
            &info
        ));
    }

    #[tokio::test]
    async fn test_extract_parses_path_components() {
        let ex = HomebrewExtractor;
        let mut reader: &[u8] = b"{}";
        let mut input = ScanInput {
            path: PathBuf::from("Cellar/Tree/1.1/INSTALL_RECEIPT.json"),
            root: PathBuf::from("/scan"),
            info: meta(),
            reader: &mut reader,
        };
        let inventory = ex.extract(&ScanContext::new(), &mut input).await.unwrap();

        assert_eq!(inventory.len(), 1);
        assert_eq!(inventory[0].name, "tree");
        assert_eq!(inventory[0].version.as_deref(), Some("1.1"));
        assert_eq!(
            inventory[0].locations,
            vec![PathBuf::from("Cellar/Tree/1.1/INSTALL_RECEIPT.json")]
        );
    }
}

//! User-facing scan options.
//!
//! [`Settings`] is the flat option set recognized by hostscan, loadable from
//! a TOML file and overridable by CLI flags. [`Settings::build`] turns it
//! into a fully resolved [`ScanConfig`]: plugin names are looked up, the
//! skip regex is compiled, scan roots are resolved, the capability gate is
//! applied, and detector prerequisites are checked — all before any
//! extraction starts.
//!
//! # Example configuration
//!
//! ```toml
//! scan_roots = ["/"]
//! filesystem_extractors = ["os/homebrew", "javascript/packagejson"]
//! detectors = ["vuln/openssl"]
//! skip_dir_regex = "(^|/)\\.git$"
//! max_inodes = 10000000
//! filter_by_capabilities = true
//!
//! [spdx]
//! document_name = "acme-fleet-host"
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::detector::{self, Detector};
use crate::engine::ScanConfig;
use crate::error::{Result, ScanError};
use crate::extractor::standalone::{self, StandaloneExtractor};
use crate::extractor::{self, FilesystemExtractor};
use crate::platform;
use crate::plugin::{filter_by_capabilities, Capabilities};
use crate::root::{absolutize, ScanRoot};
use crate::stats::NoopCollector;

/// SPDX document metadata for the SPDX output formats.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpdxConfig {
    pub document_name: Option<String>,
    pub document_namespace: Option<String>,
    /// `Type:Name` entries, e.g. `Organization:ACME`.
    pub creators: Vec<String>,
}

/// CycloneDX document metadata for the CDX output formats.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CdxConfig {
    pub component_name: Option<String>,
    pub component_version: Option<String>,
    pub authors: Vec<String>,
}

/// Every option a scan recognizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Roots to traverse; empty means the platform default.
    pub scan_roots: Vec<PathBuf>,

    /// Windows only: scan every mounted drive. Illegal together with
    /// explicit `scan_roots`.
    pub all_drives: bool,

    /// Filesystem extractors to run, by name.
    pub filesystem_extractors: Vec<String>,

    /// Standalone extractors to run, by name.
    pub standalone_extractors: Vec<String>,

    /// Detectors to run, by name.
    pub detectors: Vec<String>,

    /// When non-empty, only these files are stat'ed and dispatched; the
    /// tree walk is skipped. Each must lie under some scan root.
    pub files_to_extract: Vec<PathBuf>,

    /// Directory subtrees to prune. Each must lie under some scan root.
    pub dirs_to_skip: Vec<PathBuf>,

    /// Directories matching this regex are pruned as well.
    pub skip_dir_regex: Option<String>,

    /// Follow and dispatch symlinked files.
    pub read_symlinks: bool,

    /// Upper bound on observed filesystem entries across all roots;
    /// 0 disables the budget.
    pub max_inodes: u64,

    /// Store inventory locations as absolute paths.
    pub store_absolute_path: bool,

    /// Exclude plugins whose capability requirements this host cannot meet.
    pub filter_by_capabilities: bool,

    /// Require every detector's extractor prerequisites to be configured.
    pub explicit_extractors: bool,

    pub spdx: SpdxConfig,
    pub cdx: CdxConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scan_roots: Vec::new(),
            all_drives: false,
            filesystem_extractors: extractor::all_filesystem_extractors()
                .iter()
                .map(|e| e.as_ref().name().to_string())
                .collect(),
            standalone_extractors: standalone::all_standalone_extractors()
                .iter()
                .map(|e| e.as_ref().name().to_string())
                .collect(),
            detectors: Vec::new(),
            files_to_extract: Vec::new(),
            dirs_to_skip: Vec::new(),
            skip_dir_regex: None,
            read_symlinks: false,
            max_inodes: 0,
            store_absolute_path: false,
            filter_by_capabilities: false,
            explicit_extractors: false,
            spdx: SpdxConfig::default(),
            cdx: CdxConfig::default(),
        }
    }
}

impl Settings {
    /// Loads settings from a TOML file.
    ///
    /// # Errors
    ///
    /// [`ScanError::Configuration`] when the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|err| {
            ScanError::Configuration(format!("reading {}: {err}", path.display()))
        })?;
        toml::from_str(&content).map_err(|err| {
            ScanError::Configuration(format!("parsing {}: {err}", path.display()))
        })
    }

    /// Checks option combinations that need no plugin resolution.
    ///
    /// # Errors
    ///
    /// [`ScanError::Configuration`] on a bad combination or an uncompilable
    /// regex.
    pub fn validate(&self) -> Result<()> {
        if self.all_drives && !self.scan_roots.is_empty() {
            return Err(ScanError::Configuration(
                "scan_roots and all_drives cannot be used together".into(),
            ));
        }
        if let Some(pattern) = &self.skip_dir_regex {
            Regex::new(pattern).map_err(|err| {
                ScanError::Configuration(format!("skip_dir_regex: {err}"))
            })?;
        }
        Ok(())
    }

    /// Resolves the settings into a runnable [`ScanConfig`].
    ///
    /// # Errors
    ///
    /// [`ScanError::Configuration`] for unknown plugin names and bad flag
    /// combinations, [`ScanError::MissingExtractor`] when explicit-extractor
    /// mode finds an unmet detector prerequisite.
    pub fn build(&self, capabilities: Capabilities) -> Result<ScanConfig> {
        self.validate()?;

        let scan_roots = if self.scan_roots.is_empty() {
            platform::default_scan_roots(self.all_drives)?
        } else {
            self.scan_roots
                .iter()
                .map(ScanRoot::new)
                .collect::<Result<Vec<_>>>()?
        };

        let mut filesystem_extractors: Vec<Box<dyn FilesystemExtractor>> = self
            .filesystem_extractors
            .iter()
            .map(|name| {
                extractor::filesystem_extractor_from_name(name).ok_or_else(|| {
                    ScanError::Configuration(format!("unknown filesystem extractor {name}"))
                })
            })
            .collect::<Result<_>>()?;
        let mut standalone_extractors: Vec<Box<dyn StandaloneExtractor>> = self
            .standalone_extractors
            .iter()
            .map(|name| {
                standalone::standalone_extractor_from_name(name).ok_or_else(|| {
                    ScanError::Configuration(format!("unknown standalone extractor {name}"))
                })
            })
            .collect::<Result<_>>()?;
        let mut detectors: Vec<Box<dyn Detector>> = self
            .detectors
            .iter()
            .map(|name| {
                detector::detector_from_name(name)
                    .ok_or_else(|| ScanError::Configuration(format!("unknown detector {name}")))
            })
            .collect::<Result<_>>()?;

        if self.filter_by_capabilities {
            filesystem_extractors = filter_by_capabilities(filesystem_extractors, &capabilities);
            standalone_extractors = filter_by_capabilities(standalone_extractors, &capabilities);
            detectors = filter_by_capabilities(detectors, &capabilities);
        }

        if self.explicit_extractors {
            let configured: HashSet<String> = filesystem_extractors
                .iter()
                .map(|e| e.as_ref().name().to_string())
                .chain(
                    standalone_extractors
                        .iter()
                        .map(|e| e.as_ref().name().to_string()),
                )
                .collect();
            detector::validate_required_extractors(&detectors, &configured)?;
        }

        let skip_dir_regex = match &self.skip_dir_regex {
            Some(pattern) => Some(Regex::new(pattern).map_err(|err| {
                ScanError::Configuration(format!("skip_dir_regex: {err}"))
            })?),
            None => None,
        };

        // User-supplied skip dirs are validated against the roots by the
        // engine; the built-in ignores are pre-filtered because they only
        // apply when a root actually contains them.
        let mut dirs_to_skip = self
            .dirs_to_skip
            .iter()
            .map(|p| absolutize(p))
            .collect::<Result<Vec<_>>>()?;
        dirs_to_skip.extend(platform::default_ignored_dirs(&scan_roots));

        let files_to_extract = self
            .files_to_extract
            .iter()
            .map(|p| absolutize(p))
            .collect::<Result<Vec<_>>>()?;

        Ok(ScanConfig {
            scan_roots,
            filesystem_extractors,
            standalone_extractors,
            detectors,
            capabilities,
            files_to_extract,
            dirs_to_skip,
            skip_dir_regex,
            read_symlinks: self.read_symlinks,
            max_inodes: self.max_inodes,
            store_absolute_path: self.store_absolute_path,
            stats: Arc::new(NoopCollector),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::Os;

    fn linux_host() -> Capabilities {
        Capabilities {
            os: Os::Linux,
            network: true,
            direct_fs: true,
            running_system: true,
        }
    }

    fn base() -> Settings {
        Settings {
            scan_roots: vec![PathBuf::from("/tmp")],
            ..Settings::default()
        }
    }

    #[test]
    fn test_default_settings_build() {
        let config = base().build(linux_host()).unwrap();
        assert_eq!(config.filesystem_extractors.len(), 2);
        assert_eq!(config.standalone_extractors.len(), 1);
        assert!(config.detectors.is_empty());
    }

    #[test]
    fn test_all_drives_conflicts_with_roots() {
        let settings = Settings {
            all_drives: true,
            ..base()
        };
        assert!(matches!(
            settings.build(linux_host()),
            Err(ScanError::Configuration(_))
        ));
    }

    #[test]
    fn test_unknown_plugin_name() {
        let settings = Settings {
            filesystem_extractors: vec!["no/such".into()],
            ..base()
        };
        let err = settings.build(linux_host()).unwrap_err();
        assert!(err.to_string().contains("no/such"));
    }

    #[test]
    fn test_bad_regex_is_config_error() {
        let settings = Settings {
            skip_dir_regex: Some("(unclosed".into()),
            ..base()
        };
        assert!(matches!(
            settings.validate(),
            Err(ScanError::Configuration(_))
        ));
    }

    #[test]
    fn test_explicit_extractors_requires_prerequisites() {
        let settings = Settings {
            filesystem_extractors: vec![],
            standalone_extractors: vec![],
            detectors: vec!["vuln/openssl".into()],
            explicit_extractors: true,
            ..base()
        };
        match settings.build(linux_host()) {
            Err(ScanError::MissingExtractor { detector, extractor }) => {
                assert_eq!(detector, "vuln/openssl");
                assert_eq!(extractor, "os/homebrew");
            }
            other => panic!("expected MissingExtractor, got {other:?}"),
        }
    }

    #[test]
    fn test_implicit_mode_tolerates_missing_prerequisites() {
        let settings = Settings {
            filesystem_extractors: vec![],
            standalone_extractors: vec![],
            detectors: vec!["vuln/openssl".into()],
            explicit_extractors: false,
            ..base()
        };
        let config = settings.build(linux_host()).unwrap();
        assert_eq!(config.detectors.len(), 1);
    }

    #[test]
    fn test_capability_filter_excludes_foreign_plugins() {
        // os/homebrew requires macOS; a Linux host drops it when gating is on.
        let settings = Settings {
            filter_by_capabilities: true,
            ..base()
        };
        let config = settings.build(linux_host()).unwrap();
        let names: Vec<_> = config
            .filesystem_extractors
            .iter()
            .map(|e| e.as_ref().name())
            .collect();
        assert_eq!(names, vec!["javascript/packagejson"]);
    }

    #[test]
    fn test_gating_interacts_with_explicit_mode() {
        let settings = Settings {
            detectors: vec!["vuln/openssl".into()],
            filter_by_capabilities: true,
            explicit_extractors: true,
            ..base()
        };
        // Gating removes os/homebrew on Linux, so the explicit check fails.
        assert!(matches!(
            settings.build(linux_host()),
            Err(ScanError::MissingExtractor { .. })
        ));
    }

    #[test]
    fn test_load_roundtrip() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            "scan_roots = [\"/srv\"]\nmax_inodes = 42\n\n[spdx]\ndocument_name = \"srv\"\n",
        )
        .unwrap();

        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings.scan_roots, vec![PathBuf::from("/srv")]);
        assert_eq!(settings.max_inodes, 42);
        assert_eq!(settings.spdx.document_name.as_deref(), Some("srv"));
        // Unspecified options keep their defaults.
        assert_eq!(settings.filesystem_extractors.len(), 2);
    }

    #[test]
    fn test_load_rejects_garbage() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "scan_roots = 3").unwrap();
        assert!(matches!(
            Settings::load(file.path()),
            Err(ScanError::Configuration(_))
        ));
    }
}

//! Detectors: plugins that consume the unified inventory and filesystem
//! state to produce findings.
//!
//! # Available detectors
//!
//! | Name | Requires | Reports |
//! |------|----------|---------|
//! | `vuln/openssl` | `os/homebrew` | end-of-life OpenSSL 1.x installs |
//! | `misconfig/world-writable` | — | world-writable files under `etc/` |

pub mod openssl;
pub mod world_writable;

use std::collections::HashMap;
use std::fs::Metadata;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use crate::context::ScanContext;
use crate::error::{Result, ScanError};
use crate::model::{Finding, Inventory};
use crate::plugin::{Capabilities, Plugin};
use crate::root::ScanRoot;

/// Read-only view of the scanned filesystem handed to detectors.
///
/// Paths are relative to a scan root; lookups resolve against the first root
/// that contains the path.
pub struct FsView<'a> {
    roots: &'a [ScanRoot],
}

impl<'a> FsView<'a> {
    pub fn new(roots: &'a [ScanRoot]) -> Self {
        Self { roots }
    }

    /// The scan roots backing this view, in configuration order.
    pub fn roots(&self) -> &[ScanRoot] {
        self.roots
    }

    /// Resolves a root-relative path against the first root containing it.
    pub fn resolve(&self, rel: impl AsRef<Path>) -> Option<PathBuf> {
        self.roots
            .iter()
            .map(|r| r.join(rel.as_ref()))
            .find(|p| p.exists())
    }

    /// Stats a root-relative path.
    pub fn metadata(&self, rel: impl AsRef<Path>) -> std::io::Result<Metadata> {
        match self.resolve(rel.as_ref()) {
            Some(abs) => std::fs::metadata(abs),
            None => Err(std::io::Error::from(std::io::ErrorKind::NotFound)),
        }
    }

    /// Opens a root-relative path for reading.
    pub fn open(&self, rel: impl AsRef<Path>) -> std::io::Result<std::fs::File> {
        match self.resolve(rel.as_ref()) {
            Some(abs) => std::fs::File::open(abs),
            None => Err(std::io::Error::from(std::io::ErrorKind::NotFound)),
        }
    }
}

/// A plugin that turns inventory and filesystem state into findings.
#[async_trait]
pub trait Detector: Plugin {
    /// Names of the extractors whose inventory this detector consumes. Under
    /// explicit-extractor mode every listed name must be configured;
    /// otherwise the detector must handle their absence itself.
    fn required_extractors(&self) -> &'static [&'static str] {
        &[]
    }

    /// Runs detection over the unified inventory.
    ///
    /// # Errors
    ///
    /// Errors are recorded in the detector's error trail and never abort the
    /// scan.
    async fn detect(
        &self,
        ctx: &ScanContext,
        fsys: &FsView<'_>,
        inventory: &[Inventory],
    ) -> anyhow::Result<Vec<Finding>>;
}

impl Plugin for Box<dyn Detector> {
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

/// Configuration-time check that every detector requirement names a
/// configured extractor.
///
/// # Errors
///
/// [`ScanError::MissingExtractor`] naming the first unmet requirement.
pub fn validate_required_extractors(
    detectors: &[Box<dyn Detector>],
    extractor_names: &std::collections::HashSet<String>,
) -> Result<()> {
    for det in detectors {
        for required in det.required_extractors() {
            if !extractor_names.contains(*required) {
                return Err(ScanError::MissingExtractor {
                    detector: det.as_ref().name().to_string(),
                    extractor: (*required).to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Runs every detector in configuration order against the merged inventory.
/// Findings are stamped with their detector and accumulated in order;
/// detector errors go to the shared error trails.
///
/// # Errors
///
/// Only cancellation is terminal.
pub(crate) async fn run_detectors(
    ctx: &ScanContext,
    detectors: &[Box<dyn Detector>],
    fsys: &FsView<'_>,
    inventory: &[Inventory],
    errors: &mut HashMap<String, Vec<String>>,
    found: &mut std::collections::HashSet<String>,
) -> Result<Vec<Finding>> {
    let mut findings = Vec::new();
    for det in detectors {
        ctx.check()?;
        let name = det.as_ref().name();
        match det.detect(ctx, fsys, inventory).await {
            Ok(batch) => {
                if !batch.is_empty() {
                    found.insert(name.to_string());
                }
                for mut finding in batch {
                    finding.detector = Some(name.to_string());
                    findings.push(finding);
                }
            }
            Err(err) => {
                errors
                    .entry(name.to_string())
                    .or_default()
                    .push(format!("{err:#}"));
            }
        }
    }
    info!(findings = findings.len(), "detection finished");
    Ok(findings)
}

/// Returns every detector known to this build.
pub fn all_detectors() -> Vec<Box<dyn Detector>> {
    vec![
        Box::new(openssl::OpensslDetector),
        Box::new(world_writable::WorldWritableDetector),
    ]
}

/// Looks up one detector by its stable name.
pub fn detector_from_name(name: &str) -> Option<Box<dyn Detector>> {
    all_detectors()
        .into_iter()
        .find(|d| d.as_ref().name() == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Advisory, Severity};
    use std::collections::HashSet;

    struct FakeDetector {
        name: &'static str,
        requires: &'static [&'static str],
        fail: bool,
    }

    impl Plugin for FakeDetector {
        fn name(&self) -> &'static str {
            self.name
        }
        fn version(&self) -> i32 {
            0
        }
        fn requirements(&self) -> Capabilities {
            Capabilities::default()
        }
    }

    #[async_trait]
    impl Detector for FakeDetector {
        fn required_extractors(&self) -> &'static [&'static str] {
            self.requires
        }

        async fn detect(
            &self,
            _ctx: &ScanContext,
            _fsys: &FsView<'_>,
            _inventory: &[Inventory],
        ) -> anyhow::Result<Vec<Finding>> {
            if self.fail {
                anyhow::bail!("rule evaluation failed");
            }
            Ok(vec![Finding::new(Advisory {
                id: format!("{}-finding", self.name),
                title: "test".into(),
                description: None,
                recommendation: None,
                severity: Severity::Low,
            })])
        }
    }

    fn boxed(dets: Vec<FakeDetector>) -> Vec<Box<dyn Detector>> {
        dets.into_iter()
            .map(|d| Box::new(d) as Box<dyn Detector>)
            .collect()
    }

    #[test]
    fn test_missing_requirement_is_rejected() {
        let detectors = boxed(vec![FakeDetector {
            name: "d",
            requires: &["extractor/e"],
            fail: false,
        }]);
        let configured = HashSet::new();
        match validate_required_extractors(&detectors, &configured) {
            Err(ScanError::MissingExtractor { detector, extractor }) => {
                assert_eq!(detector, "d");
                assert_eq!(extractor, "extractor/e");
            }
            other => panic!("expected MissingExtractor, got {other:?}"),
        }
    }

    #[test]
    fn test_satisfied_requirement_passes() {
        let detectors = boxed(vec![FakeDetector {
            name: "d",
            requires: &["extractor/e"],
            fail: false,
        }]);
        let configured: HashSet<String> = ["extractor/e".to_string()].into();
        assert!(validate_required_extractors(&detectors, &configured).is_ok());
    }

    #[tokio::test]
    async fn test_findings_keep_detector_order_and_stamp() {
        let detectors = boxed(vec![
            FakeDetector {
                name: "second",
                requires: &[],
                fail: false,
            },
            FakeDetector {
                name: "first",
                requires: &[],
                fail: false,
            },
        ]);
        let roots = [ScanRoot::new("/").unwrap()];
        let mut errors = HashMap::new();
        let mut found = HashSet::new();
        let findings = run_detectors(
            &ScanContext::new(),
            &detectors,
            &FsView::new(&roots),
            &[],
            &mut errors,
            &mut found,
        )
        .await
        .unwrap();

        let by: Vec<_> = findings
            .iter()
            .map(|f| f.detector.as_deref().unwrap())
            .collect();
        assert_eq!(by, vec!["second", "first"]);
        assert!(errors.is_empty());
        assert!(found.contains("second"));
    }

    #[tokio::test]
    async fn test_detector_error_recorded_not_fatal() {
        let detectors = boxed(vec![
            FakeDetector {
                name: "broken",
                requires: &[],
                fail: true,
            },
            FakeDetector {
                name: "ok",
                requires: &[],
                fail: false,
            },
        ]);
        let roots = [ScanRoot::new("/").unwrap()];
        let mut errors = HashMap::new();
        let mut found = HashSet::new();
        let findings = run_detectors(
            &ScanContext::new(),
            &detectors,
            &FsView::new(&roots),
            &[],
            &mut errors,
            &mut found,
        )
        .await
        .unwrap();

        assert_eq!(findings.len(), 1);
        assert!(errors["broken"][0].contains("rule evaluation failed"));
        assert!(!found.contains("broken"));
    }

    #[tokio::test]
    async fn test_cancellation_aborts_detection() {
        let detectors = boxed(vec![FakeDetector {
            name: "d",
            requires: &[],
            fail: false,
        }]);
        let ctx = ScanContext::new();
        ctx.cancel();
        let roots = [ScanRoot::new("/").unwrap()];
        let mut errors = HashMap::new();
        let mut found = HashSet::new();
        let result = run_detectors(
            &ctx,
            &detectors,
            &FsView::new(&roots),
            &[],
            &mut errors,
            &mut found,
        )
        .await;
        assert!(matches!(result, Err(ScanError::Cancelled)));
    }
}

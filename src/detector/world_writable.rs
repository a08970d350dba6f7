//! Flags world-writable files under each root's `etc/` directory. System
//! configuration writable by any local user is a privilege-escalation
//! foothold.

use async_trait::async_trait;

use crate::context::ScanContext;
use crate::detector::{Detector, FsView};
use crate::model::{Advisory, Finding, Inventory, Severity};
use crate::plugin::{Capabilities, Os, Plugin};

const ADVISORY_ID: &str = "HOSTSCAN-ETC-WORLD-WRITABLE";

#[derive(Debug, Default)]
pub struct WorldWritableDetector;

impl Plugin for WorldWritableDetector {
    fn name(&self) -> &'static str {
        "misconfig/world-writable"
    }

    fn version(&self) -> i32 {
        0
    }

    fn requirements(&self) -> Capabilities {
        Capabilities {
            os: Os::Linux,
            direct_fs: true,
            ..Capabilities::default()
        }
    }
}

#[async_trait]
impl Detector for WorldWritableDetector {
    async fn detect(
        &self,
        ctx: &ScanContext,
        fsys: &FsView<'_>,
        _inventory: &[Inventory],
    ) -> anyhow::Result<Vec<Finding>> {
        let mut findings = Vec::new();
        for scan_root in fsys.roots() {
            ctx.check()?;
            let etc = scan_root.join("etc");
            let entries = match std::fs::read_dir(&etc) {
                Ok(entries) => entries,
                // A root without etc/ simply has nothing to report.
                Err(_) => continue,
            };
            for entry in entries.flatten() {
                let Ok(metadata) = entry.metadata() else {
                    continue;
                };
                if !metadata.is_file() || !is_world_writable(&metadata) {
                    continue;
                }
                let rel = entry
                    .path()
                    .strip_prefix(scan_root.path())
                    .map(|p| p.to_path_buf())
                    .unwrap_or_else(|_| entry.path());
                findings.push(Finding::new(Advisory {
                    id: ADVISORY_ID.to_string(),
                    title: format!("{} is world-writable", rel.display()),
                    description: Some(
                        "system configuration writable by any local user".to_string(),
                    ),
                    recommendation: Some(format!("chmod o-w {}", rel.display())),
                    severity: Severity::Medium,
                }));
            }
        }
        Ok(findings)
    }
}

#[cfg(unix)]
fn is_world_writable(metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o002 != 0
}

#[cfg(not(unix))]
fn is_world_writable(_metadata: &std::fs::Metadata) -> bool {
    false
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::root::ScanRoot;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn fixture(mode: u32) -> TempDir {
        let dir = TempDir::new().unwrap();
        let etc = dir.path().join("etc");
        std::fs::create_dir(&etc).unwrap();
        let file = etc.join("rc.local");
        std::fs::write(&file, b"#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&file, std::fs::Permissions::from_mode(mode)).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_world_writable_flagged() {
        let dir = fixture(0o666);
        let roots = [ScanRoot::new(dir.path()).unwrap()];
        let findings = WorldWritableDetector
            .detect(&ScanContext::new(), &FsView::new(&roots), &[])
            .await
            .unwrap();

        assert_eq!(findings.len(), 1);
        assert!(findings[0].advisory.title.contains("etc/rc.local"));
        assert_eq!(findings[0].advisory.severity, Severity::Medium);
    }

    #[tokio::test]
    async fn test_sane_permissions_pass() {
        let dir = fixture(0o644);
        let roots = [ScanRoot::new(dir.path()).unwrap()];
        let findings = WorldWritableDetector
            .detect(&ScanContext::new(), &FsView::new(&roots), &[])
            .await
            .unwrap();
        assert!(findings.is_empty());
    }

    #[tokio::test]
    async fn test_root_without_etc_is_quiet() {
        let dir = TempDir::new().unwrap();
        let roots = [ScanRoot::new(dir.path()).unwrap()];
        let findings = WorldWritableDetector
            .detect(&ScanContext::new(), &FsView::new(&roots), &[])
            .await
            .unwrap();
        assert!(findings.is_empty());
    }
}

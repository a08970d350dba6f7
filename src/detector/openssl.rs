//! Flags end-of-life OpenSSL 1.x installations found by the Homebrew
//! extractor. The 1.x line stopped receiving security fixes in September
//! 2023; anything still on it is a known exposure.

use async_trait::async_trait;

use crate::context::ScanContext;
use crate::detector::{Detector, FsView};
use crate::model::{Advisory, Finding, Inventory, Severity};
use crate::plugin::{Capabilities, Plugin};

const ADVISORY_ID: &str = "HOSTSCAN-OPENSSL-EOL";

#[derive(Debug, Default)]
pub struct OpensslDetector;

impl Plugin for OpensslDetector {
    fn name(&self) -> &'static str {
        "vuln/openssl"
    }

    fn version(&self) -> i32 {
        0
    }

    fn requirements(&self) -> Capabilities {
        Capabilities::default()
    }
}

#[async_trait]
impl Detector for OpensslDetector {
    fn required_extractors(&self) -> &'static [&'static str] {
        &["os/homebrew"]
    }

    async fn detect(
        &self,
        _ctx: &ScanContext,
        _fsys: &FsView<'_>,
        inventory: &[Inventory],
    ) -> anyhow::Result<Vec<Finding>> {
        let affected: Vec<Inventory> = inventory
            .iter()
            .filter(|inv| is_eol_openssl(inv))
            .cloned()
            .collect();

        if affected.is_empty() {
            return Ok(Vec::new());
        }

        Ok(vec![Finding::new(Advisory {
            id: ADVISORY_ID.to_string(),
            title: "end-of-life OpenSSL 1.x installed".to_string(),
            description: Some(
                "OpenSSL 1.x reached end of life in September 2023 and no longer receives \
                 security fixes."
                    .to_string(),
            ),
            recommendation: Some("upgrade to OpenSSL 3.x".to_string()),
            severity: Severity::High,
        })
        .with_inventory(affected)])
    }
}

fn is_eol_openssl(inv: &Inventory) -> bool {
    let from_homebrew = inv
        .plugin
        .as_ref()
        .is_some_and(|p| p.name == "os/homebrew");
    if !from_homebrew {
        return false;
    }
    // Homebrew names the formula openssl@<major.minor> or plain openssl.
    let name_matches = inv.name == "openssl" || inv.name.starts_with("openssl@1");
    let version_matches = inv
        .version
        .as_deref()
        .is_some_and(|v| v.starts_with("1."));
    name_matches && version_matches
}

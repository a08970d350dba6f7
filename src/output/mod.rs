//! Format adapters: serialize a [`ScanResult`] into the supported output
//! formats.
//!
//! Adapters consume the result only; they never call back into the engine.
//! The format is selected by tag:
//!
//! | Tag | Document |
//! |-----|----------|
//! | `textproto` | human-readable field tree of the full result |
//! | `binproto` | binary encoding of the full result |
//! | `spdx23-tag-value` / `spdx23-json` / `spdx23-yaml` | SPDX 2.3 SBOM |
//! | `cdx-json` / `cdx-xml` | CycloneDX 1.5 SBOM |

pub mod cdx;
pub mod proto;
pub mod spdx;

use std::io::Write;

use anyhow::Result;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::config::{CdxConfig, SpdxConfig};
use crate::model::{Inventory, ScanResult};

/// Output format tags recognized by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Textproto,
    Binproto,
    Spdx23TagValue,
    Spdx23Json,
    Spdx23Yaml,
    CdxJson,
    CdxXml,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 7] = [
        OutputFormat::Textproto,
        OutputFormat::Binproto,
        OutputFormat::Spdx23TagValue,
        OutputFormat::Spdx23Json,
        OutputFormat::Spdx23Yaml,
        OutputFormat::CdxJson,
        OutputFormat::CdxXml,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Textproto => "textproto",
            OutputFormat::Binproto => "binproto",
            OutputFormat::Spdx23TagValue => "spdx23-tag-value",
            OutputFormat::Spdx23Json => "spdx23-json",
            OutputFormat::Spdx23Yaml => "spdx23-yaml",
            OutputFormat::CdxJson => "cdx-json",
            OutputFormat::CdxXml => "cdx-xml",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| {
                let supported: Vec<_> = Self::ALL.iter().map(|f| f.as_str()).collect();
                format!(
                    "output format {s:?} not recognized, supported formats are {}",
                    supported.join(", ")
                )
            })
    }
}

/// Serializes the result in the given format.
pub fn write_result(
    result: &ScanResult,
    format: OutputFormat,
    spdx_config: &SpdxConfig,
    cdx_config: &CdxConfig,
    writer: &mut dyn Write,
) -> Result<()> {
    match format {
        OutputFormat::Textproto => proto::write_textproto(result, writer),
        OutputFormat::Binproto => proto::write_binproto(result, writer),
        OutputFormat::Spdx23TagValue => {
            spdx::write(result, spdx_config, spdx::SpdxFormat::TagValue, writer)
        }
        OutputFormat::Spdx23Json => {
            spdx::write(result, spdx_config, spdx::SpdxFormat::Json, writer)
        }
        OutputFormat::Spdx23Yaml => {
            spdx::write(result, spdx_config, spdx::SpdxFormat::Yaml, writer)
        }
        OutputFormat::CdxJson => cdx::write(result, cdx_config, cdx::CdxFormat::Json, writer),
        OutputFormat::CdxXml => cdx::write(result, cdx_config, cdx::CdxFormat::Xml, writer),
    }
}

/// Package-URL for an inventory record, typed by its originating extractor.
pub(crate) fn purl(inv: &Inventory) -> String {
    let purl_type = match inv.plugin.as_ref().map(|p| p.name.as_str()) {
        Some("os/homebrew") => "brew",
        Some("javascript/packagejson") => "npm",
        _ => "generic",
    };
    match &inv.version {
        Some(version) => format!("pkg:{purl_type}/{}@{version}", inv.name),
        None => format!("pkg:{purl_type}/{}", inv.name),
    }
}

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "Plugin")]
    plugin: String,
    #[tabled(rename = "Version")]
    version: i32,
    #[tabled(rename = "Status")]
    status: String,
}

/// Prints the post-scan summary for interactive runs: counts plus one
/// status row per configured plugin.
pub fn print_summary(result: &ScanResult) {
    println!();
    println!(
        "Scan finished at {} ({} artifacts, {} findings)",
        result.end_time.format("%Y-%m-%d %H:%M:%S UTC"),
        result.inventory.len(),
        result.findings.len()
    );
    if !result.status.success {
        println!(
            "Scan failed: {}",
            result.status.failure_reason.as_deref().unwrap_or("unknown")
        );
    }
    if result.plugin_status.is_empty() {
        return;
    }
    println!();

    let rows: Vec<StatusRow> = result
        .plugin_status
        .iter()
        .map(|s| StatusRow {
            plugin: s.name.clone(),
            version: s.version,
            status: match &s.error {
                Some(error) => format!("{} ({})", s.state, error.lines().next().unwrap_or("")),
                None => s.state.to_string(),
            },
        })
        .collect();
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");
}

//! SPDX 2.3 SBOM output, in tag-value, JSON, and YAML renditions of the
//! same document.

use std::io::Write;

use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::config::SpdxConfig;
use crate::model::{Inventory, ScanResult};
use crate::output::purl;

const SPDX_VERSION: &str = "SPDX-2.3";
const DATA_LICENSE: &str = "CC0-1.0";
const NOASSERTION: &str = "NOASSERTION";

#[derive(Debug, Clone, Copy)]
pub enum SpdxFormat {
    TagValue,
    Json,
    Yaml,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpdxDocument {
    spdx_version: &'static str,
    data_license: &'static str,
    #[serde(rename = "SPDXID")]
    spdxid: &'static str,
    name: String,
    document_namespace: String,
    creation_info: CreationInfo,
    packages: Vec<SpdxPackage>,
    relationships: Vec<SpdxRelationship>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreationInfo {
    created: String,
    creators: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpdxPackage {
    name: String,
    #[serde(rename = "SPDXID")]
    spdxid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    version_info: Option<String>,
    download_location: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    external_refs: Vec<ExternalRef>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExternalRef {
    reference_category: &'static str,
    reference_type: &'static str,
    reference_locator: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpdxRelationship {
    spdx_element_id: &'static str,
    relationship_type: &'static str,
    related_spdx_element: String,
}

/// Writes the result as an SPDX 2.3 document.
pub fn write(
    result: &ScanResult,
    config: &SpdxConfig,
    format: SpdxFormat,
    writer: &mut dyn Write,
) -> Result<()> {
    let document = build(result, config);
    match format {
        SpdxFormat::Json => {
            serde_json::to_writer_pretty(&mut *writer, &document)?;
            writeln!(writer)?;
        }
        SpdxFormat::Yaml => serde_yaml::to_writer(&mut *writer, &document)?,
        SpdxFormat::TagValue => write_tag_value(&document, writer)?,
    }
    Ok(())
}

fn build(result: &ScanResult, config: &SpdxConfig) -> SpdxDocument {
    let name = config
        .document_name
        .clone()
        .unwrap_or_else(|| "hostscan scan result".to_string());
    let namespace = config.document_namespace.clone().unwrap_or_else(|| {
        format!(
            "https://spdx.dev/hostscan/{}",
            result.start_time.timestamp()
        )
    });

    let mut creators = vec![format!("Tool: hostscan-{}", result.version)];
    creators.extend(config.creators.iter().map(|c| c.replacen(':', ": ", 1)));

    let packages: Vec<SpdxPackage> = result
        .inventory
        .iter()
        .enumerate()
        .map(|(idx, inv)| SpdxPackage {
            name: inv.name.clone(),
            spdxid: spdx_ref(idx, inv),
            version_info: inv.version.clone(),
            download_location: NOASSERTION,
            external_refs: vec![ExternalRef {
                reference_category: "PACKAGE-MANAGER",
                reference_type: "purl",
                reference_locator: purl(inv),
            }],
        })
        .collect();

    let relationships = packages
        .iter()
        .map(|p| SpdxRelationship {
            spdx_element_id: "SPDXRef-DOCUMENT",
            relationship_type: "DESCRIBES",
            related_spdx_element: p.spdxid.clone(),
        })
        .collect();

    SpdxDocument {
        spdx_version: SPDX_VERSION,
        data_license: DATA_LICENSE,
        spdxid: "SPDXRef-DOCUMENT",
        name,
        document_namespace: namespace,
        creation_info: CreationInfo {
            created: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            creators,
        },
        packages,
        relationships,
    }
}

/// Deterministic, unique SPDX identifier for one inventory record.
fn spdx_ref(idx: usize, inv: &Inventory) -> String {
    let sanitized: String = inv
        .name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '-' })
        .collect();
    format!("SPDXRef-Package-{idx}-{sanitized}")
}

fn write_tag_value(document: &SpdxDocument, writer: &mut dyn Write) -> Result<()> {
    writeln!(writer, "SPDXVersion: {}", document.spdx_version)?;
    writeln!(writer, "DataLicense: {}", document.data_license)?;
    writeln!(writer, "SPDXID: {}", document.spdxid)?;
    writeln!(writer, "DocumentName: {}", document.name)?;
    writeln!(writer, "DocumentNamespace: {}", document.document_namespace)?;
    for creator in &document.creation_info.creators {
        writeln!(writer, "Creator: {creator}")?;
    }
    writeln!(writer, "Created: {}", document.creation_info.created)?;
    for package in &document.packages {
        writeln!(writer)?;
        writeln!(writer, "PackageName: {}", package.name)?;
        writeln!(writer, "SPDXID: {}", package.spdxid)?;
        if let Some(version) = &package.version_info {
            writeln!(writer, "PackageVersion: {version}")?;
        }
        writeln!(writer, "PackageDownloadLocation: {}", package.download_location)?;
        for external in &package.external_refs {
            writeln!(
                writer,
                "ExternalRef: {} {} {}",
                external.reference_category, external.reference_type, external.reference_locator
            )?;
        }
    }
    for relationship in &document.relationships {
        writeln!(
            writer,
            "Relationship: {} {} {}",
            relationship.spdx_element_id,
            relationship.relationship_type,
            relationship.related_spdx_element
        )?;
    }
    Ok(())
}

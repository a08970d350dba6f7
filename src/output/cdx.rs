//! CycloneDX 1.5 SBOM output, in JSON and XML renditions of the same
//! document. See: https://cyclonedx.org/

use std::io::Write;

use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::config::CdxConfig;
use crate::model::{ScanResult, Severity};
use crate::output::purl;

const SPEC_VERSION: &str = "1.5";

#[derive(Debug, Clone, Copy)]
pub enum CdxFormat {
    Json,
    Xml,
}

/// CycloneDX BOM root document.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CycloneDxBom {
    bom_format: &'static str,
    spec_version: &'static str,
    version: u32,
    metadata: CycloneDxMetadata,
    components: Vec<CycloneDxComponent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    vulnerabilities: Vec<CycloneDxVulnerability>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CycloneDxMetadata {
    timestamp: String,
    tools: Vec<CycloneDxTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    component: Option<CycloneDxSubject>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    authors: Vec<CycloneDxAuthor>,
}

#[derive(Serialize)]
struct CycloneDxTool {
    vendor: &'static str,
    name: &'static str,
    version: String,
}

#[derive(Serialize)]
struct CycloneDxAuthor {
    name: String,
}

/// The scanned host, when configured as the BOM subject.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CycloneDxSubject {
    #[serde(rename = "type")]
    component_type: &'static str,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CycloneDxComponent {
    #[serde(rename = "type")]
    component_type: &'static str,
    #[serde(rename = "bom-ref")]
    bom_ref: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    purl: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CycloneDxVulnerability {
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    recommendation: Option<String>,
    ratings: Vec<CycloneDxRating>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    affects: Vec<CycloneDxAffects>,
}

#[derive(Serialize)]
struct CycloneDxRating {
    severity: &'static str,
}

#[derive(Serialize)]
struct CycloneDxAffects {
    #[serde(rename = "ref")]
    component_ref: String,
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "critical",
        Severity::High => "high",
        Severity::Medium => "medium",
        Severity::Low => "low",
        Severity::Unknown => "unknown",
    }
}

/// Writes the result as a CycloneDX 1.5 document.
pub fn write(
    result: &ScanResult,
    config: &CdxConfig,
    format: CdxFormat,
    writer: &mut dyn Write,
) -> Result<()> {
    let bom = build(result, config);
    match format {
        CdxFormat::Json => {
            serde_json::to_writer_pretty(&mut *writer, &bom)?;
            writeln!(writer)?;
        }
        CdxFormat::Xml => write_xml(&bom, writer)?,
    }
    Ok(())
}

fn build(result: &ScanResult, config: &CdxConfig) -> CycloneDxBom {
    let components: Vec<CycloneDxComponent> = result
        .inventory
        .iter()
        .enumerate()
        .map(|(idx, inv)| CycloneDxComponent {
            component_type: "library",
            bom_ref: format!("{}#{idx}", purl(inv)),
            name: inv.name.clone(),
            version: inv.version.clone(),
            purl: purl(inv),
        })
        .collect();

    let vulnerabilities = result
        .findings
        .iter()
        .map(|finding| {
            // A finding references inventory records; affected components
            // are matched by purl.
            let affects = finding
                .inventory
                .iter()
                .flat_map(|inv| {
                    let locator = purl(inv);
                    components
                        .iter()
                        .filter(move |c| c.purl == locator)
                        .map(|c| CycloneDxAffects {
                            component_ref: c.bom_ref.clone(),
                        })
                })
                .collect();
            CycloneDxVulnerability {
                id: finding.advisory.id.clone(),
                description: finding.advisory.description.clone(),
                recommendation: finding.advisory.recommendation.clone(),
                ratings: vec![CycloneDxRating {
                    severity: severity_label(finding.advisory.severity),
                }],
                affects,
            }
        })
        .collect();

    let component = config.component_name.as_ref().map(|name| CycloneDxSubject {
        component_type: "operating-system",
        name: name.clone(),
        version: config.component_version.clone(),
    });

    CycloneDxBom {
        bom_format: "CycloneDX",
        spec_version: SPEC_VERSION,
        version: 1,
        metadata: CycloneDxMetadata {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            tools: vec![CycloneDxTool {
                vendor: "hostscan",
                name: "hostscan",
                version: result.version.clone(),
            }],
            component,
            authors: config
                .authors
                .iter()
                .map(|name| CycloneDxAuthor { name: name.clone() })
                .collect(),
        },
        components,
        vulnerabilities,
    }
}

fn write_xml(bom: &CycloneDxBom, writer: &mut dyn Write) -> Result<()> {
    writeln!(writer, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(
        writer,
        r#"<bom xmlns="http://cyclonedx.org/schema/bom/{SPEC_VERSION}" version="{}">"#,
        bom.version
    )?;

    writeln!(writer, "  <metadata>")?;
    writeln!(
        writer,
        "    <timestamp>{}</timestamp>",
        xml_escape(&bom.metadata.timestamp)
    )?;
    writeln!(writer, "    <tools>")?;
    for tool in &bom.metadata.tools {
        writeln!(writer, "      <tool>")?;
        writeln!(writer, "        <vendor>{}</vendor>", tool.vendor)?;
        writeln!(writer, "        <name>{}</name>", tool.name)?;
        writeln!(
            writer,
            "        <version>{}</version>",
            xml_escape(&tool.version)
        )?;
        writeln!(writer, "      </tool>")?;
    }
    writeln!(writer, "    </tools>")?;
    writeln!(writer, "  </metadata>")?;

    writeln!(writer, "  <components>")?;
    for component in &bom.components {
        writeln!(
            writer,
            r#"    <component type="{}" bom-ref="{}">"#,
            component.component_type,
            xml_escape(&component.bom_ref)
        )?;
        writeln!(writer, "      <name>{}</name>", xml_escape(&component.name))?;
        if let Some(version) = &component.version {
            writeln!(writer, "      <version>{}</version>", xml_escape(version))?;
        }
        writeln!(writer, "      <purl>{}</purl>", xml_escape(&component.purl))?;
        writeln!(writer, "    </component>")?;
    }
    writeln!(writer, "  </components>")?;

    if !bom.vulnerabilities.is_empty() {
        writeln!(writer, "  <vulnerabilities>")?;
        for vulnerability in &bom.vulnerabilities {
            writeln!(writer, "    <vulnerability>")?;
            writeln!(writer, "      <id>{}</id>", xml_escape(&vulnerability.id))?;
            if let Some(description) = &vulnerability.description {
                writeln!(
                    writer,
                    "      <description>{}</description>",
                    xml_escape(description)
                )?;
            }
            if let Some(recommendation) = &vulnerability.recommendation {
                writeln!(
                    writer,
                    "      <recommendation>{}</recommendation>",
                    xml_escape(recommendation)
                )?;
            }
            writeln!(writer, "      <ratings>")?;
            for rating in &vulnerability.ratings {
                writeln!(
                    writer,
                    "        <rating><severity>{}</severity></rating>",
                    rating.severity
                )?;
            }
            writeln!(writer, "      </ratings>")?;
            if !vulnerability.affects.is_empty() {
                writeln!(writer, "      <affects>")?;
                for affect in &vulnerability.affects {
                    writeln!(
                        writer,
                        "        <target><ref>{}</ref></target>",
                        xml_escape(&affect.component_ref)
                    )?;
                }
                writeln!(writer, "      </affects>")?;
            }
            writeln!(writer, "    </vulnerability>")?;
        }
        writeln!(writer, "  </vulnerabilities>")?;
    }

    writeln!(writer, "</bom>")?;
    Ok(())
}

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Advisory, Finding, Inventory, PluginRef, ScanStatus};
    use std::path::PathBuf;

    fn result() -> ScanResult {
        let mut inv = Inventory::new("openssl@1.1", Some("1.1.1w"), ["cellar/openssl@1.1/1.1.1w/install_receipt.json"]);
        inv.plugin = Some(PluginRef {
            name: "os/homebrew".into(),
            version: 0,
        });
        let finding = Finding::new(Advisory {
            id: "HOSTSCAN-OPENSSL-EOL".into(),
            title: "end-of-life OpenSSL".into(),
            description: Some("no longer receives fixes".into()),
            recommendation: Some("upgrade".into()),
            severity: Severity::High,
        })
        .with_inventory(vec![inv.clone()]);

        ScanResult {
            version: "0.3.0".into(),
            start_time: Utc::now(),
            end_time: Utc::now(),
            status: ScanStatus::success(),
            scan_roots: vec![PathBuf::from("/scan")],
            plugin_status: vec![],
            inventory: vec![inv],
            findings: vec![finding],
        }
    }

    #[test]
    fn test_json_document_shape() {
        let mut out = Vec::new();
        write(&result(), &CdxConfig::default(), CdxFormat::Json, &mut out).unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(doc["bomFormat"], "CycloneDX");
        assert_eq!(doc["specVersion"], "1.5");
        assert_eq!(doc["components"][0]["name"], "openssl@1.1");
        assert_eq!(doc["components"][0]["purl"], "pkg:brew/openssl@1.1@1.1.1w");
        assert_eq!(doc["vulnerabilities"][0]["id"], "HOSTSCAN-OPENSSL-EOL");
        assert_eq!(
            doc["vulnerabilities"][0]["affects"][0]["ref"],
            doc["components"][0]["bom-ref"]
        );
        assert_eq!(
            doc["vulnerabilities"][0]["ratings"][0]["severity"],
            "high"
        );
    }

    #[test]
    fn test_xml_contains_components_and_vulns() {
        let mut out = Vec::new();
        write(&result(), &CdxConfig::default(), CdxFormat::Xml, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains(r#"<bom xmlns="http://cyclonedx.org/schema/bom/1.5""#));
        assert!(text.contains("<name>openssl@1.1</name>"));
        assert!(text.contains("<id>HOSTSCAN-OPENSSL-EOL</id>"));
        assert!(text.contains("</bom>"));
    }

    #[test]
    fn test_xml_escapes_markup() {
        let mut res = result();
        res.inventory[0].name = "a<b&c".into();
        res.findings.clear();
        let mut out = Vec::new();
        write(&res, &CdxConfig::default(), CdxFormat::Xml, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("<name>a&lt;b&amp;c</name>"));
    }

    #[test]
    fn test_subject_component_from_config() {
        let config = CdxConfig {
            component_name: Some("build-host-7".into()),
            component_version: Some("2024.06".into()),
            authors: vec!["infra team".into()],
        };
        let mut out = Vec::new();
        write(&result(), &config, CdxFormat::Json, &mut out).unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(doc["metadata"]["component"]["name"], "build-host-7");
        assert_eq!(doc["metadata"]["authors"][0]["name"], "infra team");
    }
}

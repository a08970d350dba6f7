//! Extracts NPM package inventory from `package.json` manifests.

use std::fs::Metadata;
use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

use crate::context::ScanContext;
use crate::extractor::{ExtractResult, FilesystemExtractor, ScanInput};
use crate::model::Inventory;
use crate::plugin::{Capabilities, Plugin};

#[derive(Deserialize)]
struct PackageJson {
    name: Option<String>,
    version: Option<String>,
    description: Option<String>,
    license: Option<LicenseField>,
}

/// `license` is either a bare SPDX string or an object with a `type` field.
#[derive(Deserialize)]
#[serde(untagged)]
enum LicenseField {
    String(String),
    Object {
        #[serde(rename = "type")]
        kind: String,
    },
}

impl LicenseField {
    fn id(&self) -> &str {
        match self {
            LicenseField::String(s) => s,
            LicenseField::Object { kind } => kind,
        }
    }
}

#[derive(Debug, Default)]
pub struct PackageJsonExtractor;

impl Plugin for PackageJsonExtractor {
    fn name(&self) -> &'static str {
        "javascript/packagejson"
    }

    fn version(&self) -> i32 {
        0
    }

    fn requirements(&self) -> Capabilities {
        Capabilities::default()
    }
}

#[async_trait]
impl FilesystemExtractor for PackageJsonExtractor {
    fn file_required(&self, path: &Path, _info: &Metadata) -> bool {
        path.file_name().is_some_and(|n| n == "package.json")
    }

    async fn extract(&self, _ctx: &ScanContext, input: &mut ScanInput<'_>) -> ExtractResult {
        let manifest: PackageJson = serde_json::from_reader(&mut *input.reader)
            .with_context(|| format!("parsing {}", input.path.display()))?;

        // Workspace fragments and template manifests carry no identity;
        // they are not installed packages.
        let (Some(name), Some(version)) = (manifest.name, manifest.version) else {
            return Ok(Vec::new());
        };
        if name.is_empty() {
            return Ok(Vec::new());
        }

        let mut inventory = Inventory::new(name, Some(version), [input.path.clone()]);
        let mut metadata = serde_json::Map::new();
        if let Some(description) = manifest.description {
            metadata.insert("description".into(), description.into());
        }
        if let Some(license) = manifest.license {
            metadata.insert("license".into(), license.id().into());
        }
        if !metadata.is_empty() {
            inventory = inventory.with_metadata(metadata.into());
        }
        Ok(vec![inventory])
    }
}

//! Inventory: a normalized description of one discovered software artifact.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Reference to the plugin that produced a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRef {
    pub name: String,
    pub version: i32,
}

/// A discovered software artifact.
///
/// Created by an extractor; the engine only stamps the originating
/// [`PluginRef`] and, when absolute-path storage is configured, rewrites
/// `locations` to absolute paths. Invariant: a non-empty `name` and at least
/// one location.
///
/// # Example
///
/// ```
/// use hostscan::model::Inventory;
///
/// let inv = Inventory::new("tree", Some("1.1"), ["cellar/tree/1.1/install_receipt.json"]);
/// assert!(inv.is_valid());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    /// Package or artifact name.
    pub name: String,

    /// Installed version, when the evidence carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// File paths where evidence was found, relative to the scan root unless
    /// absolute-path storage is configured.
    pub locations: Vec<PathBuf>,

    /// The plugin that produced this record. Set by the engine.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin: Option<PluginRef>,

    /// Opaque plugin-specific metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Inventory {
    /// Creates an inventory record from evidence locations.
    pub fn new<N, V, L, P>(name: N, version: Option<V>, locations: L) -> Self
    where
        N: Into<String>,
        V: Into<String>,
        L: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            name: name.into(),
            version: version.map(Into::into),
            locations: locations.into_iter().map(Into::into).collect(),
            plugin: None,
            metadata: None,
        }
    }

    /// Attaches plugin-specific metadata. Builder-style.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Whether the record satisfies the model invariant.
    pub fn is_valid(&self) -> bool {
        !self.name.is_empty() && !self.locations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sets_identity() {
        let inv = Inventory::new("openssl", Some("3.2.1"), ["cellar/openssl/3.2.1/install_receipt.json"]);
        assert_eq!(inv.name, "openssl");
        assert_eq!(inv.version.as_deref(), Some("3.2.1"));
        assert_eq!(inv.locations.len(), 1);
        assert!(inv.plugin.is_none());
    }

    #[test]
    fn test_invariant() {
        let ok = Inventory::new("a", None::<String>, ["loc"]);
        assert!(ok.is_valid());

        let unnamed = Inventory::new("", None::<String>, ["loc"]);
        assert!(!unnamed.is_valid());

        let unlocated = Inventory::new("a", None::<String>, Vec::<PathBuf>::new());
        assert!(!unlocated.is_valid());
    }

    #[test]
    fn test_serialization_skips_empty_fields() {
        let inv = Inventory::new("a", None::<String>, ["loc"]);
        let json = serde_json::to_string(&inv).unwrap();
        assert!(json.contains("\"name\":\"a\""));
        assert!(!json.contains("version"));
        assert!(!json.contains("plugin"));
    }
}

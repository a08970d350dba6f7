//! Findings: detector output referencing inventory plus an advisory payload.

use serde::{Deserialize, Serialize};

use super::Inventory;

/// Severity ladder for advisories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Unknown,
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Unknown => "unknown",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// The advisory payload of a finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advisory {
    /// Stable advisory identifier, e.g. a CVE or internal rule id.
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    pub severity: Severity,
}

/// A detector-produced record. Immutable after creation except for the
/// detector stamp applied by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub advisory: Advisory,

    /// Inventory items this finding refers to. May be empty for findings
    /// about filesystem state alone.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub inventory: Vec<Inventory>,

    /// The detector that produced this record. Set by the engine.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detector: Option<String>,

    /// Opaque detector-specific payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

impl Finding {
    /// Creates a finding carrying only an advisory.
    pub fn new(advisory: Advisory) -> Self {
        Self {
            advisory,
            inventory: Vec::new(),
            detector: None,
            extra: None,
        }
    }

    /// Attaches the inventory items the advisory applies to. Builder-style.
    pub fn with_inventory(mut self, inventory: Vec<Inventory>) -> Self {
        self.inventory = inventory;
        self
    }
}

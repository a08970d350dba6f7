//! The complete result of one scan, as handed to format adapters.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Finding, Inventory, PluginStatus};

/// Overall outcome of the run. A failed run still carries the inventory
/// accumulated before the terminal error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStatus {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl ScanStatus {
    pub fn success() -> Self {
        Self {
            success: true,
            failure_reason: None,
        }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            failure_reason: Some(reason.into()),
        }
    }
}

/// Everything produced by one scan. Format adapters consume this and never
/// call back into the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    /// hostscan version that produced the result.
    pub version: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: ScanStatus,
    pub scan_roots: Vec<PathBuf>,
    pub plugin_status: Vec<PluginStatus>,
    pub inventory: Vec<Inventory>,
    pub findings: Vec<Finding>,
}

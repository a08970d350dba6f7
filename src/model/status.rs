//! Per-plugin run outcomes.

use serde::{Deserialize, Serialize};

/// Outcome of one plugin over one run, derived from whether it produced any
/// results and whether errors were recorded for it:
///
/// | produced | errors | state           |
/// |----------|--------|-----------------|
/// | yes      | none   | Succeeded       |
/// | yes      | some   | PartiallyFailed |
/// | no       | none   | NoResults       |
/// | no       | some   | Failed          |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginState {
    Succeeded,
    NoResults,
    PartiallyFailed,
    Failed,
}

impl std::fmt::Display for PluginState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PluginState::Succeeded => "succeeded",
            PluginState::NoResults => "no results",
            PluginState::PartiallyFailed => "partially failed",
            PluginState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Derived status for one configured plugin. Produced for every plugin of
/// the run, including those that observed no file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginStatus {
    pub name: String,
    pub version: i32,
    pub state: PluginState,

    /// Newline-joined trail of every error recorded for the plugin, in the
    /// order they occurred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PluginStatus {
    /// Applies the outcome table to one plugin's recorded run data.
    pub fn from_run(name: &str, version: i32, produced: bool, errors: &[String]) -> Self {
        let state = match (produced, errors.is_empty()) {
            (true, true) => PluginState::Succeeded,
            (true, false) => PluginState::PartiallyFailed,
            (false, true) => PluginState::NoResults,
            (false, false) => PluginState::Failed,
        };
        Self {
            name: name.to_string(),
            version,
            state,
            error: if errors.is_empty() {
                None
            } else {
                Some(errors.join("\n"))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_table() {
        let none: [String; 0] = [];
        let some = ["a/file: parse failure".to_string()];

        assert_eq!(
            PluginStatus::from_run("p", 1, true, &none).state,
            PluginState::Succeeded
        );
        assert_eq!(
            PluginStatus::from_run("p", 1, true, &some).state,
            PluginState::PartiallyFailed
        );
        assert_eq!(
            PluginStatus::from_run("p", 1, false, &none).state,
            PluginState::NoResults
        );
        assert_eq!(
            PluginStatus::from_run("p", 1, false, &some).state,
            PluginState::Failed
        );
    }

    #[test]
    fn test_error_trail_preserves_all_causes() {
        let errors = [
            "Open(a/b): permission denied".to_string(),
            "c/d: unexpected EOF".to_string(),
        ];
        let status = PluginStatus::from_run("p", 1, false, &errors);
        let joined = status.error.unwrap();
        assert!(joined.contains("a/b"));
        assert!(joined.contains("c/d"));
        assert_eq!(joined.lines().count(), 2);
    }
}

//! Metrics hook for scan telemetry.
//!
//! The engine reports walk and extraction events to a [`Collector`]; sinks
//! are configuration, not process-global state. The default is a no-op.

use std::path::Path;
use std::time::Duration;

/// Receives telemetry from the walker and dispatcher.
///
/// Implementations must be cheap and callable from the walker's task; they
/// hold no engine state.
pub trait Collector: Send + Sync {
    /// Called once per filesystem entry the walker observes.
    fn after_inode_visited(&self, _path: &Path) {}

    /// Called after every extract call with its duration and outcome.
    fn after_extractor_run(&self, _name: &str, _elapsed: Duration, _failed: bool) {}
}

/// Collector that discards all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCollector;

impl Collector for NoopCollector {}

//! hostscan scans filesystem roots for installed software and turns the
//! collected inventory into SBOM documents and vulnerability findings.
//!
//! The engine walks each [`ScanRoot`](root::ScanRoot), offers every observed
//! file to the configured [`FilesystemExtractor`](extractor::FilesystemExtractor)s,
//! merges in [`StandaloneExtractor`](extractor::standalone::StandaloneExtractor)
//! results, runs [`Detector`](detector::Detector)s over the unified
//! inventory, and hands the final [`ScanResult`](model::ScanResult) to a
//! format adapter.
//!
//! # Example
//!
//! ```no_run
//! use hostscan::context::ScanContext;
//! use hostscan::engine::{scan, ScanConfig};
//! use hostscan::extractor::all_filesystem_extractors;
//! use hostscan::root::ScanRoot;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ScanConfig {
//!         scan_roots: vec![ScanRoot::new("/")?],
//!         filesystem_extractors: all_filesystem_extractors(),
//!         ..ScanConfig::default()
//!     };
//!     let result = scan(&ScanContext::new(), &config).await?;
//!     println!("found {} artifacts", result.inventory.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod context;
pub mod detector;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod model;
pub mod output;
pub mod platform;
pub mod plugin;
pub mod root;
pub mod stats;
pub(crate) mod walker;

pub use config::Settings;
pub use context::ScanContext;
pub use engine::{scan, ScanConfig};
pub use error::{Result, ScanError};
pub use model::{Finding, Inventory, PluginStatus, ScanResult};
pub use plugin::{Capabilities, Os, Plugin};
pub use root::ScanRoot;

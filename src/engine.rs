//! The scan engine: one entry point that walks the roots, dispatches
//! extractors, merges standalone results, runs detectors, and finalizes
//! per-plugin status.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use regex::Regex;
use tracing::{info, warn};

use crate::context::ScanContext;
use crate::detector::{run_detectors, Detector, FsView};
use crate::error::{Result, ScanError};
use crate::extractor::standalone::{run_standalone, StandaloneExtractor};
use crate::extractor::FilesystemExtractor;
use crate::model::{PluginRef, PluginStatus, ScanResult, ScanStatus};
use crate::plugin::Capabilities;
use crate::platform;
use crate::root::{self, ScanRoot};
use crate::stats::{Collector, NoopCollector};
use crate::walker::{WalkContext, WalkOptions};

/// Fully resolved configuration for one scan. Plugin sets are already
/// name-resolved and capability-gated; see [`Settings`](crate::config::Settings)
/// for the user-facing option layer.
pub struct ScanConfig {
    /// Roots to traverse; empty means the platform default.
    pub scan_roots: Vec<ScanRoot>,
    pub filesystem_extractors: Vec<Box<dyn FilesystemExtractor>>,
    pub standalone_extractors: Vec<Box<dyn StandaloneExtractor>>,
    pub detectors: Vec<Box<dyn Detector>>,
    /// Host capabilities the scan runs with.
    pub capabilities: Capabilities,
    /// Absolute paths; when non-empty the walk is replaced by direct
    /// stat-and-dispatch over exactly these files.
    pub files_to_extract: Vec<PathBuf>,
    /// Absolute paths whose subtrees are pruned.
    pub dirs_to_skip: Vec<PathBuf>,
    pub skip_dir_regex: Option<Regex>,
    pub read_symlinks: bool,
    /// Entry budget across all roots; 0 disables it.
    pub max_inodes: u64,
    pub store_absolute_path: bool,
    pub stats: Arc<dyn Collector>,
}

impl std::fmt::Debug for ScanConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanConfig")
            .field("scan_roots", &self.scan_roots)
            .field("filesystem_extractors", &self.filesystem_extractors.len())
            .field("standalone_extractors", &self.standalone_extractors.len())
            .field("detectors", &self.detectors.len())
            .field("capabilities", &self.capabilities)
            .field("files_to_extract", &self.files_to_extract)
            .field("dirs_to_skip", &self.dirs_to_skip)
            .field("skip_dir_regex", &self.skip_dir_regex)
            .field("read_symlinks", &self.read_symlinks)
            .field("max_inodes", &self.max_inodes)
            .field("store_absolute_path", &self.store_absolute_path)
            .finish()
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            scan_roots: Vec::new(),
            filesystem_extractors: Vec::new(),
            standalone_extractors: Vec::new(),
            detectors: Vec::new(),
            capabilities: Capabilities::running_host(),
            files_to_extract: Vec::new(),
            dirs_to_skip: Vec::new(),
            skip_dir_regex: None,
            read_symlinks: false,
            max_inodes: 0,
            store_absolute_path: false,
            stats: Arc::new(NoopCollector),
        }
    }
}

/// Runs one scan.
///
/// Configuration-group errors (roots that cannot be resolved, candidate
/// paths outside every root) are returned before any extraction starts.
/// Terminal walk errors — cancellation, an exceeded inode budget — do *not*
/// produce an `Err`: the scan result comes back with a failed
/// [`ScanStatus`] and whatever inventory was accumulated.
///
/// # Errors
///
/// Only configuration-group errors.
pub async fn scan(ctx: &ScanContext, config: &ScanConfig) -> Result<ScanResult> {
    let start_time = Utc::now();

    let roots = if config.scan_roots.is_empty() {
        platform::default_scan_roots(false)?
    } else {
        config.scan_roots.clone()
    };

    // Resolve candidate paths up front; anything outside every root is a
    // configuration error surfaced before extraction.
    let files_mode = !config.files_to_extract.is_empty();
    let mut files_per_root: Vec<Vec<PathBuf>> = vec![Vec::new(); roots.len()];
    for file in &config.files_to_extract {
        let (idx, rel) = root::attribute(file, &roots)?;
        files_per_root[idx].push(rel);
    }
    let dirs_to_skip: HashSet<PathBuf> = root::relativize_all(&config.dirs_to_skip, &roots)?
        .into_iter()
        .collect();

    info!(
        roots = roots.len(),
        filesystem_extractors = config.filesystem_extractors.len(),
        standalone_extractors = config.standalone_extractors.len(),
        detectors = config.detectors.len(),
        "starting scan"
    );

    let options = WalkOptions {
        dirs_to_skip,
        skip_dir_regex: config.skip_dir_regex.clone(),
        read_symlinks: config.read_symlinks,
        max_inodes: config.max_inodes,
        store_absolute_path: config.store_absolute_path,
    };
    let mut wc = WalkContext::new(
        ctx,
        config.stats.as_ref(),
        &config.filesystem_extractors,
        options,
    );

    let mut terminal: Option<ScanError> = None;
    for (idx, scan_root) in roots.iter().enumerate() {
        let files = std::mem::take(&mut files_per_root[idx]);
        if files_mode && files.is_empty() {
            continue;
        }
        wc.update_root(scan_root.path().to_path_buf(), files);
        if let Err(err) = wc.walk_root().await {
            warn!(%err, "walk aborted");
            terminal = Some(err);
            break;
        }
    }

    let mut inventory = wc.inventory;
    let mut errors = wc.errors;
    let mut found = wc.found_inv;

    if terminal.is_none() {
        for outcome in run_standalone(ctx, &config.standalone_extractors).await {
            match outcome.result {
                Ok(records) => {
                    let mut kept = 0usize;
                    for mut inv in records {
                        if !inv.is_valid() {
                            errors
                                .entry(outcome.name.to_string())
                                .or_default()
                                .push("discarded inventory without name or location".to_string());
                            continue;
                        }
                        inv.plugin = Some(PluginRef {
                            name: outcome.name.to_string(),
                            version: outcome.version,
                        });
                        inventory.push(inv);
                        kept += 1;
                    }
                    if kept > 0 {
                        found.insert(outcome.name.to_string());
                    }
                }
                Err(err) => {
                    errors
                        .entry(outcome.name.to_string())
                        .or_default()
                        .push(format!("{err:#}"));
                }
            }
        }
    }

    let mut findings = Vec::new();
    if terminal.is_none() {
        let fsys = FsView::new(&roots);
        match run_detectors(
            ctx,
            &config.detectors,
            &fsys,
            &inventory,
            &mut errors,
            &mut found,
        )
        .await
        {
            Ok(batch) => findings = batch,
            Err(err) => terminal = Some(err),
        }
    }

    static NO_ERRORS: Vec<String> = Vec::new();
    let mut plugin_status = Vec::new();
    {
        let mut push = |name: &str, version: i32| {
            let trail = errors.get(name).unwrap_or(&NO_ERRORS);
            plugin_status.push(PluginStatus::from_run(
                name,
                version,
                found.contains(name),
                trail,
            ));
        };
        for ex in &config.filesystem_extractors {
            push(ex.as_ref().name(), ex.as_ref().version());
        }
        for ex in &config.standalone_extractors {
            push(ex.as_ref().name(), ex.as_ref().version());
        }
        for det in &config.detectors {
            push(det.as_ref().name(), det.as_ref().version());
        }
    }

    let status = match &terminal {
        None => ScanStatus::success(),
        Some(err) => ScanStatus::failure(err.to_string()),
    };

    Ok(ScanResult {
        version: env!("CARGO_PKG_VERSION").to_string(),
        start_time,
        end_time: Utc::now(),
        status,
        scan_roots: roots.iter().map(|r| r.path().to_path_buf()).collect(),
        plugin_status,
        inventory,
        findings,
    })
}

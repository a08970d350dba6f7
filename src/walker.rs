//! Filesystem walker and extractor dispatch loop.
//!
//! One [`WalkContext`] lives for one scan. It traverses each root in
//! pre-order, applies the skip rules, enforces the inode budget (shared
//! across roots) and the symlink policy, and hands every surviving regular
//! file to each configured extractor in turn.
//!
//! Per-file failures never abort the walk: open and stat errors, and errors
//! returned by extractors, are appended to that plugin's error trail and the
//! walk moves on. Only a cancelled context and an exceeded inode budget are
//! terminal.

use std::collections::{HashMap, HashSet};
use std::fs::{File, Metadata};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use regex::Regex;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::context::ScanContext;
use crate::error::{is_permission_error, Result, ScanError};
use crate::extractor::{FilesystemExtractor, ScanInput};
use crate::model::{Inventory, PluginRef};
use crate::stats::Collector;

const STATUS_INTERVAL: Duration = Duration::from_secs(2);

/// Walk behavior shared by every root of one scan.
pub(crate) struct WalkOptions {
    /// Root-relative directories whose subtrees are pruned.
    pub dirs_to_skip: HashSet<PathBuf>,
    /// Directories matching this are pruned as well.
    pub skip_dir_regex: Option<Regex>,
    /// Whether symlinked files are followed and dispatched.
    pub read_symlinks: bool,
    /// Entry budget across all roots; 0 disables it.
    pub max_inodes: u64,
    /// Rewrite inventory locations to absolute paths.
    pub store_absolute_path: bool,
}

/// Whether the traversal descends into a directory or prunes it.
#[derive(Debug, PartialEq, Eq)]
enum WalkFlow {
    Continue,
    SkipSubtree,
}

/// Mutable state of one scan's walks. Owned by exactly one walk at a time;
/// all mutation happens on the dispatch loop's task.
pub(crate) struct WalkContext<'a> {
    ctx: &'a ScanContext,
    stats: &'a dyn Collector,
    extractors: &'a [Box<dyn FilesystemExtractor>],
    options: WalkOptions,

    /// Absolute path of the root currently being walked.
    root: PathBuf,
    /// Root-relative files that replace the tree walk when non-empty.
    files_to_extract: Vec<PathBuf>,

    pub(crate) inodes_visited: u64,
    pub(crate) extract_calls: u64,
    last_status: Instant,
    last_inodes: u64,
    last_extracts: u64,

    pub(crate) inventory: Vec<Inventory>,
    /// Plugin name to ordered error trail.
    pub(crate) errors: HashMap<String, Vec<String>>,
    /// Plugins that produced at least one inventory record.
    pub(crate) found_inv: HashSet<String>,
}

impl<'a> WalkContext<'a> {
    pub(crate) fn new(
        ctx: &'a ScanContext,
        stats: &'a dyn Collector,
        extractors: &'a [Box<dyn FilesystemExtractor>],
        options: WalkOptions,
    ) -> Self {
        Self {
            ctx,
            stats,
            extractors,
            options,
            root: PathBuf::new(),
            files_to_extract: Vec::new(),
            inodes_visited: 0,
            extract_calls: 0,
            last_status: Instant::now(),
            last_inodes: 0,
            last_extracts: 0,
            inventory: Vec::new(),
            errors: HashMap::new(),
            found_inv: HashSet::new(),
        }
    }

    /// Points the context at the next root. Counters and accumulated results
    /// carry over; the inode budget spans all roots of the scan.
    pub(crate) fn update_root(&mut self, root: PathBuf, files_to_extract: Vec<PathBuf>) {
        self.root = root;
        self.files_to_extract = files_to_extract;
    }

    /// Walks the active root, or stat-and-dispatches the configured
    /// individual files when that mode is on.
    ///
    /// # Errors
    ///
    /// Terminal errors only: [`ScanError::InodeBudgetExceeded`] and
    /// [`ScanError::Cancelled`].
    pub(crate) async fn walk_root(&mut self) -> Result<()> {
        let start = Instant::now();
        info!(root = %self.root.display(), "starting filesystem walk");

        let result = if self.files_to_extract.is_empty() {
            self.walk_tree().await
        } else {
            self.walk_individual_files().await
        };

        info!(
            inodes_visited = self.inodes_visited,
            extract_calls = self.extract_calls,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "filesystem walk finished"
        );
        result
    }

    async fn walk_tree(&mut self) -> Result<()> {
        let mut it = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        while let Some(entry) = it.next() {
            match entry {
                Ok(entry) => {
                    let rel = entry
                        .path()
                        .strip_prefix(&self.root)
                        .unwrap_or_else(|_| Path::new(""))
                        .to_path_buf();
                    let abs = entry.path().to_path_buf();
                    let flow = self
                        .handle_entry(&rel, &abs, Some(entry.file_type()), None)
                        .await?;
                    if flow == WalkFlow::SkipSubtree {
                        it.skip_current_dir();
                    }
                }
                Err(err) => {
                    let rel = err
                        .path()
                        .and_then(|p| p.strip_prefix(&self.root).ok())
                        .map(Path::to_path_buf)
                        .unwrap_or_default();
                    let abs = self.root.join(&rel);
                    let io_err = match err.io_error() {
                        Some(io) => std::io::Error::new(io.kind(), err.to_string()),
                        None => std::io::Error::other(err.to_string()),
                    };
                    self.handle_entry(&rel, &abs, None, Some(io_err)).await?;
                }
            }
        }
        Ok(())
    }

    /// Stat-and-dispatch over exactly the configured files of this root.
    /// Stat failures route through the same per-entry handling as walk
    /// errors.
    async fn walk_individual_files(&mut self) -> Result<()> {
        let files = std::mem::take(&mut self.files_to_extract);
        for rel in &files {
            let abs = self.root.join(rel);
            match std::fs::metadata(&abs) {
                Ok(info) => {
                    self.handle_entry(rel, &abs, Some(info.file_type()), None)
                        .await?;
                }
                Err(err) => {
                    self.handle_entry(rel, &abs, None, Some(err)).await?;
                }
            }
        }
        self.files_to_extract = files;
        Ok(())
    }

    /// Per-entry handler; the order of checks is load-bearing. An entry is
    /// counted against the budget before anything else happens to it, so a
    /// budget of N aborts on the N+1th entry with `inodes_visited == N+1`.
    async fn handle_entry(
        &mut self,
        rel: &Path,
        abs: &Path,
        file_type: Option<std::fs::FileType>,
        fserr: Option<std::io::Error>,
    ) -> Result<WalkFlow> {
        self.print_status(rel);

        self.inodes_visited += 1;
        if self.options.max_inodes > 0 && self.inodes_visited > self.options.max_inodes {
            return Err(ScanError::InodeBudgetExceeded(self.options.max_inodes));
        }
        self.stats.after_inode_visited(rel);

        self.ctx.check()?;

        if let Some(err) = fserr {
            // Unreadable directories are routine when sweeping a whole host.
            if is_permission_error(&err) {
                debug!(path = %rel.display(), %err, "walk error");
            } else {
                error!(path = %rel.display(), %err, "walk error");
            }
            return Ok(WalkFlow::Continue);
        }
        let Some(file_type) = file_type else {
            return Ok(WalkFlow::Continue);
        };

        if file_type.is_dir() {
            if self.should_skip_dir(rel) {
                debug!(path = %rel.display(), "skipping directory subtree");
                return Ok(WalkFlow::SkipSubtree);
            }
            return Ok(WalkFlow::Continue);
        }

        if !file_type.is_file() {
            if !self.options.read_symlinks || !file_type.is_symlink() {
                return Ok(WalkFlow::Continue);
            }
        }

        // Re-stat through the filesystem; resolves symlinks and fills in
        // metadata some filesystems only provide on a full stat.
        let info = match std::fs::metadata(abs) {
            Ok(info) => info,
            Err(err) => {
                warn!(path = %rel.display(), %err, "stat failed");
                return Ok(WalkFlow::Continue);
            }
        };

        self.dispatch(rel, &info).await?;
        Ok(WalkFlow::Continue)
    }

    fn should_skip_dir(&self, rel: &Path) -> bool {
        if self.options.dirs_to_skip.contains(rel) {
            return true;
        }
        if let Some(re) = &self.options.skip_dir_regex {
            return re.is_match(&rel.to_string_lossy());
        }
        false
    }

    /// Offers one observed file to every extractor, in configuration order.
    async fn dispatch(&mut self, rel: &Path, info: &Metadata) -> Result<()> {
        let extractors = self.extractors;
        for ex in extractors {
            // A running extractor is never interrupted, but no further one
            // is started once cancellation is observed.
            self.ctx.check()?;
            if !ex.file_required(rel, info) {
                continue;
            }
            self.run_extractor(ex.as_ref(), rel).await;
        }
        Ok(())
    }

    async fn run_extractor(&mut self, ex: &dyn FilesystemExtractor, rel: &Path) {
        let abs = self.root.join(rel);
        let mut file = match File::open(&abs) {
            Ok(file) => file,
            Err(err) => {
                self.record_error(ex.name(), format!("Open({}): {}", rel.display(), err));
                return;
            }
        };
        // Stat through the open handle; some filesystems only return
        // complete metadata this way.
        let info = match file.metadata() {
            Ok(info) => info,
            Err(err) => {
                self.record_error(ex.name(), format!("stat({}): {}", rel.display(), err));
                return;
            }
        };

        self.extract_calls += 1;
        let mut input = ScanInput {
            path: rel.to_path_buf(),
            root: self.root.clone(),
            info,
            reader: &mut file,
        };

        let ctx = self.ctx;
        let start = Instant::now();
        let result = ex.extract(ctx, &mut input).await;
        self.stats
            .after_extractor_run(ex.name(), start.elapsed(), result.is_err());

        let results = match result {
            Ok(results) => results,
            Err(err) => {
                self.record_error(ex.name(), format!("{}: {:#}", rel.display(), err.source));
                err.partial
            }
        };

        let mut kept = 0usize;
        for mut inv in results {
            if !inv.is_valid() {
                self.record_error(
                    ex.name(),
                    format!("{}: discarded inventory without name or location", rel.display()),
                );
                continue;
            }
            inv.plugin = Some(PluginRef {
                name: ex.name().to_string(),
                version: ex.version(),
            });
            if self.options.store_absolute_path {
                inv.locations = inv.locations.iter().map(|l| self.root.join(l)).collect();
            }
            self.inventory.push(inv);
            kept += 1;
        }
        if kept > 0 {
            self.found_inv.insert(ex.name().to_string());
        }
    }

    pub(crate) fn record_error(&mut self, plugin: &str, message: String) {
        self.errors.entry(plugin.to_string()).or_default().push(message);
    }

    fn print_status(&mut self, rel: &Path) {
        let elapsed = self.last_status.elapsed();
        if elapsed < STATUS_INTERVAL {
            return;
        }
        let new_inodes = self.inodes_visited - self.last_inodes;
        info!(
            new_inodes,
            inodes_per_sec = (new_inodes as f64 / elapsed.as_secs_f64()).round() as u64,
            new_extract_calls = self.extract_calls - self.last_extracts,
            path = %rel.display(),
            "walk status"
        );
        self.last_status = Instant::now();
        self.last_inodes = self.inodes_visited;
        self.last_extracts = self.extract_calls;
    }
}

//! Local library scanning.
//!
//! A scan runs in two passes. The collect pass lists every folder, then
//! parses each candidate on a bounded pool of blocking workers, consulting
//! the scan cache first. The resolve pass runs once all outcomes are in and
//! groups them by base title, so the result never depends on traversal or
//! completion order.

mod collect;
mod models;
mod resolve;

pub use self::models::{ContentFile, Issue, LibraryEntry, LocalLibrary, MISSING_BASE_REASON};
use crate::error::{ErrorKind, Result};
use crate::progress::Progress;
use futures::{StreamExt, stream};
use nxshelf_cache::Repository;
use nxshelf_config::Settings;
use nxshelf_container::Parser;
use std::collections::BTreeSet;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Progress is reported once per this many parsed files.
const PROGRESS_BATCH: usize = 50;

/// Per-invocation scan settings.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub recursive: bool,
    /// Parse every file even when the cache holds a matching result.
    pub ignore_cache: bool,
    /// Upper bound on files parsed at the same time.
    pub workers: usize,
    pub cancel: CancellationToken,
}
impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            ignore_cache: false,
            workers: std::thread::available_parallelism().map(NonZeroUsize::get).unwrap_or(4),
            cancel: CancellationToken::new(),
        }
    }
}
impl From<&Settings> for ScanOptions {
    fn from(settings: &Settings) -> Self {
        Self { recursive: settings.scan_recursively, workers: settings.workers(), ..Self::default() }
    }
}

/// Builds a [`LocalLibrary`] from a set of folders.
///
/// # Examples
///
/// ```no_run
/// use nxshelf_library::progress::NoProgress;
/// use nxshelf_library::scan::{ScanOptions, Scanner};
/// use std::path::PathBuf;
///
/// # async fn example() -> nxshelf_library::error::Result<()> {
/// let library = Scanner::default()
///     .scan(&[PathBuf::from("/mnt/sd/games")], &ScanOptions::default(), &NoProgress)
///     .await?;
/// println!("{} titles, {} issues", library.titles.len(), library.issues().len());
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct Scanner {
    parser: Arc<Parser>,
    cache: Option<Repository>,
}
impl Scanner {
    pub fn new(parser: Parser) -> Self {
        Self { parser: Arc::new(parser), cache: None }
    }

    /// Reuse and record parse results in the given scan cache.
    pub fn with_cache(mut self, cache: Repository) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Scans every folder and resolves the results into a library.
    ///
    /// # Errors
    ///
    /// Fails only for whole-operation problems: a folder that cannot be
    /// listed, or cancellation. Files that cannot be parsed end up in
    /// [`LocalLibrary::skipped`].
    #[instrument(skip_all, fields(folders = folders.len(), recursive = options.recursive))]
    pub async fn scan(&self, folders: &[PathBuf], options: &ScanOptions, progress: &dyn Progress) -> Result<LocalLibrary> {
        let mut candidates = Vec::new();
        let mut outcomes = Vec::new();
        let mut num_files = 0;
        let mut seen = BTreeSet::new();
        for (index, folder) in folders.iter().enumerate() {
            if options.cancel.is_cancelled() {
                exn::bail!(ErrorKind::Cancelled);
            }
            progress.update(index as u64, folders.len() as u64, &format!("Listing {}", folder.display()));
            let mut listing = collect::list_folder(folder, options.recursive).await?;
            listing.retain_unseen(&mut seen);
            num_files += listing.num_files;
            candidates.extend(listing.candidates);
            outcomes.extend(listing.skipped);
        }

        let total = candidates.len();
        tracing::info!(files = num_files, candidates = total, "Listing complete; parsing");
        progress.update(0, total as u64, "Reading files");
        let mut parsed = stream::iter(candidates)
            .map(|candidate| {
                collect::collect(Arc::clone(&self.parser), self.cache.clone(), candidate, options.ignore_cache)
            })
            .buffer_unordered(options.workers.max(1));
        while let Some(outcome) = parsed.next().await {
            outcomes.push(outcome);
            let done = outcomes.len();
            if done % PROGRESS_BATCH == 0 {
                progress.update(done as u64, total as u64, "Reading files");
            }
            if options.cancel.is_cancelled() {
                tracing::info!(parsed = done, "Scan cancelled");
                exn::bail!(ErrorKind::Cancelled);
            }
        }
        progress.update(total as u64, total as u64, "Reading files");

        let library = resolve::resolve(outcomes, num_files);
        tracing::info!(
            titles = library.titles.len(),
            skipped = library.skipped.len(),
            files = library.num_files,
            "Scan complete"
        );
        Ok(library)
    }
}

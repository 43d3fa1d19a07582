//! The parallel first pass of a scan: listing folders and turning every
//! candidate into an [`Outcome`].

use super::resolve::Outcome;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use nxshelf_cache::{Fingerprint, Repository};
use nxshelf_container::models::ContainerFile;
use nxshelf_container::{Parser, discover, is_candidate};
use nxshelf_storage::{FileInfo, LocalBackend, StorageBackend};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::OffsetDateTime;

/// A logical container waiting to be parsed.
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub file: ContainerFile,
    pub fingerprint: Fingerprint,
}

/// What listing one folder produced.
#[derive(Debug, Default)]
pub(crate) struct Listing {
    pub candidates: Vec<Candidate>,
    /// Broken split families, already final.
    pub skipped: Vec<Outcome>,
    pub num_files: usize,
}
impl Listing {
    /// Drops every path an earlier listing already produced, as happens
    /// when one scan folder is nested in another.
    pub fn retain_unseen(&mut self, seen: &mut BTreeSet<PathBuf>) {
        self.candidates.retain(|candidate| {
            let fresh = seen.insert(candidate.file.path.clone());
            if fresh {
                seen.extend(candidate.file.parts.iter().cloned());
            }
            fresh
        });
        for outcome in &mut self.skipped {
            if let Outcome::Skipped { paths, .. } = outcome {
                paths.retain(|path| seen.insert(path.clone()));
            }
        }
        self.skipped.retain(|outcome| !matches!(outcome, Outcome::Skipped { paths, .. } if paths.is_empty()));
        self.num_files = self.candidates.len()
            + self
                .skipped
                .iter()
                .map(|outcome| match outcome {
                    Outcome::Skipped { paths, .. } => paths.len(),
                    Outcome::Parsed(_) => 1,
                })
                .sum::<usize>();
    }
}

/// Lists one scan folder and groups its candidates into logical containers.
///
/// # Errors
///
/// The folder itself being missing or unreadable fails the whole scan.
pub(crate) async fn list_folder(folder: &Path, recursive: bool) -> Result<Listing> {
    let root = std::path::absolute(folder).or_raise(|| ErrorKind::Folder(folder.to_path_buf()))?;
    let backend =
        LocalBackend::new(folder.display().to_string(), &root).or_raise(|| ErrorKind::Folder(folder.to_path_buf()))?;
    let files: HashMap<PathBuf, FileInfo> = backend
        .list(recursive)
        .await
        .or_raise(|| ErrorKind::Folder(folder.to_path_buf()))?
        .into_iter()
        .map(|info| (info.absolute(backend.root()), info))
        .filter(|(path, _)| is_candidate(path))
        .collect();

    let discovered = discover(files.keys().cloned());
    let mut listing = Listing::default();
    for broken in discovered.broken {
        listing.num_files += broken.parts.len();
        listing.skipped.push(Outcome::Skipped { paths: broken.parts, reason: broken.reason.to_string() });
    }
    for file in discovered.containers {
        let parts = file.parts.iter().filter_map(|part| files.get(part));
        let size = parts.clone().map(|info| info.size).sum::<u64>();
        let modified = parts.map(|info| info.modified).max().unwrap_or(OffsetDateTime::UNIX_EPOCH);
        listing.num_files += 1;
        listing.candidates.push(Candidate { fingerprint: Fingerprint::new(&file.path, size, modified), file });
    }
    tracing::debug!(
        folder = %folder.display(),
        candidates = listing.candidates.len(),
        skipped = listing.skipped.len(),
        "Listed folder"
    );
    Ok(listing)
}

/// Parses one candidate, consulting and maintaining the cache.
///
/// Never fails: every problem becomes a skip reason for this file alone.
pub(crate) async fn collect(
    parser: Arc<Parser>,
    cache: Option<Repository>,
    candidate: Candidate,
    ignore_cache: bool,
) -> Outcome {
    let Candidate { file, fingerprint } = candidate;
    if let Some(cache) = cache.as_ref().filter(|_| !ignore_cache) {
        match cache.get(&fingerprint).await {
            Ok(Some(parsed)) => {
                tracing::debug!(path = %file.path.display(), "Using cached result");
                return Outcome::Parsed(parsed);
            },
            Ok(None) => {},
            Err(err) => tracing::warn!(path = %file.path.display(), error = %err, "Cache lookup failed"),
        }
    }

    let path = file.path.clone();
    // Parsing is synchronous file I/O.
    let parsed = match tokio::task::spawn_blocking(move || parser.parse(&file)).await {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "Parser task failed");
            return Outcome::Skipped { paths: vec![path], reason: ErrorKind::Task.to_string() };
        },
    };

    match parsed {
        Ok(parsed) => {
            if let Some(cache) = &cache
                && let Err(err) = cache.upsert(&fingerprint, &parsed).await
            {
                tracing::warn!(path = %path.display(), error = %err, "Could not cache parse result");
            }
            Outcome::Parsed(parsed)
        },
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "Skipping unparseable file");
            if let Some(cache) = &cache
                && let Err(err) = cache.evict(&path).await
            {
                tracing::warn!(path = %path.display(), error = %err, "Could not evict cache entry");
            }
            Outcome::Skipped { paths: vec![path], reason: (*err).to_string() }
        },
    }
}

use nxshelf_container::models::{ContainerFile, GameMetadata, TitleId};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

pub const MISSING_BASE_REASON: &str = "base file is missing";

/// One content record together with the file it was found in.
///
/// A multi-content file appears once per record it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentFile {
    pub file: ContainerFile,
    pub metadata: GameMetadata,
}
impl ContentFile {
    pub fn path(&self) -> &Path {
        &self.file.path
    }
}

/// Everything found locally for one base title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryEntry {
    pub base_id: TitleId,
    /// `None` when only updates or add-ons were found.
    pub base: Option<ContentFile>,
    /// Update files keyed by version.
    pub updates: BTreeMap<u32, ContentFile>,
    pub dlc: Vec<ContentFile>,
}
impl LibraryEntry {
    pub fn new(base_id: TitleId) -> Self {
        Self { base_id, base: None, updates: BTreeMap::new(), dlc: Vec::new() }
    }

    pub fn base_exists(&self) -> bool {
        self.base.is_some()
    }

    /// Highest local update version, 0 without updates.
    pub fn latest_update(&self) -> u32 {
        self.updates.keys().next_back().copied().unwrap_or(0)
    }

    /// Every slot's content, base first.
    pub fn contents(&self) -> impl Iterator<Item = &ContentFile> {
        self.base.iter().chain(self.updates.values()).chain(&self.dlc)
    }

    /// Best local name: the base's, then any update's or add-on's.
    pub fn display_name(&self) -> Option<&str> {
        self.contents().find_map(|c| c.metadata.display_name())
    }
}

/// A problem found while scanning, keyed by file path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub path: PathBuf,
    pub reason: String,
}

/// The result of one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LocalLibrary {
    pub titles: BTreeMap<TitleId, LibraryEntry>,
    /// Files that could not be placed, with a human readable reason.
    pub skipped: BTreeMap<PathBuf, String>,
    /// Logical files observed; a split family counts once.
    pub num_files: usize,
}
impl LocalLibrary {
    /// Entries whose base file was found.
    pub fn complete(&self) -> impl Iterator<Item = &LibraryEntry> {
        self.titles.values().filter(|e| e.base_exists())
    }

    /// One issue per file of an entry without a base, then every skipped
    /// file.
    pub fn issues(&self) -> Vec<Issue> {
        let mut seen = BTreeSet::new();
        let orphans = self
            .titles
            .values()
            .filter(|e| !e.base_exists())
            .flat_map(LibraryEntry::contents)
            .filter(|c| seen.insert(c.path().to_path_buf()))
            .map(|c| Issue { path: c.path().to_path_buf(), reason: MISSING_BASE_REASON.to_string() })
            .collect::<Vec<_>>();
        orphans
            .into_iter()
            .chain(self.skipped.iter().map(|(path, reason)| Issue { path: path.clone(), reason: reason.clone() }))
            .collect()
    }

    /// Distinct paths held in any slot or in `skipped`.
    pub fn accounted_files(&self) -> BTreeSet<&Path> {
        self.titles
            .values()
            .flat_map(LibraryEntry::contents)
            .map(ContentFile::path)
            .chain(self.skipped.keys().map(PathBuf::as_path))
            .collect()
    }
}

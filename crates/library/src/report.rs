//! JSON shapes handed to the surrounding application.

use crate::scan::{LibraryEntry, LocalLibrary};
use nxshelf_catalog::TitleCatalog;
use nxshelf_container::models::TitleId;
use serde::Serialize;

/// One row of the library listing, one per title with a base file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryRow {
    /// 1-based position in the listing.
    pub id: usize,
    pub name: String,
    /// Display version of the newest local file, empty when unknown.
    pub version: String,
    /// Number of local add-on files.
    pub dlc: usize,
    #[serde(rename = "titleId")]
    pub title_id: TitleId,
    pub path: String,
    pub icon: Option<String>,
    /// Highest local update version.
    pub update: u32,
    pub region: Option<String>,
    /// `split`, `multi-content` or the file extension.
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuePair {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LibraryListing {
    pub library_data: Vec<LibraryRow>,
    pub issues: Vec<IssuePair>,
    pub num_files: usize,
}
impl LibraryListing {
    /// Builds the listing; catalog data fills in names, icons and regions
    /// where available.
    pub fn new(local: &LocalLibrary, catalog: Option<&TitleCatalog>) -> Self {
        let library_data = local
            .complete()
            .enumerate()
            .filter_map(|(index, entry)| Self::row(index + 1, entry, catalog))
            .collect();
        let issues = local
            .issues()
            .into_iter()
            .map(|issue| IssuePair { key: issue.path.display().to_string(), value: issue.reason })
            .collect();
        Self { library_data, issues, num_files: local.num_files }
    }

    fn row(id: usize, entry: &LibraryEntry, catalog: Option<&TitleCatalog>) -> Option<LibraryRow> {
        let base = entry.base.as_ref()?;
        let title = catalog.and_then(|c| c.get(entry.base_id));
        let newest = entry.updates.values().next_back().unwrap_or(base);
        let name = title
            .map(|t| t.name.as_str())
            .filter(|name| !name.is_empty())
            .or_else(|| entry.display_name())
            .unwrap_or_default();
        Some(LibraryRow {
            id,
            name: name.to_string(),
            version: newest.metadata.display_version.clone().unwrap_or_default(),
            dlc: entry.dlc.len(),
            title_id: entry.base_id,
            path: base.path().display().to_string(),
            icon: title.and_then(|t| t.icon_url.clone()),
            update: entry.latest_update(),
            region: title.and_then(|t| t.region.clone()),
            kind: base.file.type_label().to_string(),
        })
    }
}

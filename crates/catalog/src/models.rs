use nxshelf_container::models::{ContentKind, TitleId};
use std::collections::BTreeMap;
use time::Date;

/// One title as described by the remote catalog.
///
/// Attributes default to empty when the title only appears in the versions
/// document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogTitle {
    pub id: TitleId,
    pub name: String,
    pub region: Option<String>,
    pub icon_url: Option<String>,
    pub banner_url: Option<String>,
    pub release_date: Option<Date>,
    pub is_demo: bool,
    /// Published versions and, when known, their release dates.
    pub versions: BTreeMap<u32, Option<Date>>,
    /// Add-ons published for a base title; always empty on add-ons.
    pub add_ons: BTreeMap<TitleId, CatalogTitle>,
}
impl CatalogTitle {
    pub fn new(id: TitleId) -> Self {
        Self {
            id,
            name: String::new(),
            region: None,
            icon_url: None,
            banner_url: None,
            release_date: None,
            is_demo: false,
            versions: BTreeMap::new(),
            add_ons: BTreeMap::new(),
        }
    }

    /// The highest published version, or 0 when none is listed.
    pub fn latest_version(&self) -> u32 {
        self.versions.keys().next_back().copied().unwrap_or(0)
    }

    pub fn latest_release_date(&self) -> Option<Date> {
        self.versions.values().next_back().copied().flatten()
    }
}

/// The merged remote catalog, keyed by base title id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleCatalog {
    pub titles: BTreeMap<TitleId, CatalogTitle>,
}
impl TitleCatalog {
    /// Looks up a base title or add-on by id. Update ids resolve to their
    /// base title.
    pub fn get(&self, id: TitleId) -> Option<&CatalogTitle> {
        let base = self.titles.get(&id.base())?;
        match id.kind() {
            ContentKind::AddOn => base.add_ons.get(&id),
            ContentKind::Base | ContentKind::Update => Some(base),
        }
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }
}

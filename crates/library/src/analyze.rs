//! Completeness analysis: diffing a [`LocalLibrary`] against a
//! [`TitleCatalog`].

use crate::scan::{LibraryEntry, LocalLibrary};
use nxshelf_catalog::{CatalogTitle, TitleCatalog};
use nxshelf_container::models::TitleId;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use time::Date;
use time::macros::format_description;

/// Title ids the user does not want reported.
///
/// Matching ignores case, surrounding whitespace and an optional `0x`
/// prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreList(BTreeSet<String>);
impl IgnoreList {
    fn normalize(id: &str) -> String {
        let id = id.trim();
        let id = id.strip_prefix("0x").or_else(|| id.strip_prefix("0X")).unwrap_or(id);
        id.to_ascii_uppercase()
    }

    pub fn contains(&self, id: TitleId) -> bool {
        self.0.contains(&id.to_string())
    }
}
impl<S: AsRef<str>> FromIterator<S> for IgnoreList {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self(iter.into_iter().map(|id| Self::normalize(id.as_ref())).filter(|id| !id.is_empty()).collect())
    }
}

/// A title, update or add-on with something missing locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncompleteTitle {
    pub title_id: TitleId,
    pub name: String,
    /// Highest version present locally.
    pub local_update: u32,
    /// Highest version the catalog knows about.
    pub latest_update: u32,
    pub latest_update_date: Option<String>,
    /// `"<id> [<name>]"` for every add-on not present locally.
    pub missing_dlc: Vec<String>,
}

/// A catalog title with no local files at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingTitle {
    pub name: String,
    #[serde(rename = "titleId")]
    pub title_id: TitleId,
    pub icon: Option<String>,
    pub region: Option<String>,
    pub release_date: Option<String>,
}

pub(crate) fn format_date(date: Date) -> Option<String> {
    date.format(format_description!("[year]-[month]-[day]")).ok()
}

fn best_name(title: &CatalogTitle, entry: Option<&LibraryEntry>) -> String {
    match title.name.is_empty() {
        false => title.name.clone(),
        true => entry.and_then(LibraryEntry::display_name).unwrap_or_default().to_string(),
    }
}

fn incomplete_title(title: &CatalogTitle, entry: Option<&LibraryEntry>, local_update: u32) -> IncompleteTitle {
    IncompleteTitle {
        title_id: title.id,
        name: best_name(title, entry),
        local_update,
        latest_update: title.latest_version(),
        latest_update_date: title.latest_release_date().and_then(format_date),
        missing_dlc: Vec::new(),
    }
}

/// Add-ons the catalog advertises for each locally owned base title that are
/// neither present nor ignored, keyed by base title id. Listing the base id
/// itself ignores every add-on of that title.
#[tracing::instrument(level = "debug", skip_all)]
pub fn missing_dlc(
    local: &LocalLibrary,
    catalog: &TitleCatalog,
    ignore: &IgnoreList,
) -> BTreeMap<TitleId, IncompleteTitle> {
    let mut result = BTreeMap::new();
    for entry in local.complete().filter(|e| !ignore.contains(e.base_id)) {
        let Some(title) = catalog.titles.get(&entry.base_id) else {
            continue;
        };
        let owned: BTreeSet<TitleId> = entry.dlc.iter().map(|d| d.metadata.title_id).collect();
        let missing: Vec<String> = title
            .add_ons
            .values()
            .filter(|add_on| !owned.contains(&add_on.id) && !ignore.contains(add_on.id))
            .map(|add_on| match add_on.name.is_empty() {
                true => add_on.id.to_string(),
                false => format!("{} [{}]", add_on.id, add_on.name),
            })
            .collect();
        if !missing.is_empty() {
            let mut incomplete = incomplete_title(title, Some(entry), entry.latest_update());
            incomplete.missing_dlc = missing;
            result.insert(entry.base_id, incomplete);
        }
    }
    result
}

/// Locally owned titles (and, unless `ignore_dlc_updates`, add-ons) whose
/// newest local version is behind the catalog.
///
/// Base titles are keyed by base id, add-ons by their own id. A base title is
/// ignored when either its base or update id is listed.
#[tracing::instrument(level = "debug", skip(local, catalog, ignore))]
pub fn missing_updates(
    local: &LocalLibrary,
    catalog: &TitleCatalog,
    ignore: &IgnoreList,
    ignore_dlc_updates: bool,
) -> BTreeMap<TitleId, IncompleteTitle> {
    let mut result = BTreeMap::new();
    for entry in local.complete() {
        let Some(title) = catalog.titles.get(&entry.base_id) else {
            continue;
        };
        let ignored = ignore.contains(entry.base_id) || ignore.contains(entry.base_id.update());
        if !ignored && entry.latest_update() < title.latest_version() {
            result.insert(entry.base_id, incomplete_title(title, Some(entry), entry.latest_update()));
        }
        if ignore_dlc_updates {
            continue;
        }

        let mut owned: BTreeMap<TitleId, u32> = BTreeMap::new();
        for dlc in &entry.dlc {
            let version = owned.entry(dlc.metadata.title_id).or_default();
            *version = (*version).max(dlc.metadata.version);
        }
        for (id, version) in owned {
            let Some(add_on) = title.add_ons.get(&id) else {
                continue;
            };
            if !ignore.contains(id) && version < add_on.latest_version() {
                let mut incomplete = incomplete_title(add_on, None, version);
                if incomplete.name.is_empty() {
                    let local_name =
                        entry.dlc.iter().filter(|d| d.metadata.title_id == id).find_map(|d| d.metadata.display_name());
                    incomplete.name = local_name.unwrap_or_default().to_string();
                }
                result.insert(id, incomplete);
            }
        }
    }
    result
}

/// Catalog titles with a name that have no local entry at all.
///
/// A title with only updates or add-ons on disk counts as present.
#[tracing::instrument(level = "debug", skip(local, catalog))]
pub fn missing_games(local: &LocalLibrary, catalog: &TitleCatalog, hide_demo: bool) -> Vec<MissingTitle> {
    catalog
        .titles
        .values()
        .filter(|title| !title.name.is_empty())
        .filter(|title| !local.titles.contains_key(&title.id))
        .filter(|title| !(hide_demo && title.is_demo))
        .map(|title| MissingTitle {
            name: title.name.clone(),
            title_id: title.id,
            icon: title.banner_url.clone().or_else(|| title.icon_url.clone()),
            region: title.region.clone(),
            release_date: title.release_date.and_then(format_date),
        })
        .collect()
}

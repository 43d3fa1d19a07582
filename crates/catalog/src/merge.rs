//! Merging of the titles and versions documents.

use crate::error::{ErrorKind, Result};
use crate::models::{CatalogTitle, TitleCatalog};
use exn::ResultExt;
use nxshelf_container::models::{ContentKind, TitleId};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use time::macros::format_description;
use time::{Date, Month};
use tracing::instrument;

/// An entry of the titles document. Only the fields we use are declared;
/// the rest are ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTitle {
    id: Option<String>,
    name: Option<String>,
    region: Option<String>,
    icon_url: Option<String>,
    banner_url: Option<String>,
    release_date: Option<Value>,
    is_demo: Option<bool>,
}

/// `YYYYMMDD`, as a number or a string.
fn compact_date(value: &Value) -> Option<Date> {
    let raw = match value {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    let year = i32::try_from(raw / 10_000).ok()?;
    let month = Month::try_from(u8::try_from(raw / 100 % 100).ok()?).ok()?;
    Date::from_calendar_date(year, month, u8::try_from(raw % 100).ok()?).ok()
}

fn iso_date(value: &str) -> Option<Date> {
    Date::parse(value.trim(), format_description!("[year]-[month]-[day]")).ok()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl CatalogTitle {
    fn apply(&mut self, raw: RawTitle) {
        // The titles document lists one entry per storefront region; keep
        // the first name seen and fill in whatever it lacked from later ones.
        if self.name.is_empty() {
            self.name = raw.name.map(|n| n.trim().to_string()).unwrap_or_default();
        }
        self.region = self.region.take().or(non_empty(raw.region));
        self.icon_url = self.icon_url.take().or(non_empty(raw.icon_url));
        self.banner_url = self.banner_url.take().or(non_empty(raw.banner_url));
        self.release_date = self.release_date.or(raw.release_date.as_ref().and_then(compact_date));
        self.is_demo |= raw.is_demo.unwrap_or(false);
    }
}

/// Builds a [`TitleCatalog`] from the raw titles and versions documents.
///
/// Titles present in only one document are kept with defaults for the other
/// half. Entries without a usable title id are ignored.
///
/// # Errors
///
/// Returns [`ErrorKind::MalformedDocument`] when either document is not the
/// expected JSON object.
#[instrument(skip_all, fields(titles_bytes = titles.len(), versions_bytes = versions.len()))]
pub fn build_catalog(titles: &[u8], versions: &[u8]) -> Result<TitleCatalog> {
    let raw_titles: BTreeMap<String, RawTitle> =
        serde_json::from_slice(titles).or_raise(|| ErrorKind::MalformedDocument("titles"))?;
    let raw_versions: BTreeMap<String, BTreeMap<String, Value>> =
        serde_json::from_slice(versions).or_raise(|| ErrorKind::MalformedDocument("versions"))?;

    let mut bases: BTreeMap<TitleId, CatalogTitle> = BTreeMap::new();
    let mut add_ons: BTreeMap<TitleId, CatalogTitle> = BTreeMap::new();
    let mut ignored = 0usize;
    for raw in raw_titles.into_values() {
        let Some(id) = raw.id.as_deref().and_then(|id| id.parse::<TitleId>().ok()) else {
            ignored += 1;
            continue;
        };
        let slot = match id.kind() {
            ContentKind::Base => &mut bases,
            ContentKind::AddOn => &mut add_ons,
            ContentKind::Update => continue,
        };
        slot.entry(id).or_insert_with(|| CatalogTitle::new(id)).apply(raw);
    }

    for (id, published) in raw_versions {
        let Ok(id) = id.parse::<TitleId>() else {
            ignored += 1;
            continue;
        };
        let slot = match id.kind() {
            ContentKind::Base => &mut bases,
            ContentKind::AddOn => &mut add_ons,
            ContentKind::Update => continue,
        };
        let title = slot.entry(id).or_insert_with(|| CatalogTitle::new(id));
        for (version, released) in published {
            if let Ok(version) = version.parse::<u32>() {
                title.versions.insert(version, released.as_str().and_then(iso_date));
            }
        }
    }

    for (id, add_on) in add_ons {
        let base = id.base();
        bases.entry(base).or_insert_with(|| CatalogTitle::new(base)).add_ons.insert(id, add_on);
    }
    if ignored > 0 {
        tracing::debug!(ignored, "Ignored catalog entries without a valid title id");
    }
    tracing::info!(titles = bases.len(), "Built title catalog");
    Ok(TitleCatalog { titles: bases })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use time::macros::date;

    const TITLES: &str = r#"{
        "70010000000025": {
            "id": "0100000000010000", "name": "Odyssey", "region": "US",
            "iconUrl": "https://img/icon.png", "bannerUrl": null,
            "releaseDate": 20171027, "isDemo": false, "publisher": "Big N"
        },
        "70010000000026": {
            "id": "0100000000010000", "name": "Odyssey (EU)", "region": "GB",
            "bannerUrl": "https://img/banner.png", "releaseDate": 20171027
        },
        "70010000000027": { "id": "0100000000011001", "name": "Costume Pack", "releaseDate": null },
        "70010000000028": { "id": "0100000000020000", "name": "Demo Quest", "isDemo": true },
        "70010000000029": { "id": null, "name": "Bundle" },
        "70010000000030": { "id": "0100000000030000", "name": "Titles Only" }
    }"#;

    const VERSIONS: &str = r#"{
        "0100000000010000": { "65536": "2018-01-01", "131072": "2019-06-01" },
        "0100000000011001": { "65536": "2018-02-01" },
        "0100000000040000": { "65536": "2020-01-01" },
        "not-an-id": { "1": "2020-01-01" }
    }"#;

    #[test]
    fn test_merges_both_documents() {
        let catalog = build_catalog(TITLES.as_bytes(), VERSIONS.as_bytes()).unwrap();
        let odyssey = catalog.get(TitleId::new(0x0100000000010000)).unwrap();
        assert_eq!(odyssey.name, "Odyssey");
        assert_eq!(odyssey.region.as_deref(), Some("US"));
        assert_eq!(odyssey.banner_url.as_deref(), Some("https://img/banner.png"));
        assert_eq!(odyssey.release_date, Some(date!(2017 - 10 - 27)));
        assert_eq!(odyssey.latest_version(), 131072);
        assert_eq!(odyssey.latest_release_date(), Some(date!(2019 - 06 - 01)));

        let add_on = &odyssey.add_ons[&TitleId::new(0x0100000000011001)];
        assert_eq!(add_on.name, "Costume Pack");
        assert_eq!(add_on.latest_version(), 65536);

        assert!(catalog.get(TitleId::new(0x0100000000020000)).unwrap().is_demo);
    }

    #[test]
    fn test_keeps_titles_found_in_one_document() {
        let catalog = build_catalog(TITLES.as_bytes(), VERSIONS.as_bytes()).unwrap();
        let titles_only = catalog.get(TitleId::new(0x0100000000030000)).unwrap();
        assert_eq!(titles_only.name, "Titles Only");
        assert!(titles_only.versions.is_empty());

        let versions_only = catalog.get(TitleId::new(0x0100000000040000)).unwrap();
        assert!(versions_only.name.is_empty());
        assert_eq!(versions_only.latest_version(), 65536);
        assert_eq!(catalog.len(), 4);
    }

    #[rstest]
    #[case(b"not json".as_slice(), b"{}".as_slice(), "titles")]
    #[case(b"{}".as_slice(), b"[1, 2]".as_slice(), "versions")]
    #[case(b"{\"x\": {\"name\": 7}}".as_slice(), b"{}".as_slice(), "titles")]
    fn test_malformed_documents(#[case] titles: &[u8], #[case] versions: &[u8], #[case] which: &str) {
        let err = build_catalog(titles, versions).unwrap_err();
        assert!(matches!(&*err, ErrorKind::MalformedDocument(doc) if *doc == which));
    }

    #[rstest]
    #[case(serde_json::json!(20171027), Some(date!(2017 - 10 - 27)))]
    #[case(serde_json::json!("20200229"), Some(date!(2020 - 02 - 29)))]
    #[case(serde_json::json!(20171332), None)]
    #[case(serde_json::json!(null), None)]
    fn test_compact_date(#[case] value: Value, #[case] expected: Option<Date>) {
        assert_eq!(compact_date(&value), expected);
    }
}

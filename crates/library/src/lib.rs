//! Scanning, completeness analysis and organization of a local game library.
//!
//! The usual flow is: [`scan::Scanner`] builds a [`scan::LocalLibrary`] from
//! the configured folders, [`nxshelf_catalog::CatalogSources`] loads the
//! remote [`nxshelf_catalog::TitleCatalog`], then [`analyze`] diffs the two
//! and [`organize::Organizer`] moves files into place. Every step takes the
//! configuration snapshot it needs as arguments.

pub mod analyze;
pub mod error;
pub mod organize;
pub mod report;
pub mod scan;
pub mod template;

pub use nxshelf_progress as progress;

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use nxshelf_cache::Database;
use nxshelf_catalog::CatalogSources;
use nxshelf_config::Settings;

/// File name of the scan cache inside the data directory.
pub const CACHE_FILE: &str = "scan-cache.sqlite";

/// Catalog sources configured from a settings snapshot, caching documents in
/// the data directory and starting from the remembered freshness tokens.
pub fn catalog_sources(settings: &Settings) -> Result<CatalogSources> {
    let data_dir = settings.data_dir().or_raise(|| ErrorKind::Catalog)?;
    let sources = CatalogSources::new(&settings.titles_json_url, &settings.versions_json_url, data_dir)
        .or_raise(|| ErrorKind::Catalog)?;
    Ok(sources.with_tokens(settings.titles_etag.clone(), settings.versions_etag.clone()))
}

/// Opens the scan cache in the data directory, creating it if needed.
pub async fn open_cache(settings: &Settings) -> Result<Database> {
    let data_dir = settings.data_dir().or_raise(|| ErrorKind::Cache)?;
    tokio::fs::create_dir_all(&data_dir).await.or_raise(|| ErrorKind::Cache)?;
    Database::connect(data_dir.join(CACHE_FILE)).await.or_raise(|| ErrorKind::Cache)
}

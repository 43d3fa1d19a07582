//! Remote title catalog.
//!
//! Two JSON documents describe every known title: one with per-title
//! attributes (name, region, artwork, release date) and one listing each
//! title's published versions. Both are fetched conditionally, cached on
//! disk next to their freshness tokens, and merged into a [`TitleCatalog`].

pub mod error;
mod fetch;
mod merge;
mod models;
mod sources;

pub use crate::fetch::{Fetched, fetch_conditional, token_path};
pub use crate::merge::build_catalog;
pub use crate::models::{CatalogTitle, TitleCatalog};
pub use crate::sources::{CatalogSources, Loaded, TITLES_FILE, VERSIONS_FILE};

//! SQLite scan cache.
//!
//! Remembers what the container parser found in each file, keyed by the
//! file's fingerprint (path, size, modification time). The cache is never the
//! source of truth: deleting it only means the next scan parses every file
//! again.

mod db;
pub mod error;
mod models;
mod repo;

pub use crate::db::Database;
pub use crate::models::Fingerprint;
pub use crate::repo::Repository;

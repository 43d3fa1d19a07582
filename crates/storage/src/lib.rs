pub mod backend;
pub mod error;
pub mod file;
pub mod fs;
mod path;

pub use crate::backend::{LocalBackend, StorageBackend};
pub use crate::file::FileInfo;
pub use crate::path::validate as validate_path;

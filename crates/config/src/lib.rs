//! Configuration snapshot for nxshelf.
//!
//! Settings are layered with `figment`: built-in defaults, then an optional
//! settings file (TOML, YAML or JSON, picked by extension), then environment
//! variables prefixed with `NXSHELF_`. Nested keys use `__`, for example
//! `NXSHELF_ORGANIZE__RENAME_FILES=true`.
//!
//! A [`Settings`] value is an immutable snapshot: every operation receives
//! the snapshot it should work with instead of re-reading configuration.

pub mod error;
mod settings;

pub use crate::settings::{
    DEFAULT_FILE_TEMPLATE, DEFAULT_FOLDER_TEMPLATE, DEFAULT_TITLES_URL, DEFAULT_VERSIONS_URL, OrganizeOptions,
    Settings,
};

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

pub const DEFAULT_TITLES_URL: &str = "https://tinfoil.media/repo/db/titles.json";
pub const DEFAULT_VERSIONS_URL: &str = "https://tinfoil.media/repo/db/versions.json";
pub const DEFAULT_FOLDER_TEMPLATE: &str = "{{ name|safe }}";
pub const DEFAULT_FILE_TEMPLATE: &str =
    "{{ name|safe }}{% if dlc_name %} [{{ dlc_name|safe }}]{% endif %} [{{ title_id }}][v{{ version }}]";
const ENV_PREFIX: &str = "NXSHELF_";
const SETTINGS_FILE: &str = "settings.toml";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "nxshelf", "nxshelf")
}

/// How the organizer lays out a library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizeOptions {
    /// Move every title's files into a folder named by `folder_name_template`.
    pub create_folder_per_game: bool,
    pub folder_name_template: String,
    /// Rename files using `file_name_template`.
    pub rename_files: bool,
    pub file_name_template: String,
    pub delete_empty_folders: bool,
    /// Remove superseded update files before organizing.
    pub delete_old_update_files: bool,
}
impl Default for OrganizeOptions {
    fn default() -> Self {
        Self {
            create_folder_per_game: false,
            folder_name_template: DEFAULT_FOLDER_TEMPLATE.to_string(),
            rename_files: false,
            file_name_template: DEFAULT_FILE_TEMPLATE.to_string(),
            delete_empty_folders: false,
            delete_old_update_files: false,
        }
    }
}
impl OrganizeOptions {
    /// Every enabled step needs a non-blank template.
    pub fn is_valid(&self) -> bool {
        (!self.create_folder_per_game || !self.folder_name_template.trim().is_empty())
            && (!self.rename_files || !self.file_name_template.trim().is_empty())
    }
}

/// Immutable configuration snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// The main library folder; organizing happens relative to it.
    pub folder: Option<PathBuf>,
    /// Additional folders that are scanned but never organized into.
    pub scan_folders: Vec<PathBuf>,
    pub scan_recursively: bool,
    /// Title ids whose missing updates are never reported.
    pub ignore_update_title_ids: Vec<String>,
    /// Add-on ids that are never reported as missing.
    pub ignore_dlc_title_ids: Vec<String>,
    /// Skip add-on version bumps when looking for missing updates.
    pub ignore_dlc_updates: bool,
    pub hide_demo_games: bool,
    pub organize: OrganizeOptions,
    pub titles_json_url: String,
    pub versions_json_url: String,
    /// Freshness tokens of the cached catalog documents.
    pub titles_etag: Option<String>,
    pub versions_etag: Option<String>,
    /// Parallel parse workers; defaults to the available parallelism.
    pub scan_workers: Option<usize>,
    /// Where the catalog documents and scan cache are stored.
    pub data_dir: Option<PathBuf>,
}
impl Default for Settings {
    fn default() -> Self {
        Self {
            folder: None,
            scan_folders: Vec::new(),
            scan_recursively: true,
            ignore_update_title_ids: Vec::new(),
            ignore_dlc_title_ids: Vec::new(),
            ignore_dlc_updates: false,
            hide_demo_games: true,
            organize: OrganizeOptions::default(),
            titles_json_url: DEFAULT_TITLES_URL.to_string(),
            versions_json_url: DEFAULT_VERSIONS_URL.to_string(),
            titles_etag: None,
            versions_etag: None,
            scan_workers: None,
            data_dir: None,
        }
    }
}

impl Settings {
    /// The platform settings file, e.g. `~/.config/nxshelf/settings.toml`.
    pub fn default_file() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(SETTINGS_FILE))
    }

    /// Builds the provider stack without extracting it.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        if let Some(file) = file {
            let extension = file.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
            figment = match extension.as_deref() {
                Some("toml") => figment.merge(Toml::file(file)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(file)),
                Some("json") => figment.merge(Json::file(file)),
                _ => exn::bail!(ErrorKind::UnsupportedFile(file.to_path_buf())),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Loads a snapshot. A missing settings file is not an error; its
    /// layer is simply empty.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let settings: Settings = Self::figment(file)?.extract().or_raise(|| ErrorKind::Load)?;
        tracing::debug!(file = ?file, folders = settings.scan_folders().len(), "Loaded settings");
        Ok(settings)
    }

    /// Rejects configurations no operation could run with.
    pub fn validate(&self) -> Result<()> {
        if self.scan_folders().is_empty() {
            exn::bail!(ErrorKind::Invalid("no library folder is configured"));
        }
        if !self.organize.is_valid() {
            exn::bail!(ErrorKind::Invalid("organize options need a folder or file name template"));
        }
        if self.scan_workers == Some(0) {
            exn::bail!(ErrorKind::Invalid("scan workers must be at least 1"));
        }
        Ok(())
    }

    /// The main folder followed by any extra scan folders, without
    /// duplicates.
    pub fn scan_folders(&self) -> Vec<PathBuf> {
        let mut folders: Vec<PathBuf> = Vec::new();
        for folder in self.folder.iter().chain(&self.scan_folders) {
            if !folder.as_os_str().is_empty() && !folders.contains(folder) {
                folders.push(folder.clone());
            }
        }
        folders
    }

    pub fn workers(&self) -> usize {
        self.scan_workers
            .filter(|w| *w > 0)
            .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, NonZeroUsize::get))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(project_dirs().ok_or_raise(|| ErrorKind::NoDataDir)?.data_dir().to_path_buf()),
        }
    }
}

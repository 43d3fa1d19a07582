use crate::error::{ErrorKind, Result};
use crate::fetch::{fetch_conditional, read_token};
use crate::merge::build_catalog;
use crate::models::TitleCatalog;
use exn::ResultExt;
use nxshelf_progress::Progress;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::instrument;

pub const TITLES_FILE: &str = "titles.json";
pub const VERSIONS_FILE: &str = "versions.json";
const TOTAL_STEPS: u64 = 4;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// The catalog together with the tokens the caller should persist.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub catalog: TitleCatalog,
    pub titles_token: Option<String>,
    pub versions_token: Option<String>,
}

/// Where the two catalog documents come from and where they are cached.
#[derive(Debug, Clone)]
pub struct CatalogSources {
    client: Client,
    titles_url: String,
    versions_url: String,
    cache_dir: PathBuf,
    titles_token: Option<String>,
    versions_token: Option<String>,
}
impl CatalogSources {
    pub fn new(titles_url: impl Into<String>, versions_url: impl Into<String>, cache_dir: impl Into<PathBuf>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("nxshelf/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .or_raise(|| ErrorKind::Network("client setup".to_string()))?;
        Ok(Self {
            client,
            titles_url: titles_url.into(),
            versions_url: versions_url.into(),
            cache_dir: cache_dir.into(),
            titles_token: None,
            versions_token: None,
        })
    }

    /// Freshness tokens remembered from an earlier load.
    pub fn with_tokens(mut self, titles: Option<String>, versions: Option<String>) -> Self {
        self.titles_token = titles;
        self.versions_token = versions;
        self
    }

    pub fn titles_path(&self) -> PathBuf {
        self.cache_dir.join(TITLES_FILE)
    }

    pub fn versions_path(&self) -> PathBuf {
        self.cache_dir.join(VERSIONS_FILE)
    }

    async fn read_cached(path: &Path) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).or_raise(|| ErrorKind::Cache(path.display().to_string())),
        }
    }

    /// Loads the catalog.
    ///
    /// Without `refresh`, cached documents are used as-is when both exist.
    /// Otherwise both documents are fetched concurrently and conditionally.
    /// `progress` is updated at four checkpoints.
    #[instrument(skip(self, progress), fields(cache_dir = %self.cache_dir.display()))]
    pub async fn load(&self, refresh: bool, progress: &dyn Progress) -> Result<Loaded> {
        let (titles_path, versions_path) = (self.titles_path(), self.versions_path());
        progress.update(0, TOTAL_STEPS, "Loading title database");

        let cached = match refresh {
            true => None,
            false => match (Self::read_cached(&titles_path).await?, Self::read_cached(&versions_path).await?) {
                (Some(titles), Some(versions)) => Some((titles, versions)),
                _ => None,
            },
        };
        let (titles, versions, titles_token, versions_token) = match cached {
            Some((titles, versions)) => {
                tracing::debug!("Using cached catalog documents");
                progress.update(2, TOTAL_STEPS, "Using cached title database");
                let titles_token = self.titles_token.clone().or(read_token(&titles_path).await);
                let versions_token = self.versions_token.clone().or(read_token(&versions_path).await);
                (titles, versions, titles_token, versions_token)
            },
            None => {
                progress.update(1, TOTAL_STEPS, "Downloading title database");
                let (titles, versions) = futures::try_join!(
                    fetch_conditional(&self.client, &self.titles_url, &titles_path, self.titles_token.as_deref()),
                    fetch_conditional(&self.client, &self.versions_url, &versions_path, self.versions_token.as_deref()),
                )?;
                progress.update(2, TOTAL_STEPS, "Downloaded title database");
                (titles.bytes, versions.bytes, titles.token, versions.token)
            },
        };

        progress.update(3, TOTAL_STEPS, "Building title catalog");
        let catalog = build_catalog(&titles, &versions)?;
        progress.update(TOTAL_STEPS, TOTAL_STEPS, "Title catalog ready");
        Ok(Loaded { catalog, titles_token, versions_token })
    }
}

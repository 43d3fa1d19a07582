//! Conditional download of one document.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use nxshelf_storage::fs::{exists, write_atomic};
use reqwest::header::{ETAG, IF_NONE_MATCH};
use reqwest::{Client, StatusCode};
use std::path::{Path, PathBuf};
use tracing::instrument;

/// A document's bytes and the token that identifies them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    pub bytes: Vec<u8>,
    pub token: Option<String>,
    /// `false` when the server confirmed the cached copy is current.
    pub fresh: bool,
}

/// The sidecar file holding a cached document's freshness token.
pub fn token_path(cache_path: &Path) -> PathBuf {
    let mut name = cache_path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".etag");
    cache_path.with_file_name(name)
}

fn cache_error(path: &Path) -> ErrorKind {
    ErrorKind::Cache(path.display().to_string())
}

pub(crate) async fn read_token(cache_path: &Path) -> Option<String> {
    let token = tokio::fs::read_to_string(token_path(cache_path)).await.ok()?;
    Some(token.trim().to_string()).filter(|t| !t.is_empty())
}

/// Downloads `url` unless the copy at `cache_path` is still current.
///
/// The validator sent is `prior_token`, or the token stored next to the cache
/// file when none is given; it is only sent when the cache file exists. On
/// `304 Not Modified` the cached bytes are returned and the token kept. On
/// `200 OK` the new bytes and token are persisted atomically before
/// returning.
///
/// # Errors
///
/// Transport failures and any other status are errors; the stale cache is
/// never substituted.
#[instrument(skip(client, prior_token), fields(cache = %cache_path.display()))]
pub async fn fetch_conditional(
    client: &Client,
    url: &str,
    cache_path: &Path,
    prior_token: Option<&str>,
) -> Result<Fetched> {
    let cached = exists(cache_path).await.or_raise(|| cache_error(cache_path))?;
    let token = match prior_token {
        Some(token) => Some(token.to_string()),
        None => read_token(cache_path).await,
    };
    let mut request = client.get(url);
    if let (true, Some(token)) = (cached, &token) {
        request = request.header(IF_NONE_MATCH, token);
    }
    let response = request.send().await.or_raise(|| ErrorKind::Network(url.to_string()))?;

    match response.status() {
        StatusCode::NOT_MODIFIED if cached => {
            tracing::debug!("Remote document unchanged; using cached copy");
            let bytes = tokio::fs::read(cache_path).await.or_raise(|| cache_error(cache_path))?;
            Ok(Fetched { bytes, token, fresh: false })
        },
        status if status.is_success() => {
            let new_token = response.headers().get(ETAG).and_then(|v| v.to_str().ok()).map(str::to_string);
            let bytes = response.bytes().await.or_raise(|| ErrorKind::Network(url.to_string()))?.to_vec();
            write_atomic(cache_path, &bytes).await.or_raise(|| cache_error(cache_path))?;
            let sidecar = token_path(cache_path);
            match &new_token {
                Some(token) => write_atomic(&sidecar, token.as_bytes()).await.or_raise(|| cache_error(&sidecar))?,
                None if exists(&sidecar).await.unwrap_or(false) => {
                    nxshelf_storage::fs::remove_file(&sidecar).await.or_raise(|| cache_error(&sidecar))?
                },
                None => {},
            }
            tracing::info!(bytes = bytes.len(), "Downloaded remote document");
            Ok(Fetched { bytes, token: new_token, fresh: true })
        },
        status => exn::bail!(ErrorKind::Http { status: status.as_u16(), url: url.to_string() }),
    }
}

//! Document downloads.

use crate::error::FetchError;
use crate::layout::destination_name;
use regex::Regex;
use reqwest::StatusCode;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, warn};
use url::Url;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";

static VERSION_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"v\d+$").expect("valid regex"));

/// Rewrites arXiv abstract links to direct PDF links.
///
/// Only `/abs/` URLs on an `arxiv.org` host are touched: `/abs/` becomes
/// `/pdf/`, a version marker at the end of the last path segment is dropped
/// and `.pdf` is appended. Direct PDF links keep the version they name.
pub fn normalize_pdf_url(raw: &str) -> Result<Url, FetchError> {
    let mut url = Url::parse(raw).map_err(|source| FetchError::InvalidUrl {
        url: raw.to_string(),
        source,
    })?;

    let is_arxiv = url
        .host_str()
        .is_some_and(|host| host == "arxiv.org" || host.ends_with(".arxiv.org"));
    if !is_arxiv {
        return Ok(url);
    }

    let mut segments: Vec<String> = url
        .path_segments()
        .map(|segments| {
            segments
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    if segments.first().map(String::as_str) != Some("abs") {
        return Ok(url);
    }
    segments[0] = "pdf".to_string();
    if let Some(last) = segments.last_mut() {
        *last = format!("{}.pdf", VERSION_SUFFIX.replace(last, ""));
    }

    url.set_path(&segments.join("/"));
    Ok(url)
}

/// HTTP downloader with a fixed timeout and a browser-like User-Agent.
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client })
    }

    /// Body of `url` after arXiv normalization. Any status but 200 is an error.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let url = normalize_pdf_url(url)?;
        info!(%url, "downloading");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| FetchError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!(%url, status = status.as_u16(), "download refused");
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|source| FetchError::Http {
            url: url.to_string(),
            source,
        })?;

        debug!(%url, bytes = body.len(), "download complete");
        Ok(body.to_vec())
    }
}

/// Writes a downloaded document to `dir/<file_name>.pdf`, replacing any file
/// of the same name.
pub async fn save(body: &[u8], dir: &Path, file_name: &str) -> Result<PathBuf, FetchError> {
    let path = dir.join(destination_name(file_name));

    fs::create_dir_all(dir)
        .await
        .map_err(|source| FetchError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    fs::write(&path, body)
        .await
        .map_err(|source| FetchError::Io {
            path: path.clone(),
            source,
        })?;

    info!(path = %path.display(), "file written");
    Ok(path)
}

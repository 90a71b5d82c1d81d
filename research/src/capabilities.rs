//! The operations a research run is allowed to perform.
//!
//! The orchestrator and its tools only reach the outside world through
//! [`Capabilities`], which makes every run injectable and testable.

use crate::corpus::{Corpus, CorpusReader};
use crate::error::{CorpusError, FetchError, RenderError, SearchError};
use crate::fetch::{self, Fetcher};
use crate::render::ReportRenderer;
use crate::sources::{PaperSource, SearchResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[async_trait]
pub trait Capabilities: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError>;

    /// Body of one document. Nothing touches the disk.
    async fn download(&self, url: &str) -> Result<Vec<u8>, FetchError>;

    /// Stores a downloaded document as `dir/<file_name>.pdf`.
    async fn save(&self, body: &[u8], dir: &Path, file_name: &str) -> Result<PathBuf, FetchError>;

    async fn read_corpus(&self, dir: &Path) -> Result<Corpus, CorpusError>;

    async fn render(&self, text: &str, path: &Path) -> Result<PathBuf, RenderError>;
}

/// Production capabilities: a paper index, HTTP downloads, lopdf on both ends.
pub struct Toolkit {
    source: Arc<dyn PaperSource>,
    max_results: usize,
    fetcher: Fetcher,
    reader: CorpusReader,
    renderer: ReportRenderer,
}

impl Toolkit {
    pub fn new(
        source: Arc<dyn PaperSource>,
        max_results: usize,
        fetcher: Fetcher,
        reader: CorpusReader,
        renderer: ReportRenderer,
    ) -> Self {
        Self {
            source,
            max_results,
            fetcher,
            reader,
            renderer,
        }
    }
}

#[async_trait]
impl Capabilities for Toolkit {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        self.source.search(query, self.max_results).await
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.fetcher.download(url).await
    }

    async fn save(&self, body: &[u8], dir: &Path, file_name: &str) -> Result<PathBuf, FetchError> {
        fetch::save(body, dir, file_name).await
    }

    async fn read_corpus(&self, dir: &Path) -> Result<Corpus, CorpusError> {
        self.reader.read(dir).await
    }

    async fn render(&self, text: &str, path: &Path) -> Result<PathBuf, RenderError> {
        let renderer = self.renderer;
        let text = text.to_string();
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || renderer.render(&text, &path)).await?
    }
}

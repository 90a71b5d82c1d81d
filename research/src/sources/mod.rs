//! Preprint index clients.

pub mod arxiv;

use crate::error::SearchError;
use async_trait::async_trait;
use serde::Serialize;

pub use arxiv::ArxivClient;

/// Longest abstract excerpt carried by a [`SearchResult`], in characters.
pub const SUMMARY_CHARS: usize = 100;

/// One match from a preprint index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub title: String,
    pub pdf_url: String,
    /// First [`SUMMARY_CHARS`] characters of the abstract.
    pub summary: String,
}

impl SearchResult {
    /// Listing line handed to the search agent.
    pub fn describe(&self) -> String {
        format!(
            "Title: {}\nPDF_URL: {}\nSummary: {}...\n",
            self.title, self.pdf_url, self.summary
        )
    }
}

/// Common interface for preprint indices.
#[async_trait]
pub trait PaperSource: Send + Sync {
    /// Most recently submitted matches first. An empty list means nothing matched.
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError>;
}

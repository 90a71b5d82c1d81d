//! arXiv Atom API client.
//!
//! Queries `export.arxiv.org/api/query` sorted by submission date and maps
//! each feed entry to a [`SearchResult`].

use super::{PaperSource, SUMMARY_CHARS, SearchResult};
use crate::error::SearchError;
use async_trait::async_trait;
use quick_xml::de::from_str;
use serde::Deserialize;
use tracing::{debug, instrument};

pub const DEFAULT_API_URL: &str = "http://export.arxiv.org/api/query";

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(rename = "entry", default)]
    entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    /// Abstract page, e.g. `http://arxiv.org/abs/2401.01234v1`
    id: String,
    title: String,
    #[serde(default)]
    summary: String,
    #[serde(rename = "link", default)]
    links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
struct Link {
    #[serde(rename = "@href")]
    href: String,
    #[serde(rename = "@title")]
    title: Option<String>,
}

impl Entry {
    fn is_error(&self) -> bool {
        self.id.contains("/api/errors")
    }

    fn pdf_url(&self) -> String {
        self.links
            .iter()
            .find(|link| link.title.as_deref() == Some("pdf"))
            .map(|link| link.href.clone())
            .unwrap_or_else(|| self.id.replacen("/abs/", "/pdf/", 1))
    }

    fn into_result(self) -> SearchResult {
        let pdf_url = self.pdf_url();
        SearchResult {
            title: collapse_whitespace(&self.title),
            pdf_url,
            summary: collapse_whitespace(&self.summary)
                .chars()
                .take(SUMMARY_CHARS)
                .collect(),
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parses an arXiv Atom feed, keeping at most `max_results` entries.
pub fn parse_feed(xml: &str, max_results: usize) -> Result<Vec<SearchResult>, SearchError> {
    let feed: Feed = from_str(xml)?;

    Ok(feed
        .entries
        .into_iter()
        .filter(|entry| !entry.is_error())
        .take(max_results)
        .map(Entry::into_result)
        .collect())
}

pub struct ArxivClient {
    client: reqwest::Client,
    api_url: String,
}

impl ArxivClient {
    pub fn new() -> Self {
        Self::with_api_url(DEFAULT_API_URL)
    }

    pub fn with_api_url(api_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
        }
    }
}

impl Default for ArxivClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaperSource for ArxivClient {
    #[instrument(skip(self))]
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let max_results_param = max_results.to_string();
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("search_query", query),
                ("start", "0"),
                ("max_results", max_results_param.as_str()),
                ("sortBy", "submittedDate"),
                ("sortOrder", "descending"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status(status.as_u16()));
        }

        let xml = response.text().await?;
        let results = parse_feed(&xml, max_results)?;

        debug!(count = results.len(), "arxiv search returned");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::get;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <link href="http://arxiv.org/api/query?search_query%3Dgnn" rel="self" type="application/atom+xml"/>
  <title type="html">ArXiv Query: search_query=gnn</title>
  <id>http://arxiv.org/api/feedid</id>
  <entry>
    <id>http://arxiv.org/abs/2401.01234v2</id>
    <updated>2024-01-03T00:00:00Z</updated>
    <published>2024-01-02T00:00:00Z</published>
    <title>Graph Neural Networks
      at Scale</title>
    <summary>  We study message passing on very large graphs and show that a carefully
      sampled neighbourhood keeps accuracy while cutting memory by an order of magnitude.</summary>
    <author><name>A. Author</name></author>
    <link href="http://arxiv.org/abs/2401.01234v2" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/2401.01234v2" rel="related" type="application/pdf"/>
    <category term="cs.LG" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2401.00042v1</id>
    <title>Spectral Filters</title>
    <summary>Short.</summary>
    <link href="http://arxiv.org/abs/2401.00042v1" rel="alternate" type="text/html"/>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_feed() -> Result<(), SearchError> {
        let results = parse_feed(FEED, 3)?;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Graph Neural Networks at Scale");
        assert_eq!(results[0].pdf_url, "http://arxiv.org/pdf/2401.01234v2");
        assert_eq!(results[0].summary.chars().count(), SUMMARY_CHARS);
        assert!(results[0].summary.starts_with("We study message passing"));

        // no pdf link: derived from the abstract id
        assert_eq!(results[1].pdf_url, "http://arxiv.org/pdf/2401.00042v1");
        assert_eq!(results[1].summary, "Short.");

        Ok(())
    }

    #[test]
    fn test_parse_feed_limits_results() -> Result<(), SearchError> {
        assert_eq!(parse_feed(FEED, 1)?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_parse_empty_and_error_feeds() -> Result<(), SearchError> {
        let empty = r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>nothing</title></feed>"#;
        assert!(parse_feed(empty, 3)?.is_empty());

        let error = r#"<feed xmlns="http://www.w3.org/2005/Atom">
          <entry><id>http://arxiv.org/api/errors#incorrect_id_format</id><title>Error</title>
          <summary>incorrect id format</summary></entry></feed>"#;
        assert!(parse_feed(error, 3)?.is_empty());

        Ok(())
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            parse_feed("<feed><entry>", 3),
            Err(SearchError::Feed(_))
        ));
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move { axum::serve(listener, app).await });
        format!("http://{}/api/query", addr)
    }

    #[tokio::test]
    async fn test_client_search() -> Result<(), SearchError> {
        let url = serve(Router::new().route("/api/query", get(|| async { FEED }))).await;

        let results = ArxivClient::with_api_url(url)
            .search("graph neural networks", 3)
            .await?;

        assert_eq!(results.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_client_status_error() {
        let url = serve(Router::new().route(
            "/api/query",
            get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        ))
        .await;

        let result = ArxivClient::with_api_url(url).search("anything", 3).await;
        assert!(matches!(result, Err(SearchError::Status(503))));
    }
}

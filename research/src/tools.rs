use crate::capabilities::Capabilities;
use crate::error::SearchError;
use crate::sources::SearchResult;
use agent::Result;
use agent::llm::Message;
use agent::tools::{FunctionalTool, ToolCall, ToolDefinition};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

pub const SEARCH_TOOL_NAME: &str = "search_arxiv";

/// Everything the search tool saw during one run.
#[derive(Debug, Default)]
pub struct SearchLedger {
    pub results: Vec<SearchResult>,
    pub calls: usize,
    /// Most recent failure, kept so a run with no results can report it.
    pub last_error: Option<SearchError>,
}

impl SearchLedger {
    /// Replaces the kept results with those of the latest search that found
    /// anything, dropping repeated PDF urls.
    pub fn record(&mut self, results: &[SearchResult]) {
        self.results.clear();
        for result in results {
            if !self.results.iter().any(|seen| seen.pdf_url == result.pdf_url) {
                self.results.push(result.clone());
            }
        }
    }
}

pub type SharedLedger = Arc<Mutex<SearchLedger>>;

#[derive(Deserialize, JsonSchema)]
struct SearchArgs {
    /// Keywords to look up on arXiv, e.g. "graph neural networks".
    query: String,
}

pub struct SearchArxiv {
    caps: Arc<dyn Capabilities>,
    ledger: SharedLedger,
}

impl SearchArxiv {
    pub fn new(caps: Arc<dyn Capabilities>, ledger: SharedLedger) -> Box<Self> {
        Box::new(Self { caps, ledger })
    }
}

#[async_trait]
impl FunctionalTool for SearchArxiv {
    fn definition(&self) -> Result<ToolDefinition> {
        ToolDefinition::new::<SearchArgs>(
            SEARCH_TOOL_NAME,
            "Search arXiv for recent papers on a topic. Returns titles, PDF links and short summaries.",
        )
    }

    async fn invoke_fn(&mut self, call: &ToolCall) -> Result<Message> {
        let args: SearchArgs = call.args()?;

        let outcome = self.caps.search(&args.query).await;

        let mut ledger = self.ledger.lock().await;
        ledger.calls += 1;

        let reply = match outcome {
            Ok(results) if results.is_empty() => "No papers found.".to_string(),
            Ok(results) => {
                info!(query = %args.query, count = results.len(), "search tool returned");
                ledger.record(&results);
                results
                    .iter()
                    .map(SearchResult::describe)
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            Err(err) => {
                warn!(query = %args.query, error = %err, "search tool failed");
                let reply = err.to_string();
                ledger.last_error = Some(err);
                reply
            }
        };

        Ok(call.reply(reply))
    }
}

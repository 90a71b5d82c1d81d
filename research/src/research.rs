use crate::capabilities::Capabilities;
use crate::error::PipelineError;
use crate::layout::{document_file_name, query_dir, report_path};
use crate::sources::SearchResult;
use crate::tools::{SearchArxiv, SearchLedger, SharedLedger};
use agent::callbacks::MessageLogger;
use agent::llm::{self, Message};
use agent::{Agent, AgentBuilder, StopCondition};
use futures::StreamExt;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

const SEARCH_PROMPT: &str = include_str!("prompts/search.md");
const REPORT_PROMPT: &str = include_str!("prompts/report.md");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Searching,
    Downloading,
    Extracting,
    Summarizing,
    Rendering,
    Done,
    Failed,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Searching => "searching",
            Stage::Downloading => "downloading",
            Stage::Extracting => "extracting",
            Stage::Summarizing => "summarizing",
            Stage::Rendering => "rendering",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Stops once the assistant answers without asking for a tool.
struct FinalAnswer;

impl StopCondition for FinalAnswer {
    fn done(&self, history: &[llm::Message]) -> bool {
        history.last().is_some_and(Message::is_final_answer)
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Root under which every query gets its own directory.
    pub papers_dir: PathBuf,
    pub max_agent_steps: usize,
    pub fetch_concurrency: usize,
    pub title_fragment_len: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            papers_dir: PathBuf::from("papers"),
            max_agent_steps: 16,
            fetch_concurrency: 3,
            title_fragment_len: 48,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Overrides `papers/<query>/final_report.pdf`.
    pub report_path: Option<PathBuf>,
    /// Stream the agents' output to stdout.
    pub echo: bool,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct ResearchReport {
    pub query: String,
    pub pdf_path: PathBuf,
    pub paper_titles: Vec<String>,
    pub downloaded: usize,
    pub skipped: usize,
}

pub struct Orchestrator {
    llm: Arc<dyn llm::LLM + Send + Sync>,
    caps: Arc<dyn Capabilities>,
    options: PipelineOptions,
}

impl Orchestrator {
    pub fn new(
        llm: Arc<dyn llm::LLM + Send + Sync>,
        caps: Arc<dyn Capabilities>,
        options: PipelineOptions,
    ) -> Self {
        Self { llm, caps, options }
    }

    pub fn papers_dir(&self) -> &Path {
        &self.options.papers_dir
    }

    pub async fn run(&self, query: &str, run: RunOptions) -> Result<ResearchReport, PipelineError> {
        let outcome = self.execute(query, &run).await;

        match &outcome {
            Ok(report) => info!(
                %query,
                stage = %Stage::Done,
                pdf = %report.pdf_path.display(),
                downloaded = report.downloaded,
                skipped = report.skipped,
                "research finished"
            ),
            Err(err) => error!(
                %query,
                stage = %Stage::Failed,
                failed_in = %err.stage(),
                error = %err,
                "research failed"
            ),
        }

        outcome
    }

    async fn execute(&self, query: &str, run: &RunOptions) -> Result<ResearchReport, PipelineError> {
        enter(Stage::Searching, query);
        let results = self.search(query, run.echo).await?;

        enter(Stage::Downloading, query);
        let dir = query_dir(&self.options.papers_dir, query);
        let (downloaded, skipped) = self.download(&results, &dir).await;

        enter(Stage::Extracting, query);
        let corpus_text = match self.caps.read_corpus(&dir).await {
            Ok(corpus) => corpus.to_prompt(),
            Err(err) => {
                warn!(error = %err, "no corpus; passing the error to the report agent");
                err.to_string()
            }
        };

        enter(Stage::Summarizing, query);
        let report = self.summarize(corpus_text, run.echo).await?;

        enter(Stage::Rendering, query);
        let target = run
            .report_path
            .clone()
            .unwrap_or_else(|| report_path(&self.options.papers_dir, query));
        let pdf_path = self.caps.render(&report, &target).await?;

        Ok(ResearchReport {
            query: query.to_string(),
            pdf_path,
            paper_titles: results.into_iter().map(|result| result.title).collect(),
            downloaded,
            skipped,
        })
    }

    fn agent(
        &self,
        name: &str,
        system_prompt: &str,
        echo: bool,
        builder: AgentBuilder,
    ) -> agent::Result<Agent> {
        let mut builder = builder
            .llm(self.llm.clone())
            .system_prompt(system_prompt.to_string())
            .stop_condition(Box::new(FinalAnswer))
            .max_steps(self.options.max_agent_steps);

        if echo {
            builder = builder.callback(MessageLogger::new(name, std::io::stdout())?.agent_output_only());
        }

        builder.build()
    }

    async fn search(&self, query: &str, echo: bool) -> Result<Vec<SearchResult>, PipelineError> {
        let ledger = SharedLedger::default();
        let agent_err = |source| PipelineError::Agent {
            stage: Stage::Searching,
            source,
        };

        let mut agent = self
            .agent(
                "Search agent",
                SEARCH_PROMPT,
                echo,
                AgentBuilder::new().tool(SearchArxiv::new(self.caps.clone(), ledger.clone())),
            )
            .map_err(agent_err)?;

        let outcome = agent
            .prompt(format!("Find recent research papers about: {}", query))
            .await;

        let SearchLedger {
            results,
            calls,
            last_error,
        } = std::mem::take(&mut *ledger.lock().await);

        match outcome {
            Err(source) if results.is_empty() => return Err(agent_err(source)),
            Err(source) => warn!(error = %source, "search agent failed; keeping what it found"),
            Ok(_) => {}
        }

        let results = if calls == 0 {
            info!(%query, "search agent never searched; searching the topic directly");
            self.caps.search(query).await?
        } else if let (true, Some(err)) = (results.is_empty(), last_error) {
            return Err(PipelineError::Search(err));
        } else {
            results
        };

        if results.is_empty() {
            return Err(PipelineError::NoPapersFound);
        }

        info!(count = results.len(), "papers found");
        Ok(results)
    }

    /// Downloads every result concurrently and stores them in result order,
    /// so a later result wins when two titles map to the same file name.
    /// Returns (downloaded, skipped).
    async fn download(&self, results: &[SearchResult], dir: &Path) -> (usize, usize) {
        let fragment_len = self.options.title_fragment_len;
        let jobs: Vec<(SearchResult, String)> = results
            .iter()
            .map(|result| (result.clone(), document_file_name(&result.title, fragment_len)))
            .collect();

        let caps = self.caps.clone();
        let mut transfers = futures::stream::iter(jobs)
            .map(move |(result, file_name)| {
                let caps = caps.clone();
                async move {
                    let body = caps.download(&result.pdf_url).await;
                    (result, file_name, body)
                }
            })
            .buffered(self.options.fetch_concurrency.max(1));

        let mut downloaded = 0;
        while let Some((result, file_name, body)) = transfers.next().await {
            let stored = match body {
                Ok(body) => self.caps.save(&body, dir, &file_name).await,
                Err(err) => Err(err),
            };
            match stored {
                Ok(_) => downloaded += 1,
                Err(err) => warn!(title = %result.title, error = %err, "skipping paper"),
            }
        }

        (downloaded, results.len() - downloaded)
    }

    async fn summarize(&self, corpus_text: String, echo: bool) -> Result<String, PipelineError> {
        let agent_err = |source| PipelineError::Agent {
            stage: Stage::Summarizing,
            source,
        };

        let mut agent = self
            .agent("Report agent", REPORT_PROMPT, echo, AgentBuilder::new())
            .map_err(agent_err)?;
        let messages = agent.prompt(corpus_text).await.map_err(agent_err)?;

        let report = messages
            .iter()
            .filter_map(Message::assistant_text)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");

        if report.is_empty() {
            return Err(PipelineError::EmptyReport);
        }
        Ok(report)
    }
}

fn enter(stage: Stage, query: &str) {
    info!(%query, %stage, "entering stage");
}

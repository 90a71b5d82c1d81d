use crate::capabilities::Toolkit;
use crate::console;
use crate::corpus::{CorpusReader, DEFAULT_MAX_CHARS};
use crate::error::FetchError;
use crate::fetch::{DEFAULT_USER_AGENT, Fetcher};
use crate::render::ReportRenderer;
use crate::research::{Orchestrator, PipelineOptions};
use crate::sources::ArxivClient;
use crate::sources::arxiv::DEFAULT_API_URL;
use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(version, about = "Search arXiv, read the papers, and write a research report")]
pub struct Cli {
    #[command(flatten)]
    pub settings: Settings,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the web form and the `POST /research` endpoint
    Serve {
        #[arg(long, env = "RESEARCH_BIND", default_value = "127.0.0.1:5000")]
        bind: SocketAddr,
    },
    /// Ask for a topic on the terminal and stream the agents' output
    Console {
        #[arg(long, default_value = console::DEFAULT_OUTPUT)]
        output: PathBuf,
    },
    /// Research one topic and print the JSON result
    Run { query: String },
}

#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// Where downloaded papers and reports are stored
    #[arg(long, global = true, env = "RESEARCH_PAPERS_DIR", default_value = "papers")]
    pub papers_dir: PathBuf,

    #[arg(long, global = true, env = "RESEARCH_MODEL", default_value = "gpt-4o")]
    pub model: String,

    /// OpenAI compatible endpoint, e.g. a local proxy
    #[arg(long, global = true, env = "OPENAI_BASE_URL")]
    pub openai_base_url: Option<String>,

    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    #[arg(long, global = true, env = "ARXIV_API_URL", default_value = DEFAULT_API_URL)]
    pub arxiv_url: String,

    /// Papers requested per search
    #[arg(long, global = true, env = "RESEARCH_MAX_RESULTS", default_value_t = 3)]
    pub max_results: usize,

    /// Characters kept from each paper
    #[arg(long, global = true, env = "RESEARCH_MAX_CHARS", default_value_t = DEFAULT_MAX_CHARS)]
    pub max_chars_per_paper: usize,

    #[arg(long, global = true, env = "RESEARCH_FETCH_TIMEOUT", default_value_t = 30)]
    pub fetch_timeout_secs: u64,

    #[arg(long, global = true, env = "RESEARCH_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Downloads in flight at once
    #[arg(long, global = true, env = "RESEARCH_FETCH_CONCURRENCY", default_value_t = 3)]
    pub fetch_concurrency: usize,

    /// Title characters used for a paper's file name
    #[arg(long, global = true, env = "RESEARCH_TITLE_FRAGMENT", default_value_t = 48)]
    pub title_fragment_len: usize,

    #[arg(long, global = true, env = "RESEARCH_MAX_AGENT_STEPS", default_value_t = 16)]
    pub max_agent_steps: usize,
}

impl Settings {
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            papers_dir: self.papers_dir.clone(),
            max_agent_steps: self.max_agent_steps,
            fetch_concurrency: self.fetch_concurrency,
            title_fragment_len: self.title_fragment_len,
        }
    }

    pub fn toolkit(&self) -> Result<Toolkit, FetchError> {
        let fetcher = Fetcher::new(
            Duration::from_secs(self.fetch_timeout_secs),
            &self.user_agent,
        )?;

        Ok(Toolkit::new(
            Arc::new(ArxivClient::with_api_url(&self.arxiv_url)),
            self.max_results,
            fetcher,
            CorpusReader::new(self.max_chars_per_paper),
            ReportRenderer::default(),
        ))
    }

    pub fn orchestrator(&self) -> Result<Orchestrator, FetchError> {
        let llm = agent::llm::OpenAI::with_endpoint(
            self.model.clone(),
            self.openai_base_url.as_deref(),
            self.openai_api_key.as_deref(),
        );

        Ok(Orchestrator::new(
            llm,
            Arc::new(self.toolkit()?),
            self.pipeline_options(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["research", "run", "graph neural networks"]).expect("parse");

        assert!(matches!(&cli.command, Command::Run { query } if query == "graph neural networks"));
        assert_eq!(cli.settings.papers_dir, PathBuf::from("papers"));
        assert_eq!(cli.settings.max_results, 3);
        assert_eq!(cli.settings.max_chars_per_paper, 10_000);
        assert_eq!(cli.settings.fetch_timeout_secs, 30);
        assert_eq!(cli.settings.title_fragment_len, 48);
    }

    #[test]
    fn test_subcommand_options() {
        let cli = Cli::try_parse_from(["research", "console", "--max-chars-per-paper", "5000"])
            .expect("parse");
        assert!(matches!(&cli.command, Command::Console { output } if output == &PathBuf::from("Final_Research_Report.pdf")));
        assert_eq!(cli.settings.max_chars_per_paper, 5000);

        let cli = Cli::try_parse_from(["research", "serve", "--bind", "0.0.0.0:8080"]).expect("parse");
        assert!(matches!(cli.command, Command::Serve { bind } if bind.port() == 8080));
    }
}

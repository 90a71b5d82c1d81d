use crate::research::Stage;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("arxiv request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("arxiv returned HTTP {0}")]
    Status(u16),

    #[error("could not parse arxiv feed: {0}")]
    Feed(#[from] quick_xml::DeError),
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("download of {url} failed with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("download of {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("could not write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not build http client: {0}")]
    Client(#[source] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("No papers found in {}.", .0.display())]
    MissingDirectory(PathBuf),

    #[error("No PDF files found in {}.", .0.display())]
    NoDocuments(PathBuf),

    #[error("could not list {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corpus reader task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A single unreadable document. Never aborts a corpus read.
#[derive(Error, Debug)]
#[error("could not read {name}: {source}")]
pub struct ExtractError {
    pub name: String,
    #[source]
    pub source: lopdf::Error,
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("could not build pdf: {0}")]
    Pdf(String),

    #[error("could not write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("render task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Why a research run ended in the `Failed` state.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("arxiv search failed: {0}")]
    Search(#[from] SearchError),

    #[error("no papers found")]
    NoPapersFound,

    #[error("{stage} agent failed: {source}")]
    Agent {
        stage: Stage,
        #[source]
        source: agent::Error,
    },

    #[error("the report agent produced no text")]
    EmptyReport,

    #[error("could not render the report: {0}")]
    Render(#[from] RenderError),
}

impl PipelineError {
    /// The stage the run was in when it failed.
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Search(_) | PipelineError::NoPapersFound => Stage::Searching,
            PipelineError::Agent { stage, .. } => *stage,
            PipelineError::EmptyReport => Stage::Summarizing,
            PipelineError::Render(_) => Stage::Rendering,
        }
    }

    /// Stable machine-readable name, used in HTTP responses.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Search(_) => "search_failed",
            PipelineError::NoPapersFound => "no_papers_found",
            PipelineError::Agent { .. } => "agent_failed",
            PipelineError::EmptyReport => "empty_report",
            PipelineError::Render(_) => "render_failed",
        }
    }
}

//! HTTP surface: a form at `/`, `POST /research`, and the papers directory at
//! `/papers`.

use crate::error::PipelineError;
use crate::research::{Orchestrator, ResearchReport, RunOptions};
use axum::extract::{Form, State};
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

const INDEX_HTML: &str = include_str!("../static/index.html");

#[derive(Clone)]
struct AppState {
    orchestrator: Arc<Orchestrator>,
}

#[derive(Debug, Deserialize)]
pub struct ResearchForm {
    #[serde(default)]
    pub query: String,
}

/// Body of every `POST /research` answer. The status is always 200.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ResearchResponse {
    Report {
        pdf_path: PathBuf,
        /// Where the report is served, when it lives under the papers directory.
        #[serde(skip_serializing_if = "Option::is_none")]
        report_url: Option<String>,
        paper_titles: Vec<String>,
    },
    Failure {
        error: String,
        kind: String,
        paper_titles: Vec<String>,
    },
}

impl ResearchResponse {
    pub fn from_outcome(outcome: Result<ResearchReport, PipelineError>, papers_dir: &Path) -> Self {
        match outcome {
            Ok(report) => ResearchResponse::Report {
                report_url: report_url(&report.pdf_path, papers_dir),
                pdf_path: report.pdf_path,
                paper_titles: report.paper_titles,
            },
            Err(err) => ResearchResponse::failure(err.to_string(), err.kind()),
        }
    }

    fn failure(error: String, kind: &str) -> Self {
        ResearchResponse::Failure {
            error,
            kind: kind.to_string(),
            paper_titles: Vec::new(),
        }
    }
}

fn report_url(pdf_path: &Path, papers_dir: &Path) -> Option<String> {
    let relative = pdf_path.strip_prefix(papers_dir).ok()?;
    let segments: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(format!("/papers/{}", segments.join("/")))
}

pub fn build_router(orchestrator: Arc<Orchestrator>) -> Router {
    let papers = ServeDir::new(orchestrator.papers_dir());

    Router::new()
        .route("/", get(index))
        .route("/research", post(research))
        .nest_service("/papers", papers)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { orchestrator })
}

pub async fn serve(orchestrator: Arc<Orchestrator>, bind: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, build_router(orchestrator)).await
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn research(
    State(state): State<AppState>,
    Form(form): Form<ResearchForm>,
) -> Json<ResearchResponse> {
    let query = form.query.trim();
    if query.is_empty() {
        return Json(ResearchResponse::failure(
            "query must not be empty".to_string(),
            "invalid_query",
        ));
    }

    let outcome = state.orchestrator.run(query, RunOptions::default()).await;
    Json(ResearchResponse::from_outcome(
        outcome,
        state.orchestrator.papers_dir(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::Capabilities;
    use crate::corpus::Corpus;
    use crate::error::{CorpusError, FetchError, RenderError, SearchError};
    use crate::research::PipelineOptions;
    use crate::sources::SearchResult;
    use agent::llm::{CompletionRequest, CompletionResponse, LLM};
    use async_trait::async_trait;
    use serde_json::Value;

    struct Silent;

    #[async_trait]
    impl LLM for Silent {
        async fn completion<'a>(
            &self,
            _request: CompletionRequest<'a>,
        ) -> agent::Result<CompletionResponse> {
            Ok(CompletionResponse {
                content: "nothing to add".to_string(),
                tool_calls: Vec::new(),
            })
        }
    }

    struct EmptyIndex;

    #[async_trait]
    impl Capabilities for EmptyIndex {
        async fn search(&self, _query: &str) -> Result<Vec<SearchResult>, SearchError> {
            Ok(Vec::new())
        }

        async fn download(&self, _url: &str) -> Result<Vec<u8>, FetchError> {
            Ok(Vec::new())
        }

        async fn save(&self, _body: &[u8], dir: &Path, name: &str) -> Result<PathBuf, FetchError> {
            Ok(dir.join(name))
        }

        async fn read_corpus(&self, dir: &Path) -> Result<Corpus, CorpusError> {
            Err(CorpusError::MissingDirectory(dir.to_path_buf()))
        }

        async fn render(&self, _text: &str, path: &Path) -> Result<PathBuf, RenderError> {
            Ok(path.to_path_buf())
        }
    }

    async fn spawn_app() -> String {
        let orchestrator = Arc::new(Orchestrator::new(
            Arc::new(Silent),
            Arc::new(EmptyIndex),
            PipelineOptions::default(),
        ));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move { axum::serve(listener, build_router(orchestrator)).await });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_index_serves_form() {
        let base = spawn_app().await;
        let body = reqwest::get(&base)
            .await
            .expect("get /")
            .text()
            .await
            .expect("body");
        assert!(body.contains("<form"));
    }

    #[tokio::test]
    async fn test_no_papers_is_200_with_empty_titles() {
        let base = spawn_app().await;
        let response = reqwest::Client::new()
            .post(format!("{}/research", base))
            .form(&[("query", "an empty field")])
            .send()
            .await
            .expect("post /research");

        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: Value = response.json().await.expect("json body");
        assert_eq!(body["kind"], "no_papers_found");
        assert_eq!(body["paper_titles"], serde_json::json!([]));
        assert!(body.get("pdf_path").is_none());
    }

    #[tokio::test]
    async fn test_blank_query_is_rejected() {
        let base = spawn_app().await;
        let body: Value = reqwest::Client::new()
            .post(format!("{}/research", base))
            .form(&[("query", "   ")])
            .send()
            .await
            .expect("post /research")
            .json()
            .await
            .expect("json body");

        assert_eq!(body["kind"], "invalid_query");
    }

    #[test]
    fn test_report_response_shape() {
        let report = ResearchReport {
            query: "gnn".to_string(),
            pdf_path: PathBuf::from("papers/gnn/final_report.pdf"),
            paper_titles: vec!["A".to_string()],
            downloaded: 1,
            skipped: 0,
        };

        let body = serde_json::to_value(ResearchResponse::from_outcome(
            Ok(report),
            Path::new("papers"),
        ))
        .expect("serialize");

        assert_eq!(body["pdf_path"], "papers/gnn/final_report.pdf");
        assert_eq!(body["report_url"], "/papers/gnn/final_report.pdf");
        assert_eq!(body["paper_titles"], serde_json::json!(["A"]));
        assert!(body.get("error").is_none());
    }
}

//! Text extraction over a directory of downloaded papers.

use crate::error::{CorpusError, ExtractError};
use crate::layout::REPORT_FILE_NAME;
use lopdf::Document;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_CHARS: usize = 10_000;

const PROMPT_HEADER: &str = "Here is the content of the research papers I found:\n\n";
const PROMPT_INSTRUCTIONS: &str =
    "\nINSTRUCTIONS: Write a detailed report. Create a dedicated section for EACH paper listed above.";

#[derive(Debug, Clone)]
pub struct CorpusDocument {
    /// File name, including the `.pdf` extension.
    pub name: String,
    pub text: String,
    /// Pages whose text was extracted.
    pub pages: usize,
    pub truncated: bool,
}

#[derive(Debug, Default)]
pub struct Corpus {
    pub documents: Vec<CorpusDocument>,
    pub failures: Vec<ExtractError>,
}

impl Corpus {
    /// Combined text handed to the report agent.
    pub fn to_prompt(&self) -> String {
        let mut prompt = String::from(PROMPT_HEADER);

        for doc in &self.documents {
            let _ = write!(
                prompt,
                "=== START OF PAPER: {name} ===\n{text}\n=== END OF PAPER: {name} ===\n\n",
                name = doc.name,
                text = doc.text,
            );
        }

        prompt.push_str(PROMPT_INSTRUCTIONS);
        prompt
    }

    pub fn names(&self) -> Vec<&str> {
        self.documents.iter().map(|doc| doc.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CorpusReader {
    max_chars: usize,
}

impl Default for CorpusReader {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHARS)
    }
}

impl CorpusReader {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    /// Reads every PDF in `dir` on the blocking pool.
    pub async fn read(&self, dir: &Path) -> Result<Corpus, CorpusError> {
        let reader = *self;
        let dir = dir.to_path_buf();
        tokio::task::spawn_blocking(move || reader.read_blocking(&dir)).await?
    }

    pub fn read_blocking(&self, dir: &Path) -> Result<Corpus, CorpusError> {
        if !dir.is_dir() {
            return Err(CorpusError::MissingDirectory(dir.to_path_buf()));
        }

        let paths = pdf_files(dir)?;
        if paths.is_empty() {
            return Err(CorpusError::NoDocuments(dir.to_path_buf()));
        }

        let mut corpus = Corpus::default();
        for path in paths {
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();

            match extract_pdf_text(&path) {
                Ok((text, pages)) => {
                    let (text, truncated) = cap_chars(&text, self.max_chars);
                    debug!(%name, pages, truncated, "extracted");
                    corpus.documents.push(CorpusDocument {
                        name,
                        text,
                        pages,
                        truncated,
                    });
                }
                Err(source) => {
                    let err = ExtractError { name, source };
                    warn!(error = %err, "skipping unreadable document");
                    corpus.failures.push(err);
                }
            }
        }

        info!(
            documents = corpus.documents.len(),
            failures = corpus.failures.len(),
            dir = %dir.display(),
            "corpus read"
        );
        Ok(corpus)
    }
}

/// `.pdf` files directly under `dir`, sorted by file name. A report left by
/// an earlier run is not a paper.
fn pdf_files(dir: &Path) -> Result<Vec<PathBuf>, CorpusError> {
    let io_err = |source| CorpusError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let is_pdf = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        let is_report = path
            .file_name()
            .is_some_and(|name| name == REPORT_FILE_NAME);
        if is_pdf && !is_report && path.is_file() {
            paths.push(path);
        }
    }

    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}

/// Text of every page that decodes, and the number of such pages.
pub fn extract_pdf_text(path: &Path) -> Result<(String, usize), lopdf::Error> {
    let document = Document::load(path)?;

    let mut text = String::new();
    let mut pages = 0;
    for page_number in document.get_pages().keys() {
        match document.extract_text(&[*page_number]) {
            Ok(page_text) => {
                text.push_str(&page_text);
                pages += 1;
            }
            Err(err) => {
                warn!(path = %path.display(), page = page_number, error = %err, "skipping page");
            }
        }
    }

    Ok((text, pages))
}

fn cap_chars(text: &str, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => (text[..end].to_string(), true),
        None => (text.to_string(), false),
    }
}

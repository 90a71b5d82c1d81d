//! On-disk layout: `papers/<query>/<doc>.pdf` and `papers/<query>/final_report.pdf`.

use std::path::{Path, PathBuf};

pub const REPORT_FILE_NAME: &str = "final_report.pdf";

/// Directory holding the documents and the report for one query.
pub fn query_dir(papers_dir: &Path, query: &str) -> PathBuf {
    papers_dir.join(sanitize_query(query))
}

pub fn report_path(papers_dir: &Path, query: &str) -> PathBuf {
    query_dir(papers_dir, query).join(REPORT_FILE_NAME)
}

/// Turns a free-text query into a single, safe path component.
pub fn sanitize_query(query: &str) -> String {
    let cleaned: String = query
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, ' ' | '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.').trim();
    if cleaned.is_empty() {
        "untitled".to_string()
    } else {
        cleaned.to_string()
    }
}

/// File name for a downloaded paper, derived from the first `fragment_len`
/// characters of its title.
///
/// Names are only loosely unique: two titles sharing a prefix map to the same
/// file and the later download replaces the earlier one.
pub fn document_file_name(title: &str, fragment_len: usize) -> String {
    let stem: String = title
        .trim()
        .chars()
        .take(fragment_len)
        .filter_map(|c| {
            if c.is_whitespace() {
                Some('_')
            } else if c.is_ascii_alphanumeric() || matches!(c, '_' | '-') {
                Some(c)
            } else {
                None
            }
        })
        .collect();

    let stem = stem.trim_matches('_');
    if stem.is_empty() {
        "paper.pdf".to_string()
    } else {
        format!("{}.pdf", stem)
    }
}

/// Base name of a requested file name, with a `.pdf` suffix.
pub fn destination_name(requested: &str) -> String {
    let base = Path::new(requested)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    if base.is_empty() {
        "paper.pdf".to_string()
    } else if base.to_ascii_lowercase().ends_with(".pdf") {
        base
    } else {
        format!("{}.pdf", base)
    }
}

//! Plain-text to PDF rendering.
//!
//! Output is A4, Courier 12pt, with every line in its own text object. Courier
//! is monospaced so wrapping is exact by character count.

use crate::error::RenderError;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream, dictionary};
use std::path::{Path, PathBuf};
use tracing::info;

/// Replacement for characters the single-byte font cannot show.
pub const PLACEHOLDER: char = '?';

#[derive(Debug, Clone, Copy)]
pub struct PageLayout {
    pub width: i64,
    pub height: i64,
    pub margin: i64,
    pub font_size: i64,
    pub line_height: i64,
}

impl Default for PageLayout {
    /// A4 portrait in points.
    fn default() -> Self {
        Self {
            width: 595,
            height: 842,
            margin: 56,
            font_size: 12,
            line_height: 14,
        }
    }
}

impl PageLayout {
    pub fn chars_per_line(&self) -> usize {
        // courier advance width is 600/1000 em
        let usable = (self.width - 2 * self.margin) * 1000;
        (usable / (self.font_size * 600).max(1)).max(1) as usize
    }

    pub fn lines_per_page(&self) -> usize {
        ((self.height - 2 * self.margin) / self.line_height.max(1)).max(1) as usize
    }
}

/// Keeps printable Latin-1, expands tabs and drops carriage returns.
pub fn to_single_byte(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\r' => {}
            '\n' => out.push('\n'),
            '\t' => out.push_str("    "),
            ' '..='~' | '\u{a0}'..='\u{ff}' => out.push(c),
            _ => out.push(PLACEHOLDER),
        }
    }
    out
}

/// Word-wraps `text` to `width` characters per line. Words longer than a line
/// are split. Blank lines are preserved.
pub fn wrap_lines(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut line = String::new();
        let mut line_len = 0;

        for word in paragraph.split(' ').filter(|word| !word.is_empty()) {
            let mut word: Vec<char> = word.chars().collect();

            if line_len > 0 && line_len + 1 + word.len() <= width {
                line.push(' ');
                line.extend(word.iter());
                line_len += 1 + word.len();
                continue;
            }

            if line_len > 0 {
                lines.push(std::mem::take(&mut line));
            }

            while word.len() > width {
                let rest = word.split_off(width);
                lines.push(word.into_iter().collect());
                word = rest;
            }

            line.extend(word.iter());
            line_len = word.len();
        }

        lines.push(line);
    }

    lines
}

/// Latin-1 bytes for text already passed through [`to_single_byte`].
fn latin1_bytes(line: &str) -> Vec<u8> {
    line.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReportRenderer {
    layout: PageLayout,
}

impl ReportRenderer {
    pub fn new(layout: PageLayout) -> Self {
        Self { layout }
    }

    pub fn to_pdf_bytes(&self, text: &str) -> Result<Vec<u8>, RenderError> {
        let layout = self.layout;
        let lines = wrap_lines(&to_single_byte(text), layout.chars_per_line());

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let mut kids: Vec<Object> = Vec::new();
        for chunk in lines.chunks(layout.lines_per_page()) {
            let mut operations = Vec::with_capacity(chunk.len() * 5);
            let mut y = layout.height - layout.margin - layout.font_size;

            for line in chunk {
                if !line.is_empty() {
                    operations.push(Operation::new("BT", vec![]));
                    operations.push(Operation::new(
                        "Tf",
                        vec!["F1".into(), Object::Integer(layout.font_size)],
                    ));
                    operations.push(Operation::new(
                        "Td",
                        vec![Object::Integer(layout.margin), Object::Integer(y)],
                    ));
                    operations.push(Operation::new(
                        "Tj",
                        vec![Object::string_literal(latin1_bytes(line))],
                    ));
                    operations.push(Operation::new("ET", vec![]));
                }
                y -= layout.line_height;
            }

            let content = Content { operations }
                .encode()
                .map_err(|err| RenderError::Pdf(err.to_string()))?;
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        // an empty report still gets one blank page
        if kids.is_empty() {
            let content_id = doc.add_object(Stream::new(Dictionary::new(), Vec::new()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let page_count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_count,
                "Resources" => resources_id,
                "MediaBox" => vec![
                    0.into(),
                    0.into(),
                    Object::Integer(layout.width),
                    Object::Integer(layout.height),
                ],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|err| RenderError::Pdf(err.to_string()))?;
        Ok(bytes)
    }

    /// Writes `text` as a PDF at `path`, appending `.pdf` when missing.
    pub fn render(&self, text: &str, path: &Path) -> Result<PathBuf, RenderError> {
        let path = with_pdf_extension(path);
        let bytes = self.to_pdf_bytes(text)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| RenderError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&path, bytes).map_err(|source| RenderError::Io {
            path: path.clone(),
            source,
        })?;

        info!(path = %path.display(), "report written");
        Ok(path)
    }
}

fn with_pdf_extension(path: &Path) -> PathBuf {
    let has_pdf = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if has_pdf {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_owned();
        name.push(".pdf");
        PathBuf::from(name)
    }
}

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use quick_xml::events::Event;

use crate::error::AppError;
use crate::models::file_entry::StorageEntry;
use crate::services::storage::StorageBackend;

pub const MAX_SAMPLE_WORDS: usize = 200;
pub const MAX_SAMPLE_BYTES: u64 = 10 * 1024 * 1024;

pub const PDF_MIME_TYPE: &str = "application/pdf";
pub const DOCX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// Sampled page by page.
    Pdf,
    /// Sampled paragraph by paragraph.
    Docx,
}

impl SampleFormat {
    pub fn from_mime_type(mime_type: &str) -> Option<Self> {
        match mime_type {
            PDF_MIME_TYPE => Some(Self::Pdf),
            DOCX_MIME_TYPE => Some(Self::Docx),
            _ => None,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Self::Pdf => ".pdf",
            Self::Docx => ".docx",
        }
    }

    fn extract(self, path: &Path) -> Result<String, AppError> {
        match self {
            Self::Pdf => sample_pdf(path),
            Self::Docx => sample_docx(path),
        }
    }
}

/// Accumulates whole units of text until the word limit is reached.
struct WordBudget {
    words: Vec<String>,
    limit: usize,
}

impl WordBudget {
    fn new(limit: usize) -> Self {
        Self {
            words: Vec::with_capacity(limit),
            limit,
        }
    }

    /// Returns true once the budget is full and sampling should stop.
    fn push_text(&mut self, text: &str) -> bool {
        for word in text.split_whitespace() {
            if self.is_full() {
                break;
            }
            self.words.push(word.to_string());
        }
        self.is_full()
    }

    fn is_full(&self) -> bool {
        self.words.len() >= self.limit
    }

    fn finish(self) -> String {
        self.words.join(" ")
    }
}

fn sample_pdf(path: &Path) -> Result<String, AppError> {
    let doc = lopdf::Document::load(path)
        .map_err(|e| AppError::Extraction(format!("pdf open failed: {e}")))?;
    let mut budget = WordBudget::new(MAX_SAMPLE_WORDS);
    for page_number in doc.get_pages().keys() {
        let text = doc
            .extract_text(&[*page_number])
            .map_err(|e| AppError::Extraction(format!("pdf page {page_number} failed: {e}")))?;
        if budget.push_text(&text) {
            break;
        }
    }
    Ok(budget.finish())
}

fn sample_docx(path: &Path) -> Result<String, AppError> {
    let mut archive = zip::ZipArchive::new(File::open(path)?)
        .map_err(|e| AppError::Extraction(format!("docx open failed: {e}")))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| AppError::Extraction(format!("docx body missing: {e}")))?
        .read_to_string(&mut xml)?;

    let mut reader = quick_xml::Reader::from_str(&xml);
    let mut budget = WordBudget::new(MAX_SAMPLE_WORDS);
    let mut paragraph = String::new();
    let mut in_text = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"w:p" => paragraph.clear(),
                b"w:t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if matches!(e.name().as_ref(), b"w:tab" | b"w:br") {
                    paragraph.push(' ');
                }
            }
            Ok(Event::Text(t)) if in_text => {
                let text = t
                    .unescape()
                    .map_err(|e| AppError::Extraction(format!("docx text decode failed: {e}")))?;
                paragraph.push_str(&text);
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => {
                    if budget.push_text(&paragraph) {
                        break;
                    }
                    paragraph.clear();
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(AppError::Extraction(format!(
                    "docx xml error at {}: {e}",
                    reader.buffer_position()
                )))
            }
            _ => {}
        }
    }
    Ok(budget.finish())
}

async fn try_sample(
    storage: &dyn StorageBackend,
    entry: &StorageEntry,
) -> Result<String, AppError> {
    let Some(format) = SampleFormat::from_mime_type(&entry.mime_type) else {
        return Ok(String::new());
    };
    if entry.size.is_some_and(|size| size > MAX_SAMPLE_BYTES) {
        tracing::debug!("skipping sample for {}: {:?} bytes", entry.id, entry.size);
        return Ok(String::new());
    }

    let bytes = storage.download(&entry.id).await?;
    if bytes.len() as u64 > MAX_SAMPLE_BYTES {
        tracing::debug!("skipping sample for {}: {} bytes downloaded", entry.id, bytes.len());
        return Ok(String::new());
    }

    let mut staged = tempfile::Builder::new()
        .prefix("drivetidy-")
        .suffix(format.suffix())
        .tempfile()?;
    staged.write_all(&bytes)?;
    staged.flush()?;
    drop(bytes);

    // The staged file moves into the worker and is removed when it drops there.
    let text = tokio::task::spawn_blocking(move || format.extract(staged.path())).await??;
    Ok(text.trim().to_string())
}

/// Bounded text sample for one file, or an empty string when none applies.
/// Never fails: extraction errors are logged and downgraded.
pub async fn sample_content(storage: &dyn StorageBackend, entry: &StorageEntry) -> String {
    match try_sample(storage, entry).await {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!("content sample failed for {}: {err}", entry.id);
            String::new()
        }
    }
}

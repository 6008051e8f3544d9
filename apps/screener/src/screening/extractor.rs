//! Text Extractor: turns an uploaded PDF, DOCX, or TXT document into plain text.
//!
//! Extraction is infallible at its boundary: any failure is logged and becomes an
//! empty string, which the ranker's minimum-content filter then drops.

use std::io::Read;
use std::panic;

use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::document::{Document, DocumentFormat};

#[derive(Debug, Error)]
enum ExtractError {
    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("PDF parser panicked")]
    PdfPanic,

    #[error("DOCX archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("DOCX XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported file extension")]
    UnsupportedFormat,
}

/// Extracts the text of `document`, dispatching on its extension.
/// Never fails: unknown formats and unreadable files yield `""`.
pub fn extract(document: &Document) -> String {
    let format = document.format();
    let result = match format {
        DocumentFormat::Pdf => extract_pdf(document),
        DocumentFormat::Docx => extract_docx(document),
        DocumentFormat::Txt => Ok(decode_utf8_lossless(&document.bytes)),
        DocumentFormat::Unknown => Err(ExtractError::UnsupportedFormat),
    };

    match result {
        Ok(text) => {
            debug!(
                filename = %document.filename,
                ?format,
                chars = text.chars().count(),
                "Extracted document text"
            );
            text
        }
        Err(e) => {
            warn!(
                filename = %document.filename,
                ?format,
                error = %e,
                "Text extraction failed; treating document as empty"
            );
            String::new()
        }
    }
}

fn extract_pdf(document: &Document) -> Result<String, ExtractError> {
    let bytes: &[u8] = document.bytes.as_ref();
    // pdf-extract can panic on malformed cross-reference tables.
    match panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(ExtractError::Pdf(format!("{e:?}"))),
        Err(_) => Err(ExtractError::PdfPanic),
    }
}

fn extract_docx(document: &Document) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(document.reader())?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")?
        .read_to_string(&mut xml)?;
    Ok(docx_paragraphs(&xml)?.join("\n"))
}

/// Decodes UTF-8, dropping invalid byte sequences instead of substituting U+FFFD.
fn decode_utf8_lossless(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    out
}

/// Text of every `<w:p>` in `word/document.xml`, in the order the paragraphs open.
///
/// A paragraph nested in a text box gets its own entry after its host, and the
/// host keeps the runs that follow the text box.
fn docx_paragraphs(xml: &str) -> Result<Vec<String>, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs: Vec<String> = Vec::new();
    // Indices into `paragraphs` of the `<w:p>` elements currently open.
    let mut open: Vec<usize> = Vec::new();
    let mut in_text = false;
    // Tab stops live in paragraph properties and are not text.
    let mut props_depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:p" => {
                    open.push(paragraphs.len());
                    paragraphs.push(String::new());
                }
                b"w:pPr" => props_depth += 1,
                b"w:t" => in_text = true,
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:p" => paragraphs.push(String::new()),
                b"w:tab" if props_depth == 0 => append(&mut paragraphs, &open, "\t"),
                b"w:br" | b"w:cr" => append(&mut paragraphs, &open, "\n"),
                _ => {}
            },
            Event::End(e) => match e.name().as_ref() {
                b"w:p" => {
                    open.pop();
                }
                b"w:pPr" => props_depth = props_depth.saturating_sub(1),
                b"w:t" => in_text = false,
                _ => {}
            },
            Event::Text(t) if in_text => append(&mut paragraphs, &open, &t.unescape()?),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

/// Appends to the innermost open paragraph; text outside any paragraph is dropped.
fn append(paragraphs: &mut [String], open: &[usize], s: &str) {
    if let Some(&i) = open.last() {
        paragraphs[i].push_str(s);
    }
}

use std::io::Cursor;
use std::path::Path;

use bytes::Bytes;
use serde::Serialize;

/// Upload format, inferred from the filename extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Txt,
    Unknown,
}

impl DocumentFormat {
    /// Case-insensitive extension match. Anything unrecognised is `Unknown`.
    pub fn from_filename(filename: &str) -> Self {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("pdf") => DocumentFormat::Pdf,
            Some("docx") => DocumentFormat::Docx,
            Some("txt") => DocumentFormat::Txt,
            _ => DocumentFormat::Unknown,
        }
    }

    pub fn is_supported(self) -> bool {
        self != DocumentFormat::Unknown
    }
}

/// An uploaded file held fully in memory for the lifetime of one request.
#[derive(Debug, Clone)]
pub struct Document {
    pub filename: String,
    pub bytes: Bytes,
}

impl Document {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }

    pub fn format(&self) -> DocumentFormat {
        DocumentFormat::from_filename(&self.filename)
    }

    /// A fresh reader positioned at byte 0. Every consumer gets its own cursor,
    /// so earlier reads never shift where the next one starts.
    pub fn reader(&self) -> Cursor<&[u8]> {
        Cursor::new(self.bytes.as_ref())
    }
}

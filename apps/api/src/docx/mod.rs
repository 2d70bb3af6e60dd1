// Structural model of a .docx resume.
// Reads the zip package, scans body paragraphs once, and splices new paragraph XML
// without touching the bytes of any existing paragraph.

pub mod document;
pub mod format;
pub mod package;

#[cfg(test)]
pub mod fixtures;

use thiserror::Error;

pub use document::{Block, Insertion, ParsedDocument};
pub use format::{BulletTemplate, ParagraphFormat};
pub use package::{DocxPackage, PackageLimits};

/// Low-level failure while opening, scanning, or re-encoding a document.
#[derive(Debug, Error)]
pub enum DocxError {
    #[error("document is empty")]
    Empty,

    #[error("not a zip archive (missing PK signature)")]
    NotZip,

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("missing package part: {0}")]
    MissingPart(&'static str),

    #[error("package entry '{name}' inflates beyond {limit} bytes")]
    EntryTooLarge { name: String, limit: u64 },

    #[error("package inflates beyond {limit} bytes in total")]
    PackageTooLarge { limit: u64 },

    #[error("main document part is not valid UTF-8")]
    NotUtf8,

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("main document part has no w:body element")]
    MissingBody,

    #[error("malformed document XML: {0}")]
    Malformed(String),
}

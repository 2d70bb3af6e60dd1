//! Zip package handling for Office Open XML word-processing documents.
//!
//! Every archive entry is kept in archive order so the package can be re-emitted with
//! only `word/document.xml` replaced.

use std::io::{Cursor, Read, Write};

use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use crate::docx::DocxError;

/// Path of the main document part inside the package.
pub const MAIN_DOCUMENT_PART: &str = "word/document.xml";

const ZIP_SIGNATURE: &[u8] = b"PK";

/// Caps on inflated sizes. Compressed upload limits alone do not bound memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageLimits {
    pub max_entry_bytes: u64,
    pub max_total_bytes: u64,
}

impl Default for PackageLimits {
    fn default() -> Self {
        Self {
            max_entry_bytes: 64 * 1024 * 1024,
            max_total_bytes: 256 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone)]
struct PackageEntry {
    name: String,
    data: Vec<u8>,
    compression: CompressionMethod,
    last_modified: DateTime,
    unix_mode: Option<u32>,
    is_dir: bool,
}

/// An opened .docx archive held fully in memory.
#[derive(Debug, Clone)]
pub struct DocxPackage {
    entries: Vec<PackageEntry>,
    main_index: usize,
}

impl DocxPackage {
    /// Opens a package from raw bytes. Fails if the bytes are not a zip archive or the
    /// archive has no main document part.
    pub fn open(bytes: &[u8]) -> Result<Self, DocxError> {
        Self::open_with_limits(bytes, PackageLimits::default())
    }

    /// Like `open`, but fails once any entry or the whole package inflates past `limits`.
    /// Declared sizes are checked first; actual reads are capped regardless of what the
    /// archive declares.
    pub fn open_with_limits(bytes: &[u8], limits: PackageLimits) -> Result<Self, DocxError> {
        if bytes.is_empty() {
            return Err(DocxError::Empty);
        }
        if !bytes.starts_with(ZIP_SIGNATURE) {
            return Err(DocxError::NotZip);
        }

        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = Vec::with_capacity(archive.len());
        let mut total: u64 = 0;

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.size() > limits.max_entry_bytes {
                return Err(entry_too_large(file.name(), &limits));
            }

            let mut data = Vec::new();
            file.by_ref()
                .take(limits.max_entry_bytes.saturating_add(1))
                .read_to_end(&mut data)?;
            if data.len() as u64 > limits.max_entry_bytes {
                return Err(entry_too_large(file.name(), &limits));
            }

            total += data.len() as u64;
            if total > limits.max_total_bytes {
                return Err(DocxError::PackageTooLarge {
                    limit: limits.max_total_bytes,
                });
            }
            entries.push(PackageEntry {
                name: file.name().to_string(),
                compression: file.compression(),
                last_modified: file.last_modified(),
                unix_mode: file.unix_mode(),
                is_dir: file.is_dir(),
                data,
            });
        }

        let main_index = entries
            .iter()
            .position(|e| e.name == MAIN_DOCUMENT_PART)
            .ok_or(DocxError::MissingPart(MAIN_DOCUMENT_PART))?;

        Ok(Self {
            entries,
            main_index,
        })
    }

    /// The main document part decoded as UTF-8.
    pub fn document_xml(&self) -> Result<&str, DocxError> {
        std::str::from_utf8(&self.entries[self.main_index].data).map_err(|_| DocxError::NotUtf8)
    }

    /// Replaces the main document part, leaving every other entry untouched.
    pub fn with_document_xml(mut self, xml: String) -> Self {
        self.entries[self.main_index].data = xml.into_bytes();
        self
    }

    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Re-encodes the package. Entries keep their order, timestamps, and permissions;
    /// stored entries stay stored, everything else is deflated.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DocxError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        for entry in &self.entries {
            let method = match entry.compression {
                CompressionMethod::Stored => CompressionMethod::Stored,
                _ => CompressionMethod::Deflated,
            };
            let mut options = FileOptions::default()
                .compression_method(method)
                .last_modified_time(entry.last_modified);
            if let Some(mode) = entry.unix_mode {
                options = options.unix_permissions(mode);
            }

            if entry.is_dir {
                writer.add_directory(entry.name.clone(), options)?;
                continue;
            }
            writer.start_file(entry.name.clone(), options)?;
            writer.write_all(&entry.data)?;
        }

        Ok(writer.finish()?.into_inner())
    }
}

fn entry_too_large(name: &str, limits: &PackageLimits) -> DocxError {
    DocxError::EntryTooLarge {
        name: name.to_string(),
        limit: limits.max_entry_bytes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::fixtures::DocxFixture;

    #[test]
    fn test_open_rejects_empty_input() {
        assert!(matches!(DocxPackage::open(&[]), Err(DocxError::Empty)));
    }

    #[test]
    fn test_open_rejects_non_zip_bytes() {
        let result = DocxPackage::open(b"%PDF-1.7 not a docx");
        assert!(matches!(result, Err(DocxError::NotZip)));
    }

    #[test]
    fn test_open_rejects_truncated_archive() {
        let bytes = DocxFixture::new().plain("Hello").build();
        let truncated = &bytes[..bytes.len() / 2];
        assert!(DocxPackage::open(truncated).is_err());
    }

    #[test]
    fn test_open_rejects_archive_without_main_part() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("word/styles.xml", FileOptions::default())
            .unwrap();
        writer.write_all(b"<w:styles/>").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let result = DocxPackage::open(&bytes);
        assert!(matches!(
            result,
            Err(DocxError::MissingPart(MAIN_DOCUMENT_PART))
        ));
    }

    #[test]
    fn test_open_rejects_entry_inflating_past_limit() {
        let bytes = DocxFixture::new().plain(&"x".repeat(4096)).build();
        let limits = PackageLimits {
            max_entry_bytes: 1024,
            max_total_bytes: u64::MAX,
        };

        let result = DocxPackage::open_with_limits(&bytes, limits);
        assert!(matches!(
            result,
            Err(DocxError::EntryTooLarge { ref name, limit: 1024 }) if name == MAIN_DOCUMENT_PART
        ));
    }

    #[test]
    fn test_open_rejects_package_inflating_past_total_limit() {
        let bytes = DocxFixture::new().plain(&"x".repeat(4096)).build();
        let limits = PackageLimits {
            max_entry_bytes: u64::MAX,
            max_total_bytes: 2048,
        };

        let result = DocxPackage::open_with_limits(&bytes, limits);
        assert!(matches!(result, Err(DocxError::PackageTooLarge { limit: 2048 })));
    }

    #[test]
    fn test_open_accepts_package_within_limits() {
        let bytes = DocxFixture::new().plain("Hello").build();
        let limits = PackageLimits {
            max_entry_bytes: 64 * 1024,
            max_total_bytes: 256 * 1024,
        };
        assert!(DocxPackage::open_with_limits(&bytes, limits).is_ok());
    }

    #[test]
    fn test_reencode_keeps_other_parts_and_order() {
        let bytes = DocxFixture::new().plain("Hello").build();
        let package = DocxPackage::open(&bytes).unwrap();
        let names_before: Vec<String> = package.entry_names().map(String::from).collect();

        let reencoded = package.to_bytes().unwrap();
        let reopened = DocxPackage::open(&reencoded).unwrap();
        let names_after: Vec<String> = reopened.entry_names().map(String::from).collect();

        assert_eq!(names_before, names_after);
        assert_eq!(
            reopened.document_xml().unwrap(),
            DocxPackage::open(&bytes).unwrap().document_xml().unwrap()
        );
    }

    #[test]
    fn test_with_document_xml_replaces_main_part_only() {
        let bytes = DocxFixture::new().plain("Hello").build();
        let package = DocxPackage::open(&bytes).unwrap();
        let updated = package
            .with_document_xml("<w:document/>".to_string())
            .to_bytes()
            .unwrap();

        let reopened = DocxPackage::open(&updated).unwrap();
        assert_eq!(reopened.document_xml().unwrap(), "<w:document/>");
        assert_eq!(reopened.entry_names().count(), 3);
    }
}

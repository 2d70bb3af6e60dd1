//! Builds small but real .docx archives for tests.

use std::io::{Cursor, Write};

use quick_xml::escape::escape;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_OPEN: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>"#;

const DOCUMENT_CLOSE: &str =
    r#"<w:sectPr><w:pgSz w:w="12240" w:h="15840"/></w:sectPr></w:body></w:document>"#;

/// Paragraph-by-paragraph description of a resume body.
#[derive(Debug, Clone, Default)]
pub struct DocxFixture {
    paragraphs: Vec<String>,
}

impl DocxFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Project heading in a Heading2 style.
    pub fn heading(self, text: &str) -> Self {
        self.raw(&format!(
            r#"<w:p><w:pPr><w:pStyle w:val="Heading2"/></w:pPr><w:r><w:t>{}</w:t></w:r></w:p>"#,
            escape(text)
        ))
    }

    /// Bold responsibilities label.
    pub fn marker(self, text: &str) -> Self {
        self.raw(&format!(
            r#"<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>{}</w:t></w:r></w:p>"#,
            escape(text)
        ))
    }

    /// Responsibilities label with no paragraph or run formatting.
    pub fn bare_marker(self, text: &str) -> Self {
        self.plain(text)
    }

    /// Word list bullet: numbering, list style, and Calibri 11pt runs.
    pub fn numbered_bullet(self, text: &str) -> Self {
        self.raw(&format!(
            concat!(
                r#"<w:p><w:pPr><w:pStyle w:val="ListParagraph"/><w:numPr><w:ilvl w:val="0"/><w:numId w:val="1"/></w:numPr>"#,
                r#"<w:ind w:left="720" w:hanging="360"/></w:pPr>"#,
                r#"<w:r><w:rPr><w:rFonts w:ascii="Calibri" w:hAnsi="Calibri"/><w:sz w:val="22"/></w:rPr><w:t>{}</w:t></w:r></w:p>"#
            ),
            escape(text)
        ))
    }

    /// Bullet typed as a glyph run followed by a tab and an Arial 10pt text run.
    pub fn glyph_bullet(self, text: &str) -> Self {
        self.raw(&format!(
            concat!(
                r#"<w:p><w:pPr><w:ind w:left="360"/></w:pPr>"#,
                r#"<w:r><w:rPr><w:rFonts w:ascii="Symbol" w:hAnsi="Symbol"/></w:rPr><w:t>•</w:t></w:r>"#,
                r#"<w:r><w:rPr><w:rFonts w:ascii="Arial" w:hAnsi="Arial"/><w:sz w:val="20"/></w:rPr><w:tab/><w:t>{}</w:t></w:r></w:p>"#
            ),
            escape(text)
        ))
    }

    /// Bullet carried only by a list paragraph style.
    pub fn styled_bullet(self, text: &str) -> Self {
        self.raw(&format!(
            r#"<w:p><w:pPr><w:pStyle w:val="ListBullet"/></w:pPr><w:r><w:t>{}</w:t></w:r></w:p>"#,
            escape(text)
        ))
    }

    pub fn plain(self, text: &str) -> Self {
        self.raw(&format!(
            r#"<w:p><w:r><w:t>{}</w:t></w:r></w:p>"#,
            escape(text)
        ))
    }

    pub fn raw(mut self, xml: &str) -> Self {
        self.paragraphs.push(xml.to_string());
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let xml = document_xml(self);
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        for (name, content) in [
            ("[Content_Types].xml", CONTENT_TYPES),
            ("_rels/.rels", ROOT_RELS),
            ("word/document.xml", xml.as_str()),
        ] {
            writer.start_file(name, options).expect("start zip entry");
            writer
                .write_all(content.as_bytes())
                .expect("write zip entry");
        }

        writer.finish().expect("finish zip").into_inner()
    }
}

/// The `word/document.xml` a fixture produces.
pub fn document_xml(fixture: &DocxFixture) -> String {
    let mut xml = String::from(DOCUMENT_OPEN);
    for paragraph in &fixture.paragraphs {
        xml.push_str(paragraph);
    }
    xml.push_str(DOCUMENT_CLOSE);
    xml
}

/// A typical two-project resume with Word list bullets.
pub fn two_project_resume() -> DocxFixture {
    DocxFixture::new()
        .plain("Jordan Doe")
        .plain("Professional Summary")
        .plain("Engineer with eight years of backend experience.")
        .heading("Senior Developer | Acme Corp | 2021 - Present")
        .marker("Responsibilities:")
        .numbered_bullet("Designed order service")
        .numbered_bullet("Led migration to Postgres")
        .heading("Software Engineer | Globex | 2018 - 2021")
        .marker("Responsibilities:")
        .numbered_bullet("Maintained billing jobs")
}

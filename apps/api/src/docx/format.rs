//! Paragraph formatting as found in the document, and templates for new bullet paragraphs.

use quick_xml::escape::escape;

use crate::docx::document::Block;

/// Literal bullet glyphs typed directly into paragraph text.
pub const BULLET_GLYPHS: [char; 6] = ['•', '●', '◦', '▪', '▫', '‣'];

/// ASCII markers only count as bullets when followed by whitespace ("- item", "* item").
const ASCII_MARKERS: [char; 2] = ['-', '*'];

const DEFAULT_PREFIX: &str = "• ";

const NEUTRAL_PARAGRAPH_PROPERTIES: &str = r#"<w:pPr><w:ind w:left="720" w:hanging="360"/></w:pPr>"#;

/// List numbering attached to a paragraph through `w:numPr`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListNumbering {
    pub num_id: String,
    pub level: String,
}

/// Formatting of a scanned paragraph. Raw property fragments are kept verbatim so they
/// can be cloned onto new paragraphs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParagraphFormat {
    pub style_id: Option<String>,
    pub numbering: Option<ListNumbering>,
    /// Raw `<w:pPr>...</w:pPr>` of the paragraph.
    pub paragraph_properties: Option<String>,
    /// Raw `<w:rPr>...</w:rPr>` of the first run carrying real text.
    pub run_properties: Option<String>,
}

impl ParagraphFormat {
    pub fn has_list_style(&self) -> bool {
        self.style_id
            .as_deref()
            .map(|s| s.to_ascii_lowercase().contains("list"))
            .unwrap_or(false)
    }

    /// A paragraph is a bullet item when it is numbered, styled as a list, or opens with
    /// a typed bullet glyph.
    pub fn is_list_item(&self, text: &str) -> bool {
        self.numbering.is_some() || self.has_list_style() || leading_marker(text).is_some()
    }
}

pub fn is_bullet_glyph(c: char) -> bool {
    BULLET_GLYPHS.contains(&c)
}

/// Returns the leading bullet marker and the separator that follows it.
pub fn leading_marker(text: &str) -> Option<(char, char)> {
    let mut chars = text.trim_start().chars();
    let first = chars.next()?;
    let next = chars.next();
    let separator = if next == Some('\t') { '\t' } else { ' ' };

    if is_bullet_glyph(first) {
        return Some((first, separator));
    }
    if ASCII_MARKERS.contains(&first) && next.map(char::is_whitespace).unwrap_or(false) {
        return Some((first, separator));
    }
    None
}

/// Strips leading bullet markers and surrounding whitespace from bullet text.
pub fn clean_bullet_text(text: &str) -> &str {
    let mut rest = text.trim();
    while let Some((marker, _)) = leading_marker(rest) {
        rest = rest.trim_start()[marker.len_utf8()..].trim_start();
    }
    rest
}

/// True if the text holds anything besides whitespace and bullet glyphs.
pub fn has_real_text(text: &str) -> bool {
    text.chars()
        .any(|c| !c.is_whitespace() && !is_bullet_glyph(c))
}

/// Formatting cloned onto newly inserted bullet paragraphs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulletTemplate {
    paragraph_properties: Option<String>,
    run_properties: Option<String>,
    text_prefix: Option<String>,
}

impl BulletTemplate {
    /// Clones an existing bullet. Without numbering, a typed glyph is part of the text,
    /// so it carries over with its separator as a text prefix even under a list style.
    pub fn from_bullet(block: &Block) -> Self {
        let format = &block.format;
        let text_prefix = if format.numbering.is_none() {
            leading_marker(&block.text).map(|(glyph, sep)| format!("{glyph}{sep}"))
        } else {
            None
        };

        Self {
            paragraph_properties: format
                .paragraph_properties
                .as_deref()
                .map(|p| strip_elements(p, &["w:sectPr", "w:pPrChange"])),
            run_properties: format
                .run_properties
                .as_deref()
                .map(|r| strip_elements(r, &["w:rPrChange"])),
            text_prefix,
        }
    }

    /// Clones the responsibilities marker for a section without bullets.
    /// Returns `None` when the marker carries no usable formatting.
    pub fn from_marker(block: &Block) -> Option<Self> {
        let format = &block.format;
        let paragraph_properties = format
            .paragraph_properties
            .as_deref()
            .map(|p| strip_elements(p, &["w:sectPr", "w:pPrChange", "w:numPr"]))
            .filter(|p| has_children(p));
        let run_properties = format
            .run_properties
            .as_deref()
            .map(|r| strip_elements(r, &["w:rPrChange"]))
            .filter(|r| has_children(r));

        if paragraph_properties.is_none() && run_properties.is_none() {
            return None;
        }

        Some(Self {
            paragraph_properties,
            run_properties,
            text_prefix: Some(DEFAULT_PREFIX.to_string()),
        })
    }

    /// Plain indented bullet used when nothing in the section can be cloned.
    pub fn neutral() -> Self {
        Self {
            paragraph_properties: Some(NEUTRAL_PARAGRAPH_PROPERTIES.to_string()),
            run_properties: None,
            text_prefix: Some(DEFAULT_PREFIX.to_string()),
        }
    }

    /// Renders one `<w:p>` element holding `text`.
    pub fn render(&self, text: &str) -> String {
        let cleaned: String = clean_bullet_text(text)
            .chars()
            .filter(|c| !c.is_control() || *c == '\t')
            .collect();
        let full_text = match &self.text_prefix {
            Some(prefix) => format!("{prefix}{cleaned}"),
            None => cleaned,
        };

        let mut xml = String::from("<w:p>");
        if let Some(ppr) = &self.paragraph_properties {
            xml.push_str(ppr);
        }
        xml.push_str("<w:r>");
        if let Some(rpr) = &self.run_properties {
            xml.push_str(rpr);
        }
        for (i, piece) in full_text.split('\t').enumerate() {
            if i > 0 {
                xml.push_str("<w:tab/>");
            }
            if !piece.is_empty() {
                xml.push_str(r#"<w:t xml:space="preserve">"#);
                xml.push_str(&escape(piece));
                xml.push_str("</w:t>");
            }
        }
        xml.push_str("</w:r></w:p>");
        xml
    }
}

/// Removes every occurrence of the named elements (with their content) from an XML
/// fragment. The named elements must not nest inside themselves.
fn strip_elements(fragment: &str, qnames: &[&str]) -> String {
    qnames
        .iter()
        .fold(fragment.to_string(), |acc, qname| strip_element(&acc, qname))
}

fn strip_element(fragment: &str, qname: &str) -> String {
    let open = format!("<{qname}");
    let close = format!("</{qname}>");
    let mut out = String::with_capacity(fragment.len());
    let mut rest = fragment;

    while let Some(pos) = find_open_tag(rest, &open) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        let tag_end = tail.find('>').map(|i| i + 1).unwrap_or(tail.len());
        if tail[..tag_end].ends_with("/>") {
            rest = &tail[tag_end..];
            continue;
        }
        rest = match tail.find(&close) {
            Some(i) => &tail[i + close.len()..],
            None => "",
        };
    }
    out.push_str(rest);
    out
}

fn find_open_tag(haystack: &str, open: &str) -> Option<usize> {
    haystack.match_indices(open).map(|(i, _)| i).find(|&i| {
        matches!(
            haystack[i + open.len()..].chars().next(),
            Some(' ' | '>' | '/' | '\t' | '\n' | '\r')
        )
    })
}

/// True if a property element has any child content (`<w:rPr/>` has none).
fn has_children(fragment: &str) -> bool {
    let trimmed = fragment.trim();
    match (trimmed.find('>'), trimmed.rfind('<')) {
        (Some(open_end), Some(close_start)) if close_start > open_end => {
            !trimmed[open_end + 1..close_start].trim().is_empty()
        }
        _ => false,
    }
}

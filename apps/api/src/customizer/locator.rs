//! Project section locator — one pass over body paragraphs finding responsibilities
//! markers and the bullet regions they open.

use serde::Serialize;

use crate::docx::{Block, ParsedDocument};

/// Labels recognized at the start of a responsibilities marker paragraph.
pub const DEFAULT_MARKER_LABELS: [&str; 5] = [
    "responsibilities",
    "key responsibilities",
    "roles and responsibilities",
    "roles & responsibilities",
    "duties:",
];

/// Resume section titles that close an open responsibilities region.
pub const DEFAULT_SECTION_END_LABELS: [&str; 16] = [
    "education",
    "skills",
    "technical skills",
    "core competencies",
    "certifications",
    "certificates",
    "awards",
    "achievements",
    "publications",
    "languages",
    "interests",
    "hobbies",
    "references",
    "volunteer",
    "training",
    "courses",
];

/// Section titles are short; longer paragraphs starting with a label are body text.
const SECTION_END_MAX_WORDS: usize = 4;

/// A short paragraph mentioning this word counts as a marker even without a known label.
const MARKER_KEYWORD: &str = "responsibilities";
const MARKER_KEYWORD_MAX_WORDS: usize = 4;

/// Words that suggest a paragraph is a role or project title.
const HEADING_KEYWORDS: [&str; 12] = [
    "project",
    "developer",
    "engineer",
    "manager",
    "analyst",
    "architect",
    "consultant",
    "lead",
    "specialist",
    "intern",
    "designer",
    "devops",
];

/// Paragraph labels that open and close responsibilities regions. Labels are lowercase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionRules {
    pub marker_labels: Vec<String>,
    pub section_end_labels: Vec<String>,
}

impl Default for SectionRules {
    fn default() -> Self {
        Self {
            marker_labels: default_marker_labels(),
            section_end_labels: DEFAULT_SECTION_END_LABELS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Where new bullets go: after this block, before anything that follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InsertionAnchor {
    block: usize,
}

impl InsertionAnchor {
    pub(crate) fn at_block(block: usize) -> Self {
        Self { block }
    }

    pub(crate) fn block_index(self) -> usize {
        self.block
    }
}

/// A project block with a responsibilities list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectSection {
    /// Order of appearance, 0-based.
    pub index: usize,
    pub heading: String,
    pub existing_bullet_count: usize,
    /// Last existing bullet of the region, or the marker itself when there is none.
    pub insertion_anchor: InsertionAnchor,
}

#[derive(Debug, Clone, Default)]
pub struct LocatedSections {
    pub sections: Vec<ProjectSection>,
    pub warnings: Vec<String>,
}

struct SectionBuilder {
    marker: usize,
    heading: String,
    bullets: usize,
    last_bullet: Option<usize>,
}

impl SectionBuilder {
    fn finish(self, index: usize) -> ProjectSection {
        ProjectSection {
            index,
            heading: self.heading,
            existing_bullet_count: self.bullets,
            insertion_anchor: InsertionAnchor::at_block(self.last_bullet.unwrap_or(self.marker)),
        }
    }
}

/// Scans the document once. A section's region runs from its marker (exclusive) to the
/// next marker, the next section-end title, or the end of the document.
pub fn locate_sections(document: &ParsedDocument, rules: &SectionRules) -> LocatedSections {
    let mut sections = Vec::new();
    let mut open: Option<SectionBuilder> = None;
    // Non-bullet text seen since the last bullet or marker; heading candidates.
    let mut candidates: Vec<&str> = Vec::new();

    for block in document.blocks() {
        if block.is_blank() {
            continue;
        }

        if is_marker(block, &rules.marker_labels) {
            if let Some(section) = open.take() {
                sections.push(section.finish(sections.len()));
            }
            let heading = pick_heading(&candidates)
                .map(String::from)
                .unwrap_or_else(|| format!("Project {}", sections.len() + 1));
            open = Some(SectionBuilder {
                marker: block.index,
                heading,
                bullets: 0,
                last_bullet: None,
            });
            candidates.clear();
            continue;
        }

        if block.is_list_item() {
            if let Some(section) = open.as_mut() {
                section.bullets += 1;
                section.last_bullet = Some(block.index);
            }
            candidates.clear();
            continue;
        }

        if is_section_end(block, &rules.section_end_labels) {
            if let Some(section) = open.take() {
                sections.push(section.finish(sections.len()));
            }
            candidates.clear();
            continue;
        }

        candidates.push(block.text.trim());
    }

    if let Some(section) = open.take() {
        sections.push(section.finish(sections.len()));
    }

    let warnings = sections
        .iter()
        .filter(|s| s.existing_bullet_count == 0)
        .map(|s| {
            format!(
                "section '{}' has no existing bullets; new bullets follow its responsibilities label",
                s.heading
            )
        })
        .collect();

    LocatedSections { sections, warnings }
}

/// Marker paragraphs are never bullets themselves. Matching is case-insensitive on the
/// trimmed text.
pub fn is_marker(block: &Block, marker_labels: &[String]) -> bool {
    if block.is_list_item() {
        return false;
    }
    let normalized = block.text.trim().to_lowercase();
    if normalized.is_empty() {
        return false;
    }
    if marker_labels
        .iter()
        .any(|label| normalized.starts_with(label.as_str()))
    {
        return true;
    }
    normalized.contains(MARKER_KEYWORD)
        && normalized.split_whitespace().count() <= MARKER_KEYWORD_MAX_WORDS
}

/// A non-bullet title such as "EDUCATION" or "Technical Skills:", or a `##` heading.
pub fn is_section_end(block: &Block, section_end_labels: &[String]) -> bool {
    if block.is_list_item() {
        return false;
    }
    let trimmed = block.text.trim();
    if trimmed.starts_with("##") {
        return true;
    }
    let normalized = trimmed.trim_end_matches(':').trim_end().to_lowercase();
    if normalized.is_empty() || normalized.split_whitespace().count() > SECTION_END_MAX_WORDS {
        return false;
    }
    section_end_labels
        .iter()
        .any(|label| normalized.starts_with(label.as_str()))
}

/// Prefers the candidate nearest the marker that reads like a role or project title
/// ("Engineer | Acme | 2020 - 2022"); otherwise the nearest candidate.
fn pick_heading<'a>(candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .rev()
        .copied()
        .find(|c| looks_like_heading(c))
        .or_else(|| candidates.last().copied())
}

fn looks_like_heading(text: &str) -> bool {
    let lower = text.to_lowercase();
    text.contains('|') || HEADING_KEYWORDS.iter().any(|k| lower.contains(k))
}

pub fn default_marker_labels() -> Vec<String> {
    DEFAULT_MARKER_LABELS.iter().map(|s| s.to_string()).collect()
}

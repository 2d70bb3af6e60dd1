//! Document processor — runs the customization pipeline and folds every stage outcome
//! into one `ProcessingResult`.
//!
//! # Stages
//! `ReceivedInput → Parsed → Located → Distributed → Written → Serialized → Done`.
//! Any stage may end the run with a terminal `ErrorKind`; everything else is a warning.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::customizer::distributor::{distribute, ActiveSetPolicy, Distribution};
use crate::customizer::locator::{locate_sections, ProjectSection, SectionRules};
use crate::customizer::tech_stack::{parse_tech_stacks, TechStackEntry};
use crate::customizer::writer::write_plan;
use crate::docx::{DocxError, DocxPackage, PackageLimits, ParsedDocument};

/// Terminal failure of a processing run. Serialized verbatim for callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
pub enum ErrorKind {
    #[error("the upload is not a readable .docx document")]
    #[serde(rename = "CorruptDocumentError")]
    CorruptDocument,

    #[error("no responsibilities sections were found in the document")]
    #[serde(rename = "NoProjectsFoundError")]
    NoProjectsFound,

    #[error("the customized document could not be re-encoded")]
    #[serde(rename = "SerializationError")]
    Serialization,
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::CorruptDocument => "CorruptDocumentError",
            ErrorKind::NoProjectsFound => "NoProjectsFoundError",
            ErrorKind::Serialization => "SerializationError",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ReceivedInput,
    Parsed,
    Located,
    Distributed,
    Written,
    Serialized,
    Done,
}

/// Engine settings shared read-only by every run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    /// Labels that open and close responsibilities lists.
    pub sections: SectionRules,
    pub active_set: ActiveSetPolicy,
    pub package_limits: PackageLimits,
}

/// Per-section summary of an active section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionReport {
    pub index: usize,
    pub heading: String,
    pub points_added: usize,
}

/// Outcome of one `process` call.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingResult {
    pub success: bool,
    pub points_added: usize,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    /// Customized .docx bytes; present only on success.
    #[serde(skip)]
    pub document_bytes: Option<Vec<u8>>,
    pub tech_stacks: Vec<String>,
    pub sections: Vec<SectionReport>,
}

impl ProcessingResult {
    pub fn failed(error: ErrorKind, warnings: Vec<String>) -> Self {
        Self {
            success: false,
            points_added: 0,
            warnings,
            error: Some(error),
            document_bytes: None,
            tech_stacks: Vec::new(),
            sections: Vec::new(),
        }
    }
}

/// Everything known after distribution, before anything is written.
#[derive(Debug, Clone)]
pub struct PlannedRun {
    pub package: DocxPackage,
    pub document: ParsedDocument,
    pub entries: Vec<TechStackEntry>,
    /// Entry names in parse order.
    pub tech_stacks: Vec<String>,
    pub sections: Vec<ProjectSection>,
    pub distribution: Distribution,
    pub warnings: Vec<String>,
}

impl PlannedRun {
    pub fn section_reports(&self) -> Vec<SectionReport> {
        let mut active = self.distribution.active.clone();
        active.sort_unstable();
        active
            .into_iter()
            .filter_map(|index| self.sections.iter().find(|s| s.index == index))
            .map(|section| SectionReport {
                index: section.index,
                heading: section.heading.clone(),
                points_added: self.distribution.plan.bullets_for(section.index).len(),
            })
            .collect()
    }
}

/// Bullets planned for one active section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedSection {
    pub index: usize,
    pub heading: String,
    pub bullets: Vec<String>,
}

/// Dry-run outcome: what `process` would insert, without touching the document.
#[derive(Debug, Clone, Serialize)]
pub struct PreviewResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    pub entries: Vec<TechStackEntry>,
    pub sections: Vec<ProjectSection>,
    pub plan: Vec<PlannedSection>,
    pub warnings: Vec<String>,
}

/// Stateless pipeline runner; safe to share across threads.
#[derive(Debug, Clone, Default)]
pub struct DocumentProcessor {
    config: EngineConfig,
}

impl DocumentProcessor {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Customizes `document_bytes` with the points in `raw_tech_stack`.
    pub fn process(&self, document_bytes: &[u8], raw_tech_stack: &str) -> ProcessingResult {
        let planned = match self.plan(document_bytes, raw_tech_stack) {
            Ok(planned) => planned,
            Err((kind, warnings)) => return ProcessingResult::failed(kind, warnings),
        };

        let written = match write_plan(&planned.document, &planned.sections, &planned.distribution.plan) {
            Ok(written) => written,
            Err(e) => {
                error!("Inserted bullets broke the document structure: {e}");
                return ProcessingResult::failed(ErrorKind::Serialization, planned.warnings);
            }
        };
        debug!(stage = ?Stage::Written, points = written.points_written);

        let sections = planned.section_reports();
        let tech_stacks = planned.tech_stacks;
        let mut warnings = planned.warnings;
        warnings.extend(written.warnings);

        let bytes = match serialize(planned.package, written.document) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Failed to serialize customized document: {e}");
                return ProcessingResult::failed(ErrorKind::Serialization, warnings);
            }
        };
        debug!(stage = ?Stage::Serialized, bytes = bytes.len());

        info!(
            stage = ?Stage::Done,
            points_added = written.points_written,
            sections = sections.len(),
            warnings = warnings.len(),
            "Resume customized"
        );

        ProcessingResult {
            success: true,
            points_added: written.points_written,
            warnings,
            error: None,
            document_bytes: Some(bytes),
            tech_stacks,
            sections,
        }
    }

    /// Parses, locates and distributes, then reports the plan instead of writing it.
    pub fn preview(&self, document_bytes: &[u8], raw_tech_stack: &str) -> PreviewResult {
        match self.plan(document_bytes, raw_tech_stack) {
            Ok(planned) => {
                let plan = planned
                    .distribution
                    .plan
                    .iter()
                    .filter_map(|(index, bullets)| {
                        let section = planned.sections.iter().find(|s| s.index == index)?;
                        Some(PlannedSection {
                            index,
                            heading: section.heading.clone(),
                            bullets: bullets.to_vec(),
                        })
                    })
                    .collect();
                PreviewResult {
                    success: true,
                    error: None,
                    entries: planned.entries,
                    sections: planned.sections,
                    plan,
                    warnings: planned.warnings,
                }
            }
            Err((kind, warnings)) => PreviewResult {
                success: false,
                error: Some(kind),
                entries: Vec::new(),
                sections: Vec::new(),
                plan: Vec::new(),
                warnings,
            },
        }
    }

    /// Runs the pipeline up to distribution. On failure returns the terminal kind with
    /// the warnings gathered so far.
    pub fn plan(
        &self,
        document_bytes: &[u8],
        raw_tech_stack: &str,
    ) -> Result<PlannedRun, (ErrorKind, Vec<String>)> {
        debug!(stage = ?Stage::ReceivedInput, bytes = document_bytes.len());

        let (package, document) = open_document(document_bytes, self.config.package_limits)
            .map_err(|e| {
                warn!("Rejecting document: {e}");
                (ErrorKind::CorruptDocument, Vec::new())
            })?;

        let mut parsed = parse_tech_stacks(raw_tech_stack);
        debug!(
            stage = ?Stage::Parsed,
            entries = parsed.entries.len(),
            points = parsed.total_points()
        );
        let mut warnings = std::mem::take(&mut parsed.warnings);

        let located = locate_sections(&document, &self.config.sections);
        if located.sections.is_empty() {
            warn!("No responsibilities sections found");
            return Err((ErrorKind::NoProjectsFound, warnings));
        }
        debug!(stage = ?Stage::Located, sections = located.sections.len());
        warnings.extend(located.warnings);

        let distribution = distribute(&parsed.entries, &located.sections, &self.config.active_set);
        debug!(
            stage = ?Stage::Distributed,
            active = distribution.active.len(),
            points = distribution.plan.total_points()
        );
        warnings.extend(distribution.warnings.iter().cloned());
        if distribution.plan.is_empty() {
            debug!("No points to insert; document passes through unchanged");
        }

        Ok(PlannedRun {
            package,
            document,
            tech_stacks: parsed.names(),
            entries: parsed.entries,
            sections: located.sections,
            distribution,
            warnings,
        })
    }
}

fn open_document(
    bytes: &[u8],
    limits: PackageLimits,
) -> Result<(DocxPackage, ParsedDocument), DocxError> {
    let package = DocxPackage::open_with_limits(bytes, limits)?;
    let document = ParsedDocument::parse(package.document_xml()?)?;
    Ok((package, document))
}

fn serialize(package: DocxPackage, document: ParsedDocument) -> Result<Vec<u8>, DocxError> {
    package.with_document_xml(document.into_xml()).to_bytes()
}

//! Upload validation applied before a document reaches the processor.

use crate::errors::AppError;

const SUSPICIOUS_EXTENSIONS: &[&str] = &[
    "exe", "bat", "cmd", "scr", "vbs", "js", "jar", "com", "pif", "msi", "dll",
];

/// Longest accepted tech-stack text, in characters.
pub const MAX_TECH_STACK_CHARS: usize = 50_000;

/// Tech-stack texts with more lines than this are accepted with a warning.
const TECH_STACK_LINE_WARNING: usize = 1_000;

/// Per-request upload limits, derived from `Config`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_file_bytes: usize,
    pub max_batch_files: usize,
}

/// Checks one uploaded document. Returns non-fatal warnings; hard failures become
/// `AppError`s.
pub fn validate_document(
    file_name: &str,
    bytes: &[u8],
    limits: &UploadLimits,
) -> Result<Vec<String>, AppError> {
    if bytes.is_empty() {
        return Err(AppError::Validation(format!("File '{file_name}' is empty")));
    }
    if bytes.len() > limits.max_file_bytes {
        return Err(AppError::PayloadTooLarge(format!(
            "File '{file_name}' is too large ({:.2}MB). Maximum allowed: {}MB",
            bytes.len() as f64 / (1024.0 * 1024.0),
            limits.max_file_bytes / (1024 * 1024)
        )));
    }

    let extension = extension_of(file_name);
    if let Some(ext) = extension.as_deref() {
        if SUSPICIOUS_EXTENSIONS.contains(&ext) {
            return Err(AppError::Validation(format!(
                "File '{file_name}' has suspicious extension"
            )));
        }
    }

    let mut warnings = Vec::new();
    if extension.as_deref() != Some("docx") {
        warnings.push(format!(
            "file '{file_name}' does not have a .docx extension; processing anyway"
        ));
    }
    Ok(warnings)
}

/// Checks the raw tech-stack text. Empty text is allowed.
pub fn validate_tech_stack(text: &str) -> Result<Vec<String>, AppError> {
    let chars = text.chars().count();
    if chars > MAX_TECH_STACK_CHARS {
        return Err(AppError::Validation(format!(
            "Tech stack is too long ({chars} chars). Maximum: {MAX_TECH_STACK_CHARS}"
        )));
    }

    let lines = text.lines().count();
    let mut warnings = Vec::new();
    if lines > TECH_STACK_LINE_WARNING {
        warnings.push(format!("tech stack has many lines ({lines})"));
    }
    Ok(warnings)
}

pub fn validate_batch_size(count: usize, limits: &UploadLimits) -> Result<(), AppError> {
    if count == 0 {
        return Err(AppError::Validation("Batch contains no jobs".to_string()));
    }
    if count > limits.max_batch_files {
        return Err(AppError::Validation(format!(
            "Batch has {count} files; maximum allowed is {}",
            limits.max_batch_files
        )));
    }
    Ok(())
}

/// `customized_<original>`, with any directory components dropped.
pub fn output_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("resume.docx");
    format!("customized_{base}")
}

fn extension_of(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

use crate::customizer::bulk::{process_batch, BatchJob};
use crate::customizer::processor::{PreviewResult, ProcessingResult};
use crate::customizer::upload::{
    output_file_name, validate_batch_size, validate_document, validate_tech_stack,
};
use crate::errors::AppError;
use crate::state::AppState;

const DOCUMENT_FIELD: &str = "document";
const TECH_STACK_FIELD: &str = "tech_stack";

#[derive(Serialize)]
pub struct CustomizeResponse {
    pub request_id: Uuid,
    pub file_name: String,
    #[serde(flatten)]
    pub result: ProcessingResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_base64: Option<String>,
}

#[derive(Serialize)]
pub struct PreviewResponse {
    pub request_id: Uuid,
    #[serde(flatten)]
    pub preview: PreviewResult,
}

#[derive(Deserialize)]
pub struct BatchRequest {
    pub jobs: Vec<BatchJobRequest>,
}

#[derive(Deserialize)]
pub struct BatchJobRequest {
    pub file_name: String,
    pub document_base64: String,
    #[serde(default)]
    pub tech_stack: String,
}

#[derive(Serialize)]
pub struct BatchItemResponse {
    pub file_name: String,
    pub output_file_name: String,
    pub elapsed_ms: u64,
    #[serde(flatten)]
    pub result: ProcessingResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_base64: Option<String>,
}

#[derive(Serialize)]
pub struct BatchResponse {
    pub request_id: Uuid,
    pub processed: usize,
    pub failed: usize,
    pub results: Vec<BatchItemResponse>,
}

/// A validated single-document upload.
struct Upload {
    file_name: String,
    document: Bytes,
    tech_stack: String,
    warnings: Vec<String>,
}

/// POST /api/v1/customize
pub async fn handle_customize(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<CustomizeResponse>, AppError> {
    let request_id = Uuid::new_v4();
    async move {
        let upload = read_upload(&state, multipart).await?;
        let processor = state.processor.clone();
        let Upload {
            file_name,
            document,
            tech_stack,
            warnings,
        } = upload;

        let mut result = tokio::task::spawn_blocking(move || processor.process(&document, &tech_stack))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("processing task failed: {e}")))?;
        prepend_warnings(&mut result.warnings, warnings);

        info!(
            file = %file_name,
            success = result.success,
            points_added = result.points_added,
            "Customize request finished"
        );

        let document_base64 = result.document_bytes.take().map(|bytes| STANDARD.encode(bytes));
        Ok::<_, AppError>(Json(CustomizeResponse {
            request_id,
            file_name: output_file_name(&file_name),
            result,
            document_base64,
        }))
    }
    .instrument(info_span!("customize", %request_id))
    .await
}

/// POST /api/v1/customize/preview
pub async fn handle_preview(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<PreviewResponse>, AppError> {
    let request_id = Uuid::new_v4();
    async move {
        let Upload {
            document,
            tech_stack,
            warnings,
            ..
        } = read_upload(&state, multipart).await?;
        let processor = state.processor.clone();

        let mut preview = tokio::task::spawn_blocking(move || processor.preview(&document, &tech_stack))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("preview task failed: {e}")))?;
        prepend_warnings(&mut preview.warnings, warnings);

        Ok::<_, AppError>(Json(PreviewResponse {
            request_id,
            preview,
        }))
    }
    .instrument(info_span!("preview", %request_id))
    .await
}

/// POST /api/v1/customize/batch
pub async fn handle_batch(
    State(state): State<AppState>,
    Json(req): Json<BatchRequest>,
) -> Result<Json<BatchResponse>, AppError> {
    let request_id = Uuid::new_v4();
    async move {
        let limits = state.upload_limits();
        validate_batch_size(req.jobs.len(), &limits)?;

        let mut jobs = Vec::with_capacity(req.jobs.len());
        let mut upload_warnings = Vec::with_capacity(req.jobs.len());
        for job in req.jobs {
            let document = STANDARD.decode(job.document_base64.trim()).map_err(|e| {
                AppError::Validation(format!("File '{}' is not valid base64: {e}", job.file_name))
            })?;
            let mut warnings = validate_document(&job.file_name, &document, &limits)?;
            warnings.extend(validate_tech_stack(&job.tech_stack)?);
            upload_warnings.push(warnings);
            jobs.push(BatchJob {
                file_name: job.file_name,
                document: Bytes::from(document),
                tech_stack: job.tech_stack,
            });
        }

        let items = process_batch(state.processor.clone(), jobs, state.config.max_workers).await;

        let results: Vec<BatchItemResponse> = items
            .into_iter()
            .zip(upload_warnings)
            .map(|(mut item, warnings)| {
                prepend_warnings(&mut item.result.warnings, warnings);
                let document_base64 = item
                    .result
                    .document_bytes
                    .take()
                    .map(|bytes| STANDARD.encode(bytes));
                BatchItemResponse {
                    output_file_name: output_file_name(&item.file_name),
                    file_name: item.file_name,
                    elapsed_ms: item.elapsed_ms,
                    result: item.result,
                    document_base64,
                }
            })
            .collect();

        let failed = results.iter().filter(|r| !r.result.success).count();
        Ok::<_, AppError>(Json(BatchResponse {
            request_id,
            processed: results.len() - failed,
            failed,
            results,
        }))
    }
    .instrument(info_span!("batch", %request_id))
    .await
}

async fn read_upload(state: &AppState, mut multipart: Multipart) -> Result<Upload, AppError> {
    let mut document: Option<(String, Bytes)> = None;
    let mut tech_stack: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(DOCUMENT_FIELD) => {
                let file_name = field
                    .file_name()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "resume.docx".to_string());
                let bytes = field.bytes().await.map_err(multipart_error)?;
                document = Some((file_name, bytes));
            }
            Some(TECH_STACK_FIELD) => {
                tech_stack = Some(field.text().await.map_err(multipart_error)?);
            }
            other => debug!(field = ?other, "Ignoring unknown multipart field"),
        }
    }

    let (file_name, document) = document
        .ok_or_else(|| AppError::Validation(format!("Missing '{DOCUMENT_FIELD}' file field")))?;
    let tech_stack = tech_stack
        .ok_or_else(|| AppError::Validation(format!("Missing '{TECH_STACK_FIELD}' field")))?;
    let mut warnings = validate_document(&file_name, &document, &state.upload_limits())?;
    warnings.extend(validate_tech_stack(&tech_stack)?);

    Ok(Upload {
        file_name,
        document,
        tech_stack,
        warnings,
    })
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::Validation(format!("Failed to read multipart field: {}", e.body_text()))
    }
}

/// Upload warnings come before everything the engine reports.
fn prepend_warnings(target: &mut Vec<String>, mut upload: Vec<String>) {
    if upload.is_empty() {
        return;
    }
    upload.append(target);
    *target = upload;
}

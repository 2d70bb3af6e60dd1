//! Bulk mode — runs many independent documents through one shared processor with a
//! bounded worker pool.

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::customizer::processor::{DocumentProcessor, ErrorKind, ProcessingResult};

/// Upper bound on concurrent jobs regardless of configuration.
pub const MAX_WORKERS_LIMIT: usize = 8;

#[derive(Debug, Clone)]
pub struct BatchJob {
    pub file_name: String,
    pub document: Bytes,
    pub tech_stack: String,
}

#[derive(Debug, Clone)]
pub struct BatchItem {
    pub file_name: String,
    pub result: ProcessingResult,
    pub elapsed_ms: u64,
}

/// Processes `jobs` with at most `max_workers` running at once (clamped to
/// `1..=MAX_WORKERS_LIMIT`). Items come back in input order. A job that panics is
/// reported as a failed item and does not affect the others.
pub async fn process_batch(
    processor: Arc<DocumentProcessor>,
    jobs: Vec<BatchJob>,
    max_workers: usize,
) -> Vec<BatchItem> {
    let workers = max_workers.clamp(1, MAX_WORKERS_LIMIT);
    let semaphore = Arc::new(Semaphore::new(workers));
    let total = jobs.len();
    info!(jobs = total, workers, "Starting batch");

    let names: Vec<String> = jobs.iter().map(|j| j.file_name.clone()).collect();
    let mut set = JoinSet::new();

    for (position, job) in jobs.into_iter().enumerate() {
        let processor = Arc::clone(&processor);
        let semaphore = Arc::clone(&semaphore);
        set.spawn(async move {
            // The semaphore is never closed, so acquire only fails if it were.
            let _permit = semaphore.acquire_owned().await.ok();
            let started = Instant::now();
            let file_name = job.file_name.clone();
            let outcome = tokio::task::spawn_blocking(move || {
                processor.process(&job.document, &job.tech_stack)
            })
            .await;
            let result = outcome.unwrap_or_else(|e| {
                error!(file = %file_name, "Batch job aborted: {e}");
                ProcessingResult::failed(
                    ErrorKind::Serialization,
                    vec![format!("processing of '{file_name}' aborted unexpectedly")],
                )
            });
            (position, result, elapsed_ms(started))
        });
    }

    let mut slots: Vec<Option<(ProcessingResult, u64)>> = vec![None; total];
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((position, result, elapsed)) => slots[position] = Some((result, elapsed)),
            Err(e) => error!("Batch task failed to join: {e}"),
        }
    }

    let items: Vec<BatchItem> = names
        .into_iter()
        .zip(slots)
        .map(|(file_name, slot)| {
            let (result, elapsed_ms) = slot.unwrap_or_else(|| {
                (
                    ProcessingResult::failed(
                        ErrorKind::Serialization,
                        vec![format!("processing of '{file_name}' aborted unexpectedly")],
                    ),
                    0,
                )
            });
            BatchItem {
                file_name,
                result,
                elapsed_ms,
            }
        })
        .collect();

    let failed = items.iter().filter(|i| !i.result.success).count();
    info!(jobs = total, failed, "Batch finished");
    items
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

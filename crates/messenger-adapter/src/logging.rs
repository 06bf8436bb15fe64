//! Job outcome logger.
//!
//! Writes one structured JSON record per processed job and keeps running
//! counts, so unhandled event shapes are observable rather than silent.

use std::path::PathBuf;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::MessengerError;
use crate::types::{DispatchOutcome, JobOutcomeLog, OutcomeKind, ProcessedMessage, WebhookJob};

/// Running totals by outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeCounts {
    pub processed: u64,
    pub unhandled: u64,
    pub failed: u64,
}

impl OutcomeCounts {
    pub fn total(&self) -> u64 {
        self.processed + self.unhandled + self.failed
    }
}

/// Structured outcome logger that writes JSON lines to a file and to tracing.
pub struct OutcomeLogger {
    log_path: Option<PathBuf>,
    counts: RwLock<OutcomeCounts>,
}

impl OutcomeLogger {
    /// If `log_path` is `None`, records go to tracing output only.
    pub fn new(log_path: Option<PathBuf>) -> Self {
        Self {
            log_path,
            counts: RwLock::new(OutcomeCounts::default()),
        }
    }

    pub async fn log(&self, entry: &JobOutcomeLog) {
        let json = serde_json::to_string(entry).unwrap_or_else(|e| {
            format!(
                r#"{{"error":"serialization failed: {}","ts":"{}"}}"#,
                e,
                Utc::now().to_rfc3339()
            )
        });

        tracing::info!(target: "messenger_outcome", "{}", json);

        if let Some(ref path) = self.log_path {
            if let Err(e) = append_log_line(path, &json).await {
                tracing::warn!("Failed to write outcome log: {}", e);
            }
        }

        let mut counts = self.counts.write().await;
        match entry.outcome {
            OutcomeKind::Processed => counts.processed += 1,
            OutcomeKind::Unhandled => counts.unhandled += 1,
            OutcomeKind::Failed => counts.failed += 1,
        }
    }

    /// Entry for a job the service processor finished.
    pub fn processed_entry(
        job: &WebhookJob,
        processed: &ProcessedMessage,
        duration_ms: Option<u64>,
    ) -> JobOutcomeLog {
        let (outcome, event) = match processed.outcome {
            DispatchOutcome::Processed(kind) => (OutcomeKind::Processed, Some(kind)),
            DispatchOutcome::Unhandled => (OutcomeKind::Unhandled, None),
        };
        JobOutcomeLog {
            ts: Utc::now(),
            job_id: job.id,
            service: job.service.clone(),
            page_id: Some(processed.service_message.page_info.id.clone()),
            sender_id: Some(processed.service_message.sender_id.clone()),
            outcome,
            event,
            duration_ms,
            error: None,
        }
    }

    /// Entry for a job that aborted with an error.
    pub fn failed_entry(
        job: &WebhookJob,
        error: &MessengerError,
        duration_ms: Option<u64>,
    ) -> JobOutcomeLog {
        JobOutcomeLog {
            ts: Utc::now(),
            job_id: job.id,
            service: job.service.clone(),
            page_id: None,
            sender_id: None,
            outcome: OutcomeKind::Failed,
            event: None,
            duration_ms,
            error: Some(error.to_string()),
        }
    }

    pub async fn counts(&self) -> OutcomeCounts {
        *self.counts.read().await
    }
}

async fn append_log_line(path: &std::path::Path, line: &str) -> Result<(), std::io::Error> {
    use tokio::io::AsyncWriteExt;

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.write_all(b"\n").await?;
    Ok(())
}

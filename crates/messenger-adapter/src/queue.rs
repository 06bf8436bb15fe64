//! In-process job queue and worker.
//!
//! [`InMemoryJobQueue`] implements [`JobEnqueuer`] over a bounded tokio
//! channel; [`JobWorker`] drains it and runs each job through the
//! [`ServiceRegistry`]. Failed jobs are logged and dropped, never retried.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::MessengerError;
use crate::logging::OutcomeLogger;
use crate::manager::ServiceRegistry;
use crate::traits::JobEnqueuer;
use crate::types::WebhookJob;

/// Sending half of the in-process queue.
#[derive(Clone)]
pub struct InMemoryJobQueue {
    tx: mpsc::Sender<WebhookJob>,
}

impl InMemoryJobQueue {
    /// Create a queue holding at most `capacity` pending jobs.
    ///
    /// Returns the queue and the receiver to hand to a [`JobWorker`].
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<WebhookJob>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl JobEnqueuer for InMemoryJobQueue {
    async fn enqueue(&self, job: WebhookJob) -> Result<(), MessengerError> {
        let job_id = job.id;
        self.tx.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                MessengerError::Enqueue("job queue is full".to_string())
            }
            mpsc::error::TrySendError::Closed(_) => {
                MessengerError::Enqueue("job queue is closed".to_string())
            }
        })?;
        tracing::debug!(job_id = %job_id, "job enqueued");
        Ok(())
    }
}

/// Consumes queued jobs until every sender is dropped.
pub struct JobWorker {
    rx: mpsc::Receiver<WebhookJob>,
    registry: Arc<ServiceRegistry>,
    logger: Arc<OutcomeLogger>,
}

impl JobWorker {
    pub fn new(
        rx: mpsc::Receiver<WebhookJob>,
        registry: Arc<ServiceRegistry>,
        logger: Arc<OutcomeLogger>,
    ) -> Self {
        Self {
            rx,
            registry,
            logger,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(services = ?self.registry.list_services(), "job worker started");
        while let Some(job) = self.rx.recv().await {
            // Failures are already logged and counted.
            let _ = handle_job(&self.registry, &self.logger, &job).await;
        }
        tracing::info!("job worker stopped: queue closed");
    }
}

/// Run one job and record its outcome.
pub async fn handle_job(
    registry: &ServiceRegistry,
    logger: &OutcomeLogger,
    job: &WebhookJob,
) -> Result<(), MessengerError> {
    let start = Instant::now();
    let result = registry.process(job).await;
    let duration_ms = Some(start.elapsed().as_millis() as u64);

    match result {
        Ok(processed) => {
            logger
                .log(&OutcomeLogger::processed_entry(job, &processed, duration_ms))
                .await;
            Ok(())
        }
        Err(e) => {
            tracing::error!(
                job_id = %job.id,
                service = %job.service,
                error = %e,
                "Job processing failed"
            );
            logger
                .log(&OutcomeLogger::failed_entry(job, &e, duration_ms))
                .await;
            Err(e)
        }
    }
}

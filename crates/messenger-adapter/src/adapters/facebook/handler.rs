//! Worker-side processing entry point for queued Messenger deliveries.

use async_trait::async_trait;

use super::dispatch::{dispatch, EventProcessors};
use super::normalizer::normalize;
use crate::credentials::CredentialResolver;
use crate::error::MessengerError;
use crate::traits::JobProcessor;
use crate::types::{ProcessedMessage, WebhookJob};

/// Normalizes a queued payload and dispatches it to an event processor.
pub struct FacebookMessageHandler {
    resolver: CredentialResolver,
    processors: EventProcessors,
}

impl FacebookMessageHandler {
    pub fn new(resolver: CredentialResolver, processors: EventProcessors) -> Self {
        Self {
            resolver,
            processors,
        }
    }

    /// Process raw webhook params. Any decode, credential or processor
    /// failure aborts with an error; nothing is retried here.
    pub async fn process_params(
        &self,
        params: &serde_json::Value,
    ) -> Result<ProcessedMessage, MessengerError> {
        let normalized = normalize(params, &self.resolver).await?;
        let outcome = dispatch(
            &self.processors,
            &normalized.service_message,
            &normalized.item,
        )
        .await?;

        Ok(ProcessedMessage {
            service_message: normalized.service_message,
            outcome,
        })
    }
}

#[async_trait]
impl JobProcessor for FacebookMessageHandler {
    async fn process(&self, job: &WebhookJob) -> Result<ProcessedMessage, MessengerError> {
        tracing::debug!(job_id = %job.id, "processing Messenger job");
        self.process_params(&job.params).await
    }
}

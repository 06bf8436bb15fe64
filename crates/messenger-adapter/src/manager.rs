//! Service registry: routes queued jobs to the processor for their service.
//!
//! A job only carries the service name as a string, so unknown names are an
//! explicit error rather than a silent drop.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::MessengerError;
use crate::traits::JobProcessor;
use crate::types::{MessagingService, ProcessedMessage, WebhookJob};

#[derive(Default)]
pub struct ServiceRegistry {
    processors: HashMap<String, Arc<dyn JobProcessor>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the processor for a service, replacing any previous one.
    pub fn register(&mut self, service: MessagingService, processor: Arc<dyn JobProcessor>) {
        if self
            .processors
            .insert(service.as_str().to_string(), processor)
            .is_some()
        {
            tracing::warn!(service = %service, "replaced existing job processor");
        }
    }

    pub async fn process(&self, job: &WebhookJob) -> Result<ProcessedMessage, MessengerError> {
        let processor = self
            .processors
            .get(&job.service)
            .ok_or_else(|| MessengerError::UnknownService(job.service.clone()))?;
        processor.process(job).await
    }

    /// Registered service names, sorted.
    pub fn list_services(&self) -> Vec<String> {
        let mut names: Vec<String> = self.processors.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DispatchOutcome, PageCredential, ServiceMessage};
    use async_trait::async_trait;
    use std::collections::BTreeMap;

    struct StaticProcessor;

    #[async_trait]
    impl JobProcessor for StaticProcessor {
        async fn process(&self, _job: &WebhookJob) -> Result<ProcessedMessage, MessengerError> {
            Ok(ProcessedMessage {
                service_message: ServiceMessage {
                    service: MessagingService::Facebook,
                    sender_id: "U".to_string(),
                    target_id: "P".to_string(),
                    timestamp: chrono::Utc::now(),
                    page_info: PageCredential {
                        id: "P".to_string(),
                        access_token: "t".to_string(),
                    },
                },
                outcome: DispatchOutcome::Unhandled,
            })
        }
    }

    fn job_for(service: &str) -> WebhookJob {
        let mut job = WebhookJob::new(
            MessagingService::Facebook,
            serde_json::json!({}),
            BTreeMap::new(),
        );
        job.service = service.to_string();
        job
    }

    #[test]
    fn registry_list_empty() {
        assert!(ServiceRegistry::new().list_services().is_empty());
    }

    #[tokio::test]
    async fn registry_routes_by_service_name() {
        let mut registry = ServiceRegistry::new();
        registry.register(MessagingService::Facebook, Arc::new(StaticProcessor));
        assert_eq!(registry.list_services(), vec!["facebook".to_string()]);

        let processed = registry.process(&job_for("facebook")).await.unwrap();
        assert_eq!(processed.outcome, DispatchOutcome::Unhandled);
    }

    #[tokio::test]
    async fn registry_rejects_unknown_service() {
        let registry = ServiceRegistry::new();
        match registry.process(&job_for("twilio")).await {
            Err(MessengerError::UnknownService(name)) => assert_eq!(name, "twilio"),
            other => panic!("expected UnknownService, got: {:?}", other.map(|p| p.outcome)),
        }
    }
}

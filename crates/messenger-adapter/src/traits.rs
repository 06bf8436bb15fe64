use async_trait::async_trait;

use crate::error::MessengerError;
use crate::types::{AdapterHealth, MessagingService, ProcessedMessage, WebhookJob};

/// Core trait for inbound webhook adapters.
///
/// Implementors own the HTTP surface for one messaging service: they accept
/// platform callbacks, acknowledge them quickly and hand real work to a
/// [`JobEnqueuer`].
#[async_trait]
pub trait WebhookAdapter: Send + Sync {
    /// Start receiving callbacks from the platform.
    async fn start(&self) -> Result<(), MessengerError>;

    /// Stop the adapter gracefully.
    async fn stop(&self) -> Result<(), MessengerError>;

    /// Which service this adapter handles.
    fn service(&self) -> MessagingService;

    async fn check_health(&self) -> Result<AdapterHealth, MessengerError>;
}

/// Capability to hand a webhook delivery to an asynchronous job queue.
///
/// The coordinator treats this as fire-and-forget: once `enqueue` returns
/// `Ok`, ordering, retry and acknowledgment belong to the queue.
#[async_trait]
pub trait JobEnqueuer: Send + Sync {
    async fn enqueue(&self, job: WebhookJob) -> Result<(), MessengerError>;
}

/// Out-of-band processing entry point for queued jobs of one service.
#[async_trait]
pub trait JobProcessor: Send + Sync {
    async fn process(&self, job: &WebhookJob) -> Result<ProcessedMessage, MessengerError>;
}

/// Keyed, read-only access-token lookup (`"<service>:<page_id>"` → token).
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn access_token(&self, key: &str) -> Result<Option<String>, MessengerError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tokio::sync::Mutex;

    struct MockAdapter;

    #[async_trait]
    impl WebhookAdapter for MockAdapter {
        async fn start(&self) -> Result<(), MessengerError> {
            Ok(())
        }
        async fn stop(&self) -> Result<(), MessengerError> {
            Ok(())
        }
        fn service(&self) -> MessagingService {
            MessagingService::Facebook
        }
        async fn check_health(&self) -> Result<AdapterHealth, MessengerError> {
            Ok(AdapterHealth {
                connected: true,
                service: MessagingService::Facebook,
                deliveries_accepted: 0,
                last_delivery_at: None,
                uptime_secs: 0,
            })
        }
    }

    #[derive(Default)]
    struct RecordingEnqueuer {
        jobs: Mutex<Vec<WebhookJob>>,
    }

    #[async_trait]
    impl JobEnqueuer for RecordingEnqueuer {
        async fn enqueue(&self, job: WebhookJob) -> Result<(), MessengerError> {
            self.jobs.lock().await.push(job);
            Ok(())
        }
    }

    #[tokio::test]
    async fn mock_adapter_lifecycle() {
        let adapter = MockAdapter;
        assert!(adapter.start().await.is_ok());
        assert_eq!(adapter.service(), MessagingService::Facebook);
        let health = adapter.check_health().await.unwrap();
        assert!(health.connected);
        assert!(adapter.stop().await.is_ok());
    }

    #[tokio::test]
    async fn enqueuer_is_object_safe() {
        let recorder = std::sync::Arc::new(RecordingEnqueuer::default());
        let enqueuer: std::sync::Arc<dyn JobEnqueuer> = recorder.clone();
        let job = WebhookJob::new(
            MessagingService::Facebook,
            serde_json::json!({}),
            BTreeMap::new(),
        );
        enqueuer.enqueue(job).await.unwrap();
        assert_eq!(recorder.jobs.lock().await.len(), 1);
    }
}

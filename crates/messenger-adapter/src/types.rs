use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Supported messaging services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessagingService {
    Facebook,
}

impl MessagingService {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessagingService::Facebook => "facebook",
        }
    }
}

impl std::fmt::Display for MessagingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Page id and the access token used to act on behalf of that page.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCredential {
    pub id: String,
    pub access_token: String,
}

impl std::fmt::Debug for PageCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageCredential")
            .field("id", &self.id)
            .field("access_token", &"[redacted]")
            .finish()
    }
}

/// A single inbound event normalized across services.
///
/// Built by the payload normalizer and handed by reference to exactly one
/// event processor. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceMessage {
    pub service: MessagingService,
    pub sender_id: String,
    pub target_id: String,
    pub timestamp: DateTime<Utc>,
    pub page_info: PageCredential,
}

/// The unit of work handed to the job queue: service name, raw params, raw headers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookJob {
    pub id: Uuid,
    pub service: String,
    pub params: serde_json::Value,
    pub headers: BTreeMap<String, String>,
    pub enqueued_at: DateTime<Utc>,
}

impl WebhookJob {
    pub fn new(
        service: MessagingService,
        params: serde_json::Value,
        headers: BTreeMap<String, String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            service: service.as_str().to_string(),
            params,
            headers,
            enqueued_at: Utc::now(),
        }
    }
}

/// Status and body returned to the platform for a webhook call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub status: u16,
    pub body: String,
}

impl WebhookResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }

    pub fn unauthorized(body: impl Into<String>) -> Self {
        Self::new(401, body)
    }
}

/// The four event kinds a messaging item can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Message,
    Postback,
    ReadReceipt,
    Referral,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Message => write!(f, "message"),
            EventKind::Postback => write!(f, "postback"),
            EventKind::ReadReceipt => write!(f, "read_receipt"),
            EventKind::Referral => write!(f, "referral"),
        }
    }
}

/// What the dispatcher did with a messaging item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "event", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Processed(EventKind),
    /// None of the known event keys was present.
    Unhandled,
}

/// Result of running a queued job through a service processor.
#[derive(Debug, Clone)]
pub struct ProcessedMessage {
    pub service_message: ServiceMessage,
    pub outcome: DispatchOutcome,
}

/// Health status of a webhook adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterHealth {
    pub connected: bool,
    pub service: MessagingService,
    pub deliveries_accepted: u64,
    pub last_delivery_at: Option<DateTime<Utc>>,
    pub uptime_secs: u64,
}

/// One structured record per processed job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutcomeLog {
    pub ts: DateTime<Utc>,
    pub job_id: Uuid,
    pub service: String,
    pub page_id: Option<String>,
    pub sender_id: Option<String>,
    pub outcome: OutcomeKind,
    pub event: Option<EventKind>,
    pub duration_ms: Option<u64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Processed,
    Unhandled,
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messaging_service_display() {
        assert_eq!(MessagingService::Facebook.to_string(), "facebook");
    }

    #[test]
    fn messaging_service_serialization() {
        let json = serde_json::to_string(&MessagingService::Facebook).unwrap();
        assert_eq!(json, "\"facebook\"");
        let parsed: MessagingService = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, MessagingService::Facebook);
    }

    #[test]
    fn page_credential_debug_hides_token() {
        let cred = PageCredential {
            id: "1234".to_string(),
            access_token: "EAAB-secret".to_string(),
        };
        let rendered = format!("{:?}", cred);
        assert!(rendered.contains("1234"));
        assert!(!rendered.contains("EAAB-secret"));
    }

    #[test]
    fn webhook_job_carries_service_name() {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        let job = WebhookJob::new(
            MessagingService::Facebook,
            serde_json::json!({"object": "page"}),
            headers.clone(),
        );
        assert_eq!(job.service, "facebook");
        assert_eq!(job.headers, headers);

        let json = serde_json::to_string(&job).unwrap();
        let parsed: WebhookJob = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, job.id);
        assert_eq!(parsed.params["object"], "page");
    }

    #[test]
    fn dispatch_outcome_serialization() {
        let json = serde_json::to_string(&DispatchOutcome::Processed(EventKind::ReadReceipt)).unwrap();
        assert_eq!(json, r#"{"outcome":"processed","event":"read_receipt"}"#);
        let json = serde_json::to_string(&DispatchOutcome::Unhandled).unwrap();
        assert_eq!(json, r#"{"outcome":"unhandled"}"#);
    }
}

//! Turns a raw Messenger payload into a [`ServiceMessage`].

use chrono::{DateTime, Utc};

use super::events::{decode_payload, MessagingItem};
use crate::credentials::CredentialResolver;
use crate::error::MessengerError;
use crate::types::{MessagingService, ServiceMessage};

/// A populated service message and the messaging item it was built from.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub service_message: ServiceMessage,
    pub item: MessagingItem,
}

/// Convert a platform timestamp (ms since epoch) to whole seconds.
pub fn ms_to_datetime(ms: i64) -> Result<DateTime<Utc>, MessengerError> {
    DateTime::from_timestamp(ms.div_euclid(1000), 0).ok_or(MessengerError::InvalidTimestamp(ms))
}

/// Build the service message for the first messaging item of the first entry.
///
/// The page token is resolved before the participant fields are read, so a
/// missing credential aborts processing even for otherwise malformed items.
pub async fn normalize(
    params: &serde_json::Value,
    resolver: &CredentialResolver,
) -> Result<Normalized, MessengerError> {
    let payload = decode_payload(params)?;
    let entry = payload.first_entry()?;
    let item = entry.first_messaging()?;
    tracing::debug!(page_id = %entry.id, item = ?item, "normalizing Messenger event");

    let page_info = resolver.resolve(&entry.id).await?;
    let sender_id = item.sender_id()?.to_string();
    let target_id = item.recipient_id()?.to_string();
    let timestamp = ms_to_datetime(item.timestamp_ms()?)?;

    Ok(Normalized {
        service_message: ServiceMessage {
            service: MessagingService::Facebook,
            sender_id,
            target_id,
            timestamp,
            page_info,
        },
        item,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::InMemoryCredentialStore;
    use crate::error::PayloadError;
    use serde_json::json;
    use std::sync::Arc;

    async fn resolver(stored: Option<(&str, &str)>, fallback: Option<&str>) -> CredentialResolver {
        let store = InMemoryCredentialStore::new();
        if let Some((page, token)) = stored {
            store.insert(MessagingService::Facebook, page, token).await;
        }
        CredentialResolver::new(
            MessagingService::Facebook,
            Arc::new(store),
            fallback.map(str::to_string),
        )
    }

    fn payload() -> serde_json::Value {
        json!({
            "object": "page",
            "entry": [{
                "id": "PAGE_1",
                "time": 1700000000500_i64,
                "messaging": [{
                    "sender": {"id": "USER_1"},
                    "recipient": {"id": "PAGE_1"},
                    "timestamp": 1700000000000_i64,
                    "message": {"mid": "m", "text": "hey"}
                }]
            }]
        })
    }

    #[test]
    fn timestamp_conversion() {
        let ts = ms_to_datetime(1_700_000_000_000).unwrap();
        assert_eq!(ts.timestamp(), 1_700_000_000);
    }

    #[test]
    fn timestamp_drops_sub_second_part() {
        let ts = ms_to_datetime(1_700_000_000_999).unwrap();
        assert_eq!(ts.timestamp(), 1_700_000_000);
        assert_eq!(ts.timestamp_subsec_nanos(), 0);
    }

    #[test]
    fn timestamp_out_of_range() {
        assert!(matches!(
            ms_to_datetime(i64::MAX),
            Err(MessengerError::InvalidTimestamp(_))
        ));
    }

    #[tokio::test]
    async fn normalize_populates_every_field() {
        let resolver = resolver(Some(("PAGE_1", "page-token")), None).await;
        let normalized = normalize(&payload(), &resolver).await.unwrap();
        let msg = normalized.service_message;
        assert_eq!(msg.service, MessagingService::Facebook);
        assert_eq!(msg.sender_id, "USER_1");
        assert_eq!(msg.target_id, "PAGE_1");
        assert_eq!(msg.timestamp.timestamp(), 1_700_000_000);
        assert_eq!(msg.page_info.id, "PAGE_1");
        assert_eq!(msg.page_info.access_token, "page-token");
        assert!(normalized.item.message.is_some());
    }

    #[tokio::test]
    async fn normalize_uses_fallback_token() {
        let resolver = resolver(None, Some("static-token")).await;
        let normalized = normalize(&payload(), &resolver).await.unwrap();
        assert_eq!(normalized.service_message.page_info.access_token, "static-token");
    }

    #[tokio::test]
    async fn normalize_fails_without_credential() {
        let resolver = resolver(None, None).await;
        let err = normalize(&payload(), &resolver).await.unwrap_err();
        assert!(matches!(err, MessengerError::MissingCredential { .. }));
    }

    #[tokio::test]
    async fn normalize_reports_missing_sender() {
        let resolver = resolver(None, Some("t")).await;
        let mut params = payload();
        params["entry"][0]["messaging"][0]
            .as_object_mut()
            .unwrap()
            .remove("sender");
        match normalize(&params, &resolver).await {
            Err(MessengerError::Payload(PayloadError::MissingField(field))) => {
                assert_eq!(field, "sender.id")
            }
            other => panic!("expected MissingField, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn normalize_reports_empty_entry_list() {
        let resolver = resolver(None, Some("t")).await;
        let err = normalize(&json!({"object": "page", "entry": []}), &resolver)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MessengerError::Payload(PayloadError::MissingEntry)
        ));
    }
}

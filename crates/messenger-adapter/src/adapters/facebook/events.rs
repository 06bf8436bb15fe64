//! Messenger Platform webhook payload parsing.
//!
//! Typed view of the `page` webhook body:
//! `entry[] → messaging[] → {sender, recipient, timestamp, message|postback|read|referral}`.
//! Only the first entry and its first messaging item are decoded into typed
//! structs; later batch members stay raw JSON. Structural problems surface as
//! [`PayloadError`] kinds instead of panics.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::PayloadError;
use crate::types::EventKind;

/// Top-level webhook body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookPayload {
    /// Subscription object, `"page"` for Messenger.
    pub object: Option<String>,
    #[serde(default)]
    pub entry: Vec<Value>,
}

/// One page's batch of events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    /// Page id.
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub time: Option<i64>,
    #[serde(default)]
    pub messaging: Vec<Value>,
}

/// A single messaging event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingItem {
    pub sender: Option<Participant>,
    pub recipient: Option<Participant>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: Option<i64>,
    #[serde(default, deserialize_with = "present")]
    pub message: Option<MessageBody>,
    #[serde(default, deserialize_with = "present")]
    pub postback: Option<Postback>,
    #[serde(default, deserialize_with = "present")]
    pub read: Option<ReadReceipt>,
    #[serde(default, deserialize_with = "present")]
    pub referral: Option<Referral>,
    /// Keys this adapter does not model (delivery, optin, reaction, ...).
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    #[serde(default, deserialize_with = "opt_id_string")]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageBody {
    pub mid: Option<String>,
    pub text: Option<String>,
    #[serde(default)]
    pub is_echo: bool,
    pub quick_reply: Option<QuickReply>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuickReply {
    pub payload: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Postback {
    pub title: Option<String>,
    pub payload: Option<String>,
    pub referral: Option<Referral>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReadReceipt {
    /// Every message sent before this timestamp (ms) has been read.
    pub watermark: Option<i64>,
    pub seq: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Referral {
    #[serde(rename = "ref")]
    pub reference: Option<String>,
    pub source: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub ad_id: Option<String>,
}

/// The event carried by a messaging item, by precedence.
#[derive(Debug, Clone, Copy)]
pub enum MessagingEvent<'a> {
    Message(&'a MessageBody),
    Postback(&'a Postback),
    ReadReceipt(&'a ReadReceipt),
    Referral(&'a Referral),
    Unknown,
}

impl MessagingEvent<'_> {
    pub fn kind(&self) -> Option<EventKind> {
        match self {
            MessagingEvent::Message(_) => Some(EventKind::Message),
            MessagingEvent::Postback(_) => Some(EventKind::Postback),
            MessagingEvent::ReadReceipt(_) => Some(EventKind::ReadReceipt),
            MessagingEvent::Referral(_) => Some(EventKind::Referral),
            MessagingEvent::Unknown => None,
        }
    }
}

/// Decode raw webhook params into the typed payload.
pub fn decode_payload(params: &Value) -> Result<WebhookPayload, PayloadError> {
    WebhookPayload::deserialize(params).map_err(malformed)
}

impl WebhookPayload {
    /// Decode the first entry; the rest of the batch is never inspected.
    pub fn first_entry(&self) -> Result<Entry, PayloadError> {
        let raw = self.entry.first().ok_or(PayloadError::MissingEntry)?;
        Entry::deserialize(raw).map_err(malformed)
    }
}

impl Entry {
    /// Decode the first messaging item; later items are never inspected.
    pub fn first_messaging(&self) -> Result<MessagingItem, PayloadError> {
        let raw = self
            .messaging
            .first()
            .ok_or(PayloadError::MissingMessaging)?;
        MessagingItem::deserialize(raw).map_err(malformed)
    }
}

fn malformed(e: serde_json::Error) -> PayloadError {
    PayloadError::Malformed(e.to_string())
}

impl MessagingItem {
    pub fn sender_id(&self) -> Result<&str, PayloadError> {
        self.sender
            .as_ref()
            .and_then(|p| p.id.as_deref())
            .ok_or(PayloadError::MissingField("sender.id"))
    }

    pub fn recipient_id(&self) -> Result<&str, PayloadError> {
        self.recipient
            .as_ref()
            .and_then(|p| p.id.as_deref())
            .ok_or(PayloadError::MissingField("recipient.id"))
    }

    pub fn timestamp_ms(&self) -> Result<i64, PayloadError> {
        self.timestamp.ok_or(PayloadError::MissingField("timestamp"))
    }

    /// Only the first present key counts: message > postback > read > referral.
    pub fn event(&self) -> MessagingEvent<'_> {
        if let Some(ref message) = self.message {
            MessagingEvent::Message(message)
        } else if let Some(ref postback) = self.postback {
            MessagingEvent::Postback(postback)
        } else if let Some(ref read) = self.read {
            MessagingEvent::ReadReceipt(read)
        } else if let Some(ref referral) = self.referral {
            MessagingEvent::Referral(referral)
        } else {
            MessagingEvent::Unknown
        }
    }

    /// Names of the unmodeled keys present on this item.
    pub fn other_keys(&self) -> Vec<&str> {
        self.other.keys().map(String::as_str).collect()
    }
}

/// Platform ids are strings, but test tooling often sends bare numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(u64),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        }
    }
}

/// Treat blank event bodies (`null`, `false`, `""`, `[]`, `{}`) as absent.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(value) if !is_blank(&value) => T::deserialize(value).map(Some).map_err(D::Error::custom),
        _ => Ok(None),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        Value::Number(_) => false,
    }
}

fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    RawId::deserialize(deserializer).map(String::from)
}

fn opt_id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<RawId>::deserialize(deserializer)?.map(String::from))
}

//! Event dispatch: one messaging item, at most one processor.

use std::sync::Arc;

use async_trait::async_trait;

use super::events::{MessagingEvent, MessagingItem};
use crate::error::MessengerError;
use crate::types::{DispatchOutcome, EventKind, ServiceMessage};

/// Per-event-type business logic.
///
/// Receives the normalized message and the raw messaging item it came from.
#[async_trait]
pub trait EventProcessor: Send + Sync {
    async fn process(
        &self,
        message: &ServiceMessage,
        item: &MessagingItem,
    ) -> Result<(), MessengerError>;
}

/// One processor per event kind.
#[derive(Clone)]
pub struct EventProcessors {
    pub message: Arc<dyn EventProcessor>,
    pub postback: Arc<dyn EventProcessor>,
    pub read_receipt: Arc<dyn EventProcessor>,
    pub referral: Arc<dyn EventProcessor>,
}

impl EventProcessors {
    /// Use the same processor for every kind.
    pub fn uniform(processor: Arc<dyn EventProcessor>) -> Self {
        Self {
            message: processor.clone(),
            postback: processor.clone(),
            read_receipt: processor.clone(),
            referral: processor,
        }
    }

    pub fn for_kind(&self, kind: EventKind) -> &Arc<dyn EventProcessor> {
        match kind {
            EventKind::Message => &self.message,
            EventKind::Postback => &self.postback,
            EventKind::ReadReceipt => &self.read_receipt,
            EventKind::Referral => &self.referral,
        }
    }
}

/// Processor that only records the event in the trace log.
pub struct LoggingEventProcessor;

#[async_trait]
impl EventProcessor for LoggingEventProcessor {
    async fn process(
        &self,
        message: &ServiceMessage,
        item: &MessagingItem,
    ) -> Result<(), MessengerError> {
        let event = item.event();
        let detail = match event {
            MessagingEvent::Message(body) => body
                .quick_reply
                .as_ref()
                .map(|q| q.payload.clone())
                .or_else(|| body.text.clone()),
            MessagingEvent::Postback(postback) => postback.payload.clone(),
            MessagingEvent::ReadReceipt(read) => read.watermark.map(|w| w.to_string()),
            MessagingEvent::Referral(referral) => referral.reference.clone(),
            MessagingEvent::Unknown => None,
        };
        tracing::info!(
            service = %message.service,
            sender = %message.sender_id,
            page_id = %message.page_info.id,
            event = ?event.kind(),
            detail = detail.as_deref().unwrap_or(""),
            "Messenger event received"
        );
        Ok(())
    }
}

/// Run the processor matching the item's event.
///
/// Items carrying none of the four known keys are logged and reported as
/// [`DispatchOutcome::Unhandled`]; that is not an error.
pub async fn dispatch(
    processors: &EventProcessors,
    message: &ServiceMessage,
    item: &MessagingItem,
) -> Result<DispatchOutcome, MessengerError> {
    let Some(kind) = item.event().kind() else {
        tracing::warn!(
            sender = %message.sender_id,
            page_id = %message.page_info.id,
            keys = ?item.other_keys(),
            "Unhandled Messenger event type"
        );
        return Ok(DispatchOutcome::Unhandled);
    };

    tracing::debug!(event = %kind, sender = %message.sender_id, "dispatching event");
    processors.for_kind(kind).process(message, item).await?;
    Ok(DispatchOutcome::Processed(kind))
}

//! Messenger webhook adapter for Hookline.
//!
//! Receives platform callbacks, answers the subscription handshake and hands
//! every real delivery to a job queue. Queued jobs are later normalized into
//! a [`ServiceMessage`] and dispatched to one of four event processors
//! (message, postback, read receipt, referral).
//!
//! # Building blocks
//! - [`JobEnqueuer`]: capability the coordinator uses to hand off deliveries
//! - [`CredentialStore`]: keyed page access-token lookup
//! - [`InMemoryJobQueue`] + [`JobWorker`]: in-process queue for single-node setups
//! - Facebook Messenger adapter (feature: `facebook`, on by default)

pub mod config;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod manager;
pub mod queue;
pub mod traits;
pub mod types;

pub mod adapters;

// Re-export core types
pub use config::{
    configured, load_config, FacebookConfig, HooklineConfig, LoggingConfig, QueueConfig,
};
pub use credentials::{CredentialResolver, InMemoryCredentialStore};
pub use error::{MessengerError, PayloadError};
pub use logging::{OutcomeCounts, OutcomeLogger};
pub use manager::ServiceRegistry;
pub use queue::{InMemoryJobQueue, JobWorker};
pub use traits::{CredentialStore, JobEnqueuer, JobProcessor, WebhookAdapter};
pub use types::{
    AdapterHealth, DispatchOutcome, EventKind, MessagingService, PageCredential,
    ProcessedMessage, ServiceMessage, WebhookJob, WebhookResponse,
};

#[cfg(feature = "facebook")]
pub use adapters::facebook::coordinator::WebhookCoordinator;
#[cfg(feature = "facebook")]
pub use adapters::facebook::dispatch::{EventProcessor, EventProcessors, LoggingEventProcessor};
#[cfg(feature = "facebook")]
pub use adapters::facebook::handler::FacebookMessageHandler;
#[cfg(feature = "facebook")]
pub use adapters::facebook::FacebookAdapter;

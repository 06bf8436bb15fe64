use thiserror::Error;

/// Why an inbound payload could not be decoded into typed webhook structures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("payload has no entries")]
    MissingEntry,

    #[error("first entry has no messaging items")]
    MissingMessaging,

    #[error("payload is missing required field `{0}`")]
    MissingField(&'static str),
}

#[derive(Debug, Error)]
pub enum MessengerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error("Cannot find access token for {service} page {page_id}")]
    MissingCredential { service: String, page_id: String },

    #[error("timestamp {0}ms is out of range")]
    InvalidTimestamp(i64),

    #[error("credential store error: {0}")]
    Credential(String),

    #[error("enqueue failed: {0}")]
    Enqueue(String),

    #[error("event processor failed: {0}")]
    Processor(String),

    #[error("no processor registered for service '{0}'")]
    UnknownService(String),

    #[error("signature verification failed: {0}")]
    SignatureInvalid(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("adapter not running")]
    NotRunning,

    #[error("adapter already running")]
    AlreadyRunning,

    #[error("internal error: {0}")]
    Internal(String),
}

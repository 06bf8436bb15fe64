//! Webhook coordinator: handshake validation or job hand-off.
//!
//! Runs on the request path, so it never touches the payload beyond looking
//! for the handshake token: deliveries are enqueued untouched and
//! acknowledged at once.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::signature::tokens_match;
use crate::error::MessengerError;
use crate::traits::JobEnqueuer;
use crate::types::{MessagingService, WebhookJob, WebhookResponse};

pub const VERIFY_TOKEN_PARAM: &str = "hub.verify_token";
pub const CHALLENGE_PARAM: &str = "hub.challenge";

pub const VERIFY_TOKEN_MISMATCH: &str = "Verify token did not match environment variable.";

pub struct WebhookCoordinator {
    verify_token: Option<String>,
    enqueuer: Arc<dyn JobEnqueuer>,
}

impl WebhookCoordinator {
    pub fn new(verify_token: Option<String>, enqueuer: Arc<dyn JobEnqueuer>) -> Self {
        Self {
            verify_token,
            enqueuer,
        }
    }

    /// Answer a webhook call.
    ///
    /// Handshakes get `(200, challenge)` or `(401, ...)` with no side effects.
    /// Everything else is enqueued as one job and acknowledged with
    /// `(200, "OK")`; an enqueue failure is returned as the error.
    pub async fn coordinate(
        &self,
        params: Value,
        headers: BTreeMap<String, String>,
    ) -> Result<WebhookResponse, MessengerError> {
        if is_handshake(&params) {
            return Ok(self.respond_to_handshake(&params));
        }

        let job = WebhookJob::new(MessagingService::Facebook, params, headers);
        let job_id = job.id;
        self.enqueuer.enqueue(job).await?;
        tracing::debug!(job_id = %job_id, "Messenger delivery queued");

        Ok(WebhookResponse::ok("OK"))
    }

    fn respond_to_handshake(&self, params: &Value) -> WebhookResponse {
        let provided = param_string(params, VERIFY_TOKEN_PARAM).unwrap_or_default();
        let matches = self
            .verify_token
            .as_deref()
            .is_some_and(|configured| tokens_match(configured, &provided));

        if matches {
            tracing::info!("Messenger webhook handshake accepted");
            WebhookResponse::ok(param_string(params, CHALLENGE_PARAM).unwrap_or_default())
        } else {
            tracing::warn!("Messenger webhook handshake rejected: verify token mismatch");
            WebhookResponse::unauthorized(VERIFY_TOKEN_MISMATCH)
        }
    }
}

/// A request is a handshake when it carries a verify-token parameter.
pub fn is_handshake(params: &Value) -> bool {
    params.get(VERIFY_TOKEN_PARAM).is_some_and(|v| !v.is_null())
}

fn param_string(params: &Value, key: &str) -> Option<String> {
    match params.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Merge query parameters and a request body into one params object.
///
/// A JSON object body contributes its keys; any other JSON value is kept
/// under `_json`, and a non-JSON body under `_raw`. Query parameters win on
/// key collisions.
pub fn merge_params(query: &HashMap<String, String>, body: &[u8]) -> Value {
    let mut params = Map::new();

    if !body.iter().all(u8::is_ascii_whitespace) {
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(fields)) => params.extend(fields),
            Ok(other) => {
                params.insert("_json".to_string(), other);
            }
            Err(_) => {
                params.insert(
                    "_raw".to_string(),
                    Value::String(String::from_utf8_lossy(body).into_owned()),
                );
            }
        }
    }

    for (key, value) in query {
        params.insert(key.clone(), Value::String(value.clone()));
    }

    Value::Object(params)
}

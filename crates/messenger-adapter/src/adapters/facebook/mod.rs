//! Facebook Messenger adapter: inbound webhook receiver.
//!
//! Answers the subscription handshake, acknowledges deliveries immediately
//! and hands them to a [`JobEnqueuer`]. The queued job is later run through
//! [`handler::FacebookMessageHandler`], which normalizes the payload and
//! dispatches it to one of four event processors.

pub mod coordinator;
pub mod dispatch;
pub mod events;
pub mod handler;
pub mod normalizer;
pub mod signature;

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tokio::sync::{watch, RwLock};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::{configured, FacebookConfig};
use crate::error::MessengerError;
use crate::traits::{JobEnqueuer, WebhookAdapter};
use crate::types::{AdapterHealth, MessagingService};

use coordinator::{merge_params, WebhookCoordinator};

pub const WEBHOOK_PATH: &str = "/facebook/webhook";

/// Shared state for Axum webhook handlers.
struct FacebookAdapterState {
    coordinator: WebhookCoordinator,
    app_secret: Option<String>,
    deliveries_accepted: AtomicU64,
    last_delivery_at: RwLock<Option<chrono::DateTime<chrono::Utc>>>,
}

/// Inbound Messenger webhook adapter.
///
/// Starts an Axum HTTP server on the configured address; all slow work is
/// deferred to the injected job queue.
pub struct FacebookAdapter {
    config: FacebookConfig,
    state: Arc<FacebookAdapterState>,
    shutdown_tx: RwLock<Option<watch::Sender<()>>>,
    started_at: RwLock<Option<std::time::Instant>>,
}

impl FacebookAdapter {
    pub fn new(
        config: FacebookConfig,
        enqueuer: Arc<dyn JobEnqueuer>,
    ) -> Result<Self, MessengerError> {
        let verify_token = configured(&config.verify_token)
            .map(str::to_string)
            .ok_or_else(|| {
                MessengerError::Config("Facebook verify_token is required".to_string())
            })?;
        let app_secret = configured(&config.app_secret).map(str::to_string);

        let state = Arc::new(FacebookAdapterState {
            coordinator: WebhookCoordinator::new(Some(verify_token), enqueuer),
            app_secret,
            deliveries_accepted: AtomicU64::new(0),
            last_delivery_at: RwLock::new(None),
        });

        Ok(Self {
            config,
            state,
            shutdown_tx: RwLock::new(None),
            started_at: RwLock::new(None),
        })
    }

    /// The webhook router, without binding a listener.
    pub fn router(&self) -> Router {
        Router::new()
            .route(WEBHOOK_PATH, get(handle_webhook).post(handle_webhook))
            .route("/health", get(health_check))
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
            .with_state(self.state.clone())
    }
}

#[async_trait]
impl WebhookAdapter for FacebookAdapter {
    async fn start(&self) -> Result<(), MessengerError> {
        if self.shutdown_tx.read().await.is_some() {
            return Err(MessengerError::AlreadyRunning);
        }

        let app = self.router();
        let addr = format!("{}:{}", self.config.bind_address, self.config.webhook_port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| MessengerError::Connection(format!("bind failed: {}", e)))?;

        let (shutdown_tx, mut shutdown_rx) = watch::channel(());
        *self.shutdown_tx.write().await = Some(shutdown_tx);
        *self.started_at.write().await = Some(std::time::Instant::now());

        tokio::spawn(async move {
            tracing::info!(addr = %addr, path = WEBHOOK_PATH, "Messenger webhook server listening");
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.changed().await;
                })
                .await
                .unwrap_or_else(|e| tracing::error!("Messenger webhook server error: {}", e));
        });

        Ok(())
    }

    async fn stop(&self) -> Result<(), MessengerError> {
        let tx = self.shutdown_tx.write().await.take();
        match tx {
            Some(tx) => {
                let _ = tx.send(());
                *self.started_at.write().await = None;
                tracing::info!("Messenger adapter stopped");
                Ok(())
            }
            None => Err(MessengerError::NotRunning),
        }
    }

    fn service(&self) -> MessagingService {
        MessagingService::Facebook
    }

    async fn check_health(&self) -> Result<AdapterHealth, MessengerError> {
        let connected = self.shutdown_tx.read().await.is_some();
        let uptime = self
            .started_at
            .read()
            .await
            .map(|s| s.elapsed().as_secs())
            .unwrap_or(0);

        Ok(AdapterHealth {
            connected,
            service: MessagingService::Facebook,
            deliveries_accepted: self.state.deliveries_accepted.load(Ordering::Relaxed),
            last_delivery_at: *self.state.last_delivery_at.read().await,
            uptime_secs: uptime,
        })
    }
}

/// Axum handler for both the GET handshake and POST deliveries.
async fn handle_webhook(
    State(state): State<Arc<FacebookAdapterState>>,
    method: Method,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    // Deliveries are signed; the handshake GET is not.
    if method == Method::POST {
        if let Some(ref secret) = state.app_secret {
            let sig = headers
                .get(signature::SIGNATURE_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");
            if let Err(e) = signature::verify_hub_signature(secret, &body, sig) {
                tracing::warn!("Messenger signature verification failed: {}", e);
                return (StatusCode::UNAUTHORIZED, "invalid signature".to_string());
            }
        }
    }

    let params = merge_params(&query, &body);
    let is_delivery = !coordinator::is_handshake(&params);

    match state
        .coordinator
        .coordinate(params, header_map(&headers))
        .await
    {
        Ok(response) => {
            if is_delivery {
                state.deliveries_accepted.fetch_add(1, Ordering::Relaxed);
                *state.last_delivery_at.write().await = Some(chrono::Utc::now());
            }
            let status =
                StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, response.body)
        }
        Err(e) => {
            tracing::error!("Failed to enqueue Messenger delivery: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "enqueue failed".to_string())
        }
    }
}

/// Flatten request headers into the job's header map.
fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

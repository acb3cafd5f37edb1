//! Health check endpoint

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::store::UserStore;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub bot_username: Option<String>,
    pub uptime_secs: u64,
    pub gateway_ready: bool,
    pub store_ok: bool,
}

/// Shared state for health checks
#[derive(Clone)]
pub struct HealthState {
    pub start_time: SystemTime,
    pub bot_username: Arc<RwLock<Option<String>>>,
    gateway_ready: Arc<AtomicBool>,
    store: Arc<dyn UserStore>,
}

impl HealthState {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self {
            start_time: SystemTime::now(),
            bot_username: Arc::new(RwLock::new(None)),
            gateway_ready: Arc::new(AtomicBool::new(false)),
            store,
        }
    }

    /// Record a completed gateway handshake.
    pub async fn set_ready(&self, username: String) {
        *self.bot_username.write().await = Some(username);
        self.gateway_ready.store(true, Ordering::Release);
    }

    pub fn set_disconnected(&self) {
        self.gateway_ready.store(false, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.gateway_ready.load(Ordering::Acquire)
    }
}

async fn health_handler(State(state): State<HealthState>) -> (StatusCode, Json<HealthStatus>) {
    let uptime = state.start_time.elapsed().unwrap_or_default().as_secs();
    let bot_username = state.bot_username.read().await.clone();
    let gateway_ready = state.is_ready();
    let store_ok = match state.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "store ping failed");
            false
        }
    };

    let healthy = gateway_ready && store_ok;
    let code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(HealthStatus {
            status: if healthy { "ok" } else { "unavailable" }.to_string(),
            bot_username,
            uptime_secs: uptime,
            gateway_ready,
            store_ok,
        }),
    )
}

async fn live_handler() -> StatusCode {
    StatusCode::OK
}

/// Create the health check router
pub fn create_health_router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/live", get(live_handler))
        .with_state(state)
}

/// Start the health check server
pub async fn start_health_server(
    state: HealthState,
    port: u16,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let app = create_health_router(state);
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Health check server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}

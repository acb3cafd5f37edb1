//! HTTP operation endpoint.
//!
//! Callers `POST /` a `{"op": ..., "data": ...}` envelope. Success is an empty
//! 200; any failure is a 400 carrying the error text.

use std::sync::Arc;

use axum::{Router, body::Bytes, extract::State, http::StatusCode, routing::post};
use rolebridge_types::{Operation, Request, SendMessagePayload, SyncUserPayload};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::errors::GuildError;
use crate::reconcile::{Reconciler, SyncError, SyncOutcome};
use crate::relay::Relay;

#[derive(Clone)]
pub struct ApiState {
    pub reconciler: Arc<Reconciler>,
    pub relay: Relay,
}

#[derive(Debug, Error)]
enum OpError {
    #[error("invalid request: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("message is empty")]
    EmptyMessage,
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Send(#[from] GuildError),
}

/// Build the operation router.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", post(handle_operation))
        .with_state(state)
}

/// Serve the operation router on `addr` until `shutdown` is cancelled.
pub async fn serve(addr: &str, state: ApiState, shutdown: CancellationToken) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "Operation endpoint listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    info!("Operation endpoint stopped");
    Ok(())
}

#[instrument(name = "api.operation", skip_all, fields(op = tracing::field::Empty))]
async fn handle_operation(State(state): State<ApiState>, body: Bytes) -> (StatusCode, String) {
    let request: Request = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            debug!(error = %e, "rejecting malformed request");
            return (StatusCode::BAD_REQUEST, e.to_string());
        }
    };

    tracing::Span::current().record("op", request.op.as_str());
    info!("executing operation");

    match execute(&state, &request).await {
        Ok(()) => (StatusCode::OK, String::new()),
        Err(e) => {
            warn!(error = %e, "operation failed");
            (StatusCode::BAD_REQUEST, e.to_string())
        }
    }
}

async fn execute(state: &ApiState, request: &Request) -> Result<(), OpError> {
    match &request.op {
        Operation::SyncUser => {
            let payload: SyncUserPayload = request.payload()?;
            let outcome = state
                .reconciler
                .sync_user(&payload.user_id, payload.revoke)
                .await?;
            if let SyncOutcome::Updated { added, removed, .. } = &outcome {
                debug!(user_id = %payload.user_id, ?added, ?removed, "sync applied");
            }
            Ok(())
        }
        Operation::SendMessage => {
            let payload: SendMessagePayload = request.payload()?;
            if payload.message.is_empty() {
                return Err(OpError::EmptyMessage);
            }
            state.relay.send(&payload).await?;
            Ok(())
        }
        Operation::Unknown(op) => {
            debug!(op = %op, "ignoring unknown operation");
            Ok(())
        }
    }
}

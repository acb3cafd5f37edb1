//! Client for the rolebridge operation endpoint.
//!
//! ```rust,ignore
//! let client = RoleBridgeClient::new("http://rolebridge:3000");
//! client.sync_user("user-1").await?;
//! ```

use reqwest::Client;
use rolebridge_types::{OutboundMessage, Request};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
    /// The service answered with a non-success status; `body` is its error text.
    #[error("rolebridge returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Operation endpoint client
#[derive(Debug, Clone)]
pub struct RoleBridgeClient {
    client: Client,
    addr: String,
}

impl RoleBridgeClient {
    /// `addr` is the service base URL, e.g. `http://localhost:3000`.
    pub fn new(addr: impl Into<String>) -> Self {
        Self::with_client(Client::new(), addr)
    }

    pub fn with_client(client: Client, addr: impl Into<String>) -> Self {
        let addr = addr.into().trim_end_matches('/').to_string();
        Self { client, addr }
    }

    /// Bring the user's guild roles in line with their application roles.
    pub async fn sync_user(&self, user_id: &str) -> Result<(), ClientError> {
        self.execute(&Request::sync_user(user_id)).await
    }

    /// Remove every synchronized role from the user's guild member.
    pub async fn revoke_user(&self, user_id: &str) -> Result<(), ClientError> {
        self.execute(&Request::revoke_user(user_id)).await
    }

    /// Post `message` to the channel configured under `channel`.
    pub async fn send_message(
        &self,
        channel: &str,
        message: OutboundMessage,
        webhook: bool,
    ) -> Result<(), ClientError> {
        self.execute(&Request::send_message(channel, message, webhook)?)
            .await
    }

    /// Send an arbitrary operation envelope.
    pub async fn execute(&self, request: &Request) -> Result<(), ClientError> {
        debug!(op = %request.op, "sending operation");
        let response = self
            .client
            .post(format!("{}/", self.addr))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(ClientError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

//! Message relay for the `SEND_MESSAGE` operation.

use std::collections::HashMap;
use std::sync::Arc;

use rolebridge_types::SendMessagePayload;
use tracing::{debug, info, instrument};

use crate::errors::{GuildError, log_error};
use crate::guild::MessageRelay;

/// Posts messages to channels addressed by their configured name
#[derive(Clone)]
pub struct Relay {
    sender: Arc<dyn MessageRelay>,
    channels: HashMap<String, u64>,
}

impl Relay {
    pub fn new(sender: Arc<dyn MessageRelay>, channels: HashMap<String, u64>) -> Self {
        Self { sender, channels }
    }

    /// Send `payload`. Returns the new message id, or `None` when the channel
    /// name is not configured.
    #[instrument(skip(self, payload), fields(channel = %payload.channel, webhook = payload.webhook))]
    pub async fn send(&self, payload: &SendMessagePayload) -> Result<Option<u64>, GuildError> {
        let Some(&channel_id) = self.channels.get(&payload.channel) else {
            debug!("channel not configured, dropping message");
            return Ok(None);
        };

        let result = if payload.webhook {
            match self
                .sender
                .send_webhook_message(channel_id, &payload.message)
                .await
            {
                Ok(Some(id)) => Ok(id),
                Ok(None) => {
                    debug!(channel_id, "channel has no webhook, sending as bot");
                    self.sender.send_message(channel_id, &payload.message).await
                }
                Err(e) => Err(e),
            }
        } else {
            self.sender.send_message(channel_id, &payload.message).await
        };

        match result {
            Ok(message_id) => {
                info!(channel_id, message_id, "message sent");
                Ok(Some(message_id))
            }
            Err(e) => {
                log_error("failed to send message", &e);
                Err(e)
            }
        }
    }
}

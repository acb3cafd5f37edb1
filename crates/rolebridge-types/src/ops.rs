//! Operation envelope accepted by the rolebridge HTTP endpoint.
//!
//! Callers POST `{"op": "<NAME>", "data": {...}}`. The `data` object is kept as
//! raw JSON until the operation is known, then decoded into the matching
//! payload type.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::message::OutboundMessage;

pub const OP_SYNC_USER: &str = "SYNC_USER";
pub const OP_SEND_MESSAGE: &str = "SEND_MESSAGE";

/// Operation name carried in the `op` field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operation {
    SyncUser,
    SendMessage,
    /// Any op the service does not recognise. Accepted and ignored.
    Unknown(String),
}

impl Operation {
    pub fn as_str(&self) -> &str {
        match self {
            Self::SyncUser => OP_SYNC_USER,
            Self::SendMessage => OP_SEND_MESSAGE,
            Self::Unknown(name) => name,
        }
    }
}

impl From<String> for Operation {
    fn from(name: String) -> Self {
        match name.as_str() {
            OP_SYNC_USER => Self::SyncUser,
            OP_SEND_MESSAGE => Self::SendMessage,
            _ => Self::Unknown(name),
        }
    }
}

impl From<Operation> for String {
    fn from(op: Operation) -> Self {
        op.as_str().to_string()
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub op: Operation,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Request {
    pub fn new<T: Serialize>(op: Operation, data: &T) -> serde_json::Result<Self> {
        Ok(Self {
            op,
            data: serde_json::to_value(data)?,
        })
    }

    /// Reconcile the user's guild roles with their application roles.
    pub fn sync_user(user_id: impl Into<String>) -> Self {
        Self::sync(user_id.into(), false)
    }

    /// Remove every role the service manages from the user's guild member.
    pub fn revoke_user(user_id: impl Into<String>) -> Self {
        Self::sync(user_id.into(), true)
    }

    pub fn send_message(
        channel: impl Into<String>,
        message: OutboundMessage,
        webhook: bool,
    ) -> serde_json::Result<Self> {
        Self::new(
            Operation::SendMessage,
            &SendMessagePayload {
                channel: channel.into(),
                message,
                webhook,
            },
        )
    }

    fn sync(user_id: String, revoke: bool) -> Self {
        Self {
            op: Operation::SyncUser,
            data: serde_json::json!({ "user_id": user_id, "revoke": revoke }),
        }
    }

    /// Decode `data` as the payload of this operation.
    pub fn payload<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(&self.data)
    }
}

/// Payload of `SYNC_USER`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncUserPayload {
    pub user_id: String,
    /// Treat the user's application roles as empty for this call only.
    #[serde(default)]
    pub revoke: bool,
}

/// Payload of `SEND_MESSAGE`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendMessagePayload {
    /// Logical channel name, resolved through the service's channel map.
    pub channel: String,
    pub message: OutboundMessage,
    /// Post through the channel's webhook instead of as the bot.
    #[serde(default)]
    pub webhook: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_operations_parse() {
        let req: Request =
            serde_json::from_str(r#"{"op":"SYNC_USER","data":{"user_id":"abc"}}"#).unwrap();
        assert_eq!(req.op, Operation::SyncUser);

        let req: Request = serde_json::from_str(r#"{"op":"SEND_MESSAGE","data":{}}"#).unwrap();
        assert_eq!(req.op, Operation::SendMessage);
    }

    #[test]
    fn test_unknown_operation_is_preserved() {
        let req: Request = serde_json::from_str(r#"{"op":"PING"}"#).unwrap();
        assert_eq!(req.op, Operation::Unknown("PING".to_string()));
        assert!(req.data.is_null());
        assert_eq!(req.op.to_string(), "PING");
    }

    #[test]
    fn test_sync_user_payload_revoke_defaults_false() {
        let req: Request =
            serde_json::from_str(r#"{"op":"SYNC_USER","data":{"user_id":"abc"}}"#).unwrap();
        let payload: SyncUserPayload = req.payload().unwrap();
        assert_eq!(payload.user_id, "abc");
        assert!(!payload.revoke);
    }

    #[test]
    fn test_revoke_user_sets_flag() {
        let req = Request::revoke_user("abc");
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["op"], "SYNC_USER");
        assert_eq!(json["data"]["user_id"], "abc");
        assert_eq!(json["data"]["revoke"], true);
    }

    #[test]
    fn test_send_message_envelope() {
        let req = Request::send_message("mod_logs", OutboundMessage::text("hi"), true).unwrap();
        assert_eq!(req.op, Operation::SendMessage);
        let payload: SendMessagePayload = req.payload().unwrap();
        assert_eq!(payload.channel, "mod_logs");
        assert_eq!(payload.message.content, "hi");
        assert!(payload.webhook);
    }

    #[test]
    fn test_payload_mismatch_is_error() {
        let req: Request = serde_json::from_str(r#"{"op":"SYNC_USER","data":{"id":1}}"#).unwrap();
        assert!(req.payload::<SyncUserPayload>().is_err());
    }
}

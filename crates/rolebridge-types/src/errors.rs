//! Guild API error classification.
//!
//! The reconciler and the message relay both talk to the guild API; the codes
//! below decide how loudly a failure is logged and whether it points at a
//! broken deployment (permissions, token) or a passing condition.

use serde::{Deserialize, Serialize};

/// High-level category of a guild API error.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Rate limit hit: must wait before retrying.
    RateLimit,
    /// Target resource (guild, member, role, channel …) not found.
    NotFound,
    /// Insufficient bot permissions or role hierarchy for the action.
    PermissionDenied,
    /// Malformed or semantically invalid input.
    InvalidInput,
    /// Network or I/O error (transient).
    Network,
    /// Unknown or uncategorised error.
    Unknown,
}

/// Guild API error code (subset relevant to role and message operations).
///
/// Maps the actionable Discord JSON error codes
/// (<https://discord.com/developers/docs/topics/opcodes-and-status-codes#json>)
/// to named variants; everything else falls through to [`GuildErrorCode::Unknown`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GuildErrorCode {
    // ── Not found ─────────────────────────────────────────────────────────────
    /// 10003: Unknown channel.
    UnknownChannel,
    /// 10004: Unknown guild.
    UnknownGuild,
    /// 10007: Unknown member.
    UnknownMember,
    /// 10011: Unknown role.
    UnknownRole,
    /// 10013: Unknown user.
    UnknownUser,
    /// 10015: Unknown webhook.
    UnknownWebhook,

    // ── Permission errors ──────────────────────────────────────────────────────
    /// 50001: Missing access.
    MissingAccess,
    /// 50013: Missing permissions (includes editing a role above the bot).
    MissingPermissions,

    // ── Rate limiting ──────────────────────────────────────────────────────────
    /// HTTP 429: Global or per-route rate limit.
    RateLimited,

    // ── Input errors ───────────────────────────────────────────────────────────
    /// 50006: Cannot send an empty message.
    CannotSendEmptyMessage,
    /// 50035: Invalid form body (validation failed).
    InvalidFormBody,

    // ── Auth ───────────────────────────────────────────────────────────────────
    /// 40001 / 50014: Invalid or expired token.
    InvalidToken,

    // ── Server errors ──────────────────────────────────────────────────────────
    /// 130000: API resource overloaded.
    ApiOverloaded,

    // ── Client errors ─────────────────────────────────────────────────────────
    /// Network or I/O error on the client side.
    NetworkError,

    /// Any code not listed above.
    Unknown,
}

impl GuildErrorCode {
    /// Derive the code from a raw JSON error code integer.
    pub fn from_raw(code: u32) -> Self {
        match code {
            10003 => Self::UnknownChannel,
            10004 => Self::UnknownGuild,
            10007 => Self::UnknownMember,
            10011 => Self::UnknownRole,
            10013 => Self::UnknownUser,
            10015 => Self::UnknownWebhook,
            40001 | 50014 => Self::InvalidToken,
            50001 => Self::MissingAccess,
            50006 => Self::CannotSendEmptyMessage,
            50013 => Self::MissingPermissions,
            50035 => Self::InvalidFormBody,
            130000 => Self::ApiOverloaded,
            _ => Self::Unknown,
        }
    }

    /// Derive the code from an HTTP status when the body carried no JSON code.
    pub fn from_status(status: u16) -> Self {
        match status {
            429 => Self::RateLimited,
            401 => Self::InvalidToken,
            403 => Self::MissingPermissions,
            _ => Self::Unknown,
        }
    }

    /// The high-level category for this code.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnknownChannel
            | Self::UnknownGuild
            | Self::UnknownMember
            | Self::UnknownRole
            | Self::UnknownUser
            | Self::UnknownWebhook => ErrorCategory::NotFound,

            Self::MissingAccess | Self::MissingPermissions => ErrorCategory::PermissionDenied,

            Self::RateLimited => ErrorCategory::RateLimit,

            Self::CannotSendEmptyMessage | Self::InvalidFormBody => ErrorCategory::InvalidInput,

            Self::NetworkError => ErrorCategory::Network,

            Self::InvalidToken | Self::ApiOverloaded | Self::Unknown => ErrorCategory::Unknown,
        }
    }

    /// True if re-triggering the same call cannot succeed without an outside change.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::UnknownChannel
                | Self::UnknownGuild
                | Self::UnknownMember
                | Self::UnknownRole
                | Self::UnknownUser
                | Self::UnknownWebhook
                | Self::MissingAccess
                | Self::MissingPermissions
                | Self::InvalidToken
        )
    }

    /// True if the same call is likely to succeed when triggered again later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::NetworkError | Self::ApiOverloaded
        )
    }

    /// True for codes that indicate the deployment itself is misconfigured.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnknownGuild | Self::MissingAccess | Self::MissingPermissions | Self::InvalidToken
        )
    }
}

//! Guild API error handling.
//!
//! Converts serenity errors into a structured [`GuildError`] carrying a
//! classified [`GuildErrorCode`], and provides [`log_error`] which logs at the
//! level matching the classification: misconfiguration is an error, passing
//! conditions (rate limits, network blips) are warnings.

use rolebridge_types::{ErrorCategory, GuildErrorCode};
use serenity::http::HttpError;
use thiserror::Error;
use tracing::{error, warn};

/// A failed guild API call
#[derive(Debug, Clone, Error)]
pub enum GuildError {
    /// The API answered with an error status.
    #[error("guild API error {code:?} (HTTP {http_status} / code {raw_code}): {message}")]
    Api {
        code: GuildErrorCode,
        http_status: u16,
        raw_code: u32,
        message: String,
    },
    /// The request never produced an API answer.
    #[error("guild request failed: {0}")]
    Network(String),
}

impl GuildError {
    pub fn api(code: GuildErrorCode, http_status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            code,
            http_status,
            raw_code: 0,
            message: message.into(),
        }
    }

    pub fn code(&self) -> GuildErrorCode {
        match self {
            Self::Api { code, .. } => *code,
            Self::Network(_) => GuildErrorCode::NetworkError,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        self.code().category()
    }

    /// True when the user is not (or no longer) a member of the guild.
    ///
    /// Only the member and user codes qualify: an unknown guild is a
    /// misconfiguration, not an absent member.
    pub fn is_unknown_member(&self) -> bool {
        matches!(
            self.code(),
            GuildErrorCode::UnknownMember | GuildErrorCode::UnknownUser
        )
    }
}

impl From<serenity::Error> for GuildError {
    fn from(err: serenity::Error) -> Self {
        match err {
            serenity::Error::Http(http_err) => from_http(&http_err),
            other => Self::Network(other.to_string()),
        }
    }
}

fn from_http(http_err: &HttpError) -> GuildError {
    match http_err {
        HttpError::UnsuccessfulRequest(resp) => {
            let status = resp.status_code.as_u16();
            let raw_code = resp.error.code as u32;
            let code = match GuildErrorCode::from_raw(raw_code) {
                GuildErrorCode::Unknown => GuildErrorCode::from_status(status),
                known => known,
            };
            GuildError::Api {
                code,
                http_status: status,
                raw_code,
                message: resp.error.message.clone(),
            }
        }
        // Network / request-level failures (not API errors)
        other => GuildError::Network(other.to_string()),
    }
}

/// Log a guild error at the appropriate level.
///
/// - Configuration problems (missing permissions, bad token, unknown guild) → `error!`
/// - Everything else → `warn!`, noting whether a later trigger can succeed
pub fn log_error(context: &str, err: &GuildError) {
    let code = err.code();
    if code.is_configuration() {
        error!(error_code = ?code, "{}: {}", context, err);
    } else if code.is_retryable() {
        warn!(error_code = ?code, "{} (may succeed on next trigger): {}", context, err);
    } else if code.is_permanent() {
        warn!(error_code = ?code, "{} (will not succeed on retry): {}", context, err);
    } else {
        warn!(error_code = ?code, "{}: {}", context, err);
    }
}

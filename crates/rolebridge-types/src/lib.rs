//! Shared types for the rolebridge guild role sync service and its callers

pub mod errors;
pub mod message;
pub mod model;
pub mod ops;

pub use errors::{ErrorCategory, GuildErrorCode};
pub use message::{Embed, EmbedAuthor, EmbedField, EmbedFooter, OutboundMessage};
pub use model::{AppRole, AppUser, BotIdentity, GuildMember, GuildRole, PlatformUserId, RoleId};
pub use ops::{Operation, Request, SendMessagePayload, SyncUserPayload};

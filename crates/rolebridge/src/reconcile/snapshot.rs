//! Guild state read for one reconciliation.

use rolebridge_types::{BotIdentity, GuildMember, GuildRole, PlatformUserId};
use thiserror::Error;

use crate::errors::GuildError;
use crate::guild::GuildClient;

/// Guild state needed to reconcile one member
#[derive(Debug, Clone)]
pub struct GuildSnapshot {
    pub roles: Vec<GuildRole>,
    pub bot: GuildMember,
    pub member: GuildMember,
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("user {0} is not a member of the guild")]
    NotAMember(PlatformUserId),
    #[error("bot user {0} is not a member of the guild")]
    BotNotInGuild(PlatformUserId),
    #[error(transparent)]
    Guild(#[from] GuildError),
}

/// Read the target member, the bot's own member record and the role
/// catalogue, in that order. Stops at the first missing member.
pub async fn fetch(
    guild: &dyn GuildClient,
    guild_id: u64,
    bot: BotIdentity,
    target: PlatformUserId,
) -> Result<GuildSnapshot, SnapshotError> {
    let member = guild
        .member(guild_id, target)
        .await?
        .ok_or(SnapshotError::NotAMember(target))?;

    let bot_member = guild
        .member(guild_id, bot.user_id)
        .await?
        .ok_or(SnapshotError::BotNotInGuild(bot.user_id))?;

    let roles = guild.roles(guild_id).await?;

    Ok(GuildSnapshot {
        roles,
        bot: bot_member,
        member,
    })
}

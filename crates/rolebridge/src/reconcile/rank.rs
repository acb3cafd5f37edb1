use rolebridge_types::{GuildMember, GuildRole};

/// Highest position among the roles `bot` holds, or 0 when it holds none.
///
/// Managed roles count: an integration role held by the bot raises its rank
/// like any other.
pub fn bot_rank(bot: &GuildMember, guild_roles: &[GuildRole]) -> i64 {
    guild_roles
        .iter()
        .filter(|role| bot.has_role(role.id))
        .map(|role| role.position)
        .max()
        .unwrap_or(0)
}

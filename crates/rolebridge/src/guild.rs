//! Guild API access.
//!
//! The reconciler and the relay only see the [`GuildClient`] and
//! [`MessageRelay`] traits. [`SerenityGuild`] implements both over serenity's
//! HTTP client; tests use the in-memory doubles in `crate::mock`.

#[path = "guild_tests.rs"]
mod guild_tests;

use std::sync::Arc;

use async_trait::async_trait;
use rolebridge_types::{
    BotIdentity, Embed, GuildMember, GuildRole, OutboundMessage, PlatformUserId, RoleId,
};
use serenity::builder::{
    CreateEmbed, CreateEmbedAuthor, CreateEmbedFooter, CreateMessage, EditMember, ExecuteWebhook,
};
use serenity::http::Http;
use serenity::model::Timestamp;
use serenity::model::guild::{Member, Role};
use serenity::model::id::{ChannelId, GuildId, UserId};
use tracing::debug;

use crate::errors::GuildError;

/// Read and write access to guild members and roles.
#[async_trait]
pub trait GuildClient: Send + Sync {
    /// The account the service is logged in as.
    async fn current_user(&self) -> Result<BotIdentity, GuildError>;

    /// A member record, or `None` when the user is not in the guild.
    async fn member(
        &self,
        guild_id: u64,
        user_id: PlatformUserId,
    ) -> Result<Option<GuildMember>, GuildError>;

    /// The guild's full role catalogue.
    async fn roles(&self, guild_id: u64) -> Result<Vec<GuildRole>, GuildError>;

    /// Replace the member's role list with `roles` in one call.
    async fn replace_member_roles(
        &self,
        guild_id: u64,
        user_id: PlatformUserId,
        roles: &[RoleId],
    ) -> Result<(), GuildError>;

    /// Grant a single role, leaving the member's other roles alone.
    async fn add_member_role(
        &self,
        guild_id: u64,
        user_id: PlatformUserId,
        role_id: RoleId,
    ) -> Result<(), GuildError>;
}

/// Posting messages into guild channels.
#[async_trait]
pub trait MessageRelay: Send + Sync {
    /// Send as the bot. Returns the new message id.
    async fn send_message(
        &self,
        channel_id: u64,
        message: &OutboundMessage,
    ) -> Result<u64, GuildError>;

    /// Send through the channel's first webhook, using the bot's name and
    /// avatar. `Ok(None)` when the channel has no usable webhook.
    async fn send_webhook_message(
        &self,
        channel_id: u64,
        message: &OutboundMessage,
    ) -> Result<Option<u64>, GuildError>;
}

/// serenity-backed guild client
#[derive(Clone)]
pub struct SerenityGuild {
    http: Arc<Http>,
}

impl SerenityGuild {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl GuildClient for SerenityGuild {
    async fn current_user(&self) -> Result<BotIdentity, GuildError> {
        let user = self.http.get_current_user().await?;
        Ok(BotIdentity {
            user_id: user.id.get(),
        })
    }

    async fn member(
        &self,
        guild_id: u64,
        user_id: PlatformUserId,
    ) -> Result<Option<GuildMember>, GuildError> {
        match self
            .http
            .get_member(GuildId::new(guild_id), UserId::new(user_id))
            .await
        {
            Ok(member) => Ok(Some(convert_member(&member))),
            Err(e) => {
                let err = GuildError::from(e);
                if err.is_unknown_member() {
                    debug!(guild_id, user_id, "user is not a member of the guild");
                    Ok(None)
                } else {
                    Err(err)
                }
            }
        }
    }

    async fn roles(&self, guild_id: u64) -> Result<Vec<GuildRole>, GuildError> {
        let roles = self.http.get_guild_roles(GuildId::new(guild_id)).await?;
        Ok(roles.iter().map(convert_role).collect())
    }

    async fn replace_member_roles(
        &self,
        guild_id: u64,
        user_id: PlatformUserId,
        roles: &[RoleId],
    ) -> Result<(), GuildError> {
        let builder = EditMember::new()
            .roles(roles.iter().map(|id| serenity::model::id::RoleId::new(*id)));
        GuildId::new(guild_id)
            .edit_member(&*self.http, UserId::new(user_id), builder)
            .await?;
        Ok(())
    }

    async fn add_member_role(
        &self,
        guild_id: u64,
        user_id: PlatformUserId,
        role_id: RoleId,
    ) -> Result<(), GuildError> {
        self.http
            .add_member_role(
                GuildId::new(guild_id),
                UserId::new(user_id),
                serenity::model::id::RoleId::new(role_id),
                Some("default role"),
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl MessageRelay for SerenityGuild {
    async fn send_message(
        &self,
        channel_id: u64,
        message: &OutboundMessage,
    ) -> Result<u64, GuildError> {
        let builder = CreateMessage::new()
            .content(&message.content)
            .tts(message.tts)
            .embeds(message.embeds.iter().map(convert_embed).collect());

        let sent = ChannelId::new(channel_id)
            .send_message(&*self.http, builder)
            .await?;
        Ok(sent.id.get())
    }

    async fn send_webhook_message(
        &self,
        channel_id: u64,
        message: &OutboundMessage,
    ) -> Result<Option<u64>, GuildError> {
        let hooks = ChannelId::new(channel_id).webhooks(&*self.http).await?;
        let Some(hook) = hooks.into_iter().find(|h| h.token.is_some()) else {
            return Ok(None);
        };

        let me = self.http.get_current_user().await?;
        let mut builder = ExecuteWebhook::new()
            .content(&message.content)
            .tts(message.tts)
            .username(me.name.clone())
            .embeds(message.embeds.iter().map(convert_embed).collect());
        if let Some(avatar) = me.avatar_url() {
            builder = builder.avatar_url(avatar);
        }

        let sent = hook.execute(&*self.http, true, builder).await?;
        Ok(sent.map(|m| m.id.get()))
    }
}

// ── Conversion helpers ─────────────────────────────────────────────────────

pub(crate) fn convert_member(member: &Member) -> GuildMember {
    GuildMember {
        user_id: member.user.id.get(),
        roles: member.roles.iter().map(|r| r.get()).collect(),
    }
}

pub(crate) fn convert_role(role: &Role) -> GuildRole {
    GuildRole {
        id: role.id.get(),
        name: role.name.clone(),
        position: i64::from(role.position),
        managed: role.managed,
    }
}

pub(crate) fn convert_embed(embed: &Embed) -> CreateEmbed {
    let mut builder = CreateEmbed::new();
    if let Some(title) = &embed.title {
        builder = builder.title(title);
    }
    if let Some(description) = &embed.description {
        builder = builder.description(description);
    }
    if let Some(url) = &embed.url {
        builder = builder.url(url);
    }
    if let Some(color) = embed.color {
        builder = builder.colour(color);
    }
    for field in &embed.fields {
        builder = builder.field(&field.name, &field.value, field.inline);
    }
    if let Some(author) = &embed.author {
        let mut a = CreateEmbedAuthor::new(&author.name);
        if let Some(url) = &author.url {
            a = a.url(url);
        }
        if let Some(icon) = &author.icon_url {
            a = a.icon_url(icon);
        }
        builder = builder.author(a);
    }
    if let Some(footer) = &embed.footer {
        let mut f = CreateEmbedFooter::new(&footer.text);
        if let Some(icon) = &footer.icon_url {
            f = f.icon_url(icon);
        }
        builder = builder.footer(f);
    }
    if let Some(ts) = embed.timestamp.as_deref().and_then(|t| Timestamp::parse(t).ok()) {
        builder = builder.timestamp(ts);
    }
    builder
}

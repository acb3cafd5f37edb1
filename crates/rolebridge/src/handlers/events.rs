//! Gateway event reactions, independent of serenity's event types.

use std::sync::Arc;

use rolebridge_types::{
    AppRole, AppUser, Embed, EmbedAuthor, EmbedField, OutboundMessage, PlatformUserId, RoleId,
};
use serenity::prelude::TypeMapKey;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::DiscordBotConfig;
use crate::errors::log_error;
use crate::guild::{GuildClient, MessageRelay};
use crate::health::HealthState;
use crate::reconcile::{Reconciler, SyncOutcome};
use crate::store::{RoleFilter, StoreError, UserStore};

use super::cache::{MessageCache, MessageRecord};

/// Embed colour of mod-log entries.
pub const MOD_LOG_COLOR: u32 = 0xFF0000;

/// Channel name the deleted-message log goes to.
pub const MOD_LOGS_CHANNEL: &str = "mod_logs";

/// Name of the user context-menu command that shows a member's app account.
pub const USER_INFO_COMMAND: &str = "User Info";

#[derive(Debug, Error)]
pub enum UserInfoError {
    #[error("<@{0}> has no linked application account")]
    NotLinked(PlatformUserId),
    #[error("failed to look up user: {0}")]
    Store(#[from] StoreError),
}

/// A message seen on the gateway
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedMessage {
    pub id: u64,
    pub guild_id: Option<u64>,
    pub author_is_bot: bool,
    /// The author's guild roles; `None` outside a guild.
    pub member_roles: Option<Vec<RoleId>>,
    pub record: MessageRecord,
}

/// Mod-log embed for a deleted message.
pub fn mod_log_embed(msg: &MessageRecord) -> Embed {
    let mut fields = Vec::new();
    if !msg.content.is_empty() {
        fields.push(EmbedField {
            name: "Content".to_string(),
            value: msg.content.clone(),
            inline: false,
        });
    }
    if !msg.attachments.is_empty() {
        fields.push(EmbedField {
            name: "Attachments".to_string(),
            value: msg.attachments.join("\n"),
            inline: false,
        });
    }

    Embed {
        author: Some(EmbedAuthor {
            name: msg.author_name.clone(),
            url: None,
            icon_url: msg.author_avatar.clone(),
        }),
        description: Some(format!(
            "❌ **Message by <@{}> deleted in <#{}>**\n",
            msg.author_id, msg.channel_id
        )),
        color: Some(MOD_LOG_COLOR),
        timestamp: msg.timestamp.clone(),
        fields,
        ..Default::default()
    }
}

/// Embed describing an application user: the linked account and the names of
/// the roles assigned to them. Role ids missing from `roles` are shown as-is.
pub fn user_info_embed(user: &AppUser, roles: &[AppRole]) -> Embed {
    let mut fields = Vec::new();
    if let Some(platform_id) = user.platform_id {
        fields.push(EmbedField {
            name: "discord".to_string(),
            value: format!("<@{}>", platform_id),
            inline: true,
        });
    }

    let names: Vec<&str> = user
        .role_ids
        .iter()
        .map(|id| {
            roles
                .iter()
                .find(|role| &role.id == id)
                .map_or(id.as_str(), |role| role.name.as_str())
        })
        .collect();
    fields.push(EmbedField {
        name: "Roles".to_string(),
        value: if names.is_empty() {
            "None".to_string()
        } else {
            names.join("\n")
        },
        inline: false,
    });

    Embed {
        title: Some(user.id.clone()),
        fields,
        ..Default::default()
    }
}

/// Reactions to guild events. Failures are logged, never returned; there is
/// no caller to report them to.
pub struct GuildEvents {
    guild_id: u64,
    default_role_id: Option<RoleId>,
    sync_on_message: bool,
    mod_logs: Option<u64>,
    reconciler: Arc<Reconciler>,
    store: Arc<dyn UserStore>,
    guild: Arc<dyn GuildClient>,
    messages: Arc<dyn MessageRelay>,
    health: HealthState,
    recent: MessageCache,
}

impl TypeMapKey for GuildEvents {
    type Value = Arc<GuildEvents>;
}

impl GuildEvents {
    pub fn new(
        config: &DiscordBotConfig,
        reconciler: Arc<Reconciler>,
        store: Arc<dyn UserStore>,
        guild: Arc<dyn GuildClient>,
        messages: Arc<dyn MessageRelay>,
        health: HealthState,
    ) -> Self {
        Self {
            guild_id: config.guild_id,
            // The @everyone role shares the guild's id and cannot be granted.
            default_role_id: config.default_role_id.filter(|id| *id != config.guild_id),
            sync_on_message: config.sync_on_message,
            mod_logs: config.channel(MOD_LOGS_CHANNEL),
            reconciler,
            store,
            guild,
            messages,
            health,
            recent: MessageCache::default(),
        }
    }

    pub fn guild_id(&self) -> u64 {
        self.guild_id
    }

    pub fn is_our_guild(&self, guild_id: Option<u64>) -> bool {
        guild_id == Some(self.guild_id)
    }

    pub async fn on_ready(&self, username: String) {
        self.health.set_ready(username).await;
    }

    pub fn on_disconnect(&self) {
        self.health.set_disconnected();
    }

    /// A member joined: grant the default role, then sync linked roles.
    pub async fn on_member_join(&self, guild_id: u64, user_id: PlatformUserId) {
        if !self.is_our_guild(Some(guild_id)) {
            return;
        }
        info!(user_id, "member joined");
        self.grant_default_role(user_id, &[]).await;
        self.sync(user_id).await;
    }

    /// A message was posted. Guild messages are remembered for the mod log;
    /// human authors get the default role and, if enabled, a role sync.
    pub async fn on_message(&self, msg: ObservedMessage) {
        if !self.is_our_guild(msg.guild_id) {
            return;
        }
        let Some(roles) = msg.member_roles else {
            return;
        };
        let author_id = msg.record.author_id;
        if self.mod_logs.is_some() {
            self.recent.insert(msg.id, msg.record);
        }

        if msg.author_is_bot {
            return;
        }
        self.grant_default_role(author_id, &roles).await;
        if self.sync_on_message {
            self.sync(author_id).await;
        }
    }

    /// A message was deleted: post what we remember of it to the mod log.
    pub async fn on_message_deleted(&self, guild_id: Option<u64>, message_id: u64) {
        if !self.is_our_guild(guild_id) {
            return;
        }
        let cached = self.recent.take(message_id);
        let Some(channel_id) = self.mod_logs else {
            return;
        };
        let Some(record) = cached else {
            debug!(message_id, "deleted message not in cache, skipping mod log");
            return;
        };

        let entry = OutboundMessage::default().with_embed(mod_log_embed(&record));
        match self.messages.send_message(channel_id, &entry).await {
            Ok(log_id) => debug!(channel_id, message_id = log_id, "mod log posted"),
            Err(e) => log_error("failed to post mod log", &e),
        }
    }

    /// Reply to the user info command for `target`.
    pub async fn on_user_info(
        &self,
        target: PlatformUserId,
    ) -> Result<OutboundMessage, UserInfoError> {
        let user = self
            .store
            .user_by_platform_id(target)
            .await?
            .ok_or(UserInfoError::NotLinked(target))?;
        let roles = self.store.roles(RoleFilter::All).await?;
        debug!(target, user_id = %user.id, "user info requested");

        Ok(OutboundMessage::text(format!("**[user]** {}", user.id))
            .with_embed(user_info_embed(&user, &roles)))
    }

    async fn grant_default_role(&self, user_id: PlatformUserId, current: &[RoleId]) {
        let Some(role_id) = self.default_role_id else {
            return;
        };
        if current.contains(&role_id) {
            return;
        }
        match self
            .guild
            .add_member_role(self.guild_id, user_id, role_id)
            .await
        {
            Ok(()) => debug!(user_id, role_id, "default role granted"),
            Err(e) => log_error("failed to add default role to user", &e),
        }
    }

    async fn sync(&self, user_id: PlatformUserId) {
        match self.reconciler.sync_member(user_id).await {
            Ok(SyncOutcome::Updated { added, removed, .. }) => {
                debug!(user_id, ?added, ?removed, "event sync applied")
            }
            Ok(_) => {}
            Err(e) => warn!(user_id, error = %e, "event sync failed"),
        }
    }
}

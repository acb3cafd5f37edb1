//! Serenity event handler implementation

pub mod cache;
pub mod events;

use std::sync::Arc;

use serenity::async_trait;
use serenity::builder::{
    CreateAllowedMentions, CreateCommand, CreateInteractionResponse,
    CreateInteractionResponseMessage,
};
use serenity::gateway::{ConnectionStage, ShardStageUpdateEvent};
use serenity::model::application::{CommandType, Interaction};
use serenity::model::channel::Message;
use serenity::model::event::ResumedEvent;
use serenity::model::gateway::Ready;
use serenity::model::guild::Member;
use serenity::model::id::{ChannelId, GuildId, MessageId};
use serenity::model::permissions::Permissions;
use serenity::prelude::*;
use tracing::{error, info, warn};

use crate::errors::{GuildError, log_error};
use crate::guild::convert_embed;

pub use cache::{MessageCache, MessageRecord};
pub use events::{GuildEvents, ObservedMessage, USER_INFO_COMMAND, UserInfoError};

pub struct Handler;

async fn guild_events(ctx: &Context) -> Option<Arc<GuildEvents>> {
    let data = ctx.data.read().await;
    let events = data.get::<GuildEvents>().cloned();
    if events.is_none() {
        error!("GuildEvents not found in context data");
    }
    events
}

/// Snapshot of a gateway message for the event layer.
pub fn observe(msg: &Message) -> ObservedMessage {
    ObservedMessage {
        id: msg.id.get(),
        guild_id: msg.guild_id.map(|g| g.get()),
        author_is_bot: msg.author.bot,
        member_roles: msg
            .member
            .as_ref()
            .map(|m| m.roles.iter().map(|r| r.get()).collect()),
        record: MessageRecord {
            author_id: msg.author.id.get(),
            author_name: msg.author.name.clone(),
            author_avatar: msg.author.avatar_url(),
            channel_id: msg.channel_id.get(),
            content: msg.content.clone(),
            attachments: msg.attachments.iter().map(|a| a.url.clone()).collect(),
            timestamp: Some(msg.timestamp.to_string()),
        },
    }
}

/// Guild commands the bot serves. Registering replaces any stale ones.
pub fn guild_commands() -> Vec<CreateCommand> {
    vec![
        CreateCommand::new(USER_INFO_COMMAND)
            .kind(CommandType::User)
            .default_member_permissions(Permissions::MANAGE_ROLES),
    ]
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(
            "Discord bot connected as {}#{:04}",
            ready.user.name,
            ready.user.discriminator.map_or(0, |d| d.get())
        );

        let Some(events) = guild_events(&ctx).await else {
            return;
        };
        let guild_id = GuildId::new(events.guild_id());
        if !ready.guilds.iter().any(|g| g.id == guild_id) {
            warn!(guild_id = %guild_id, "bot is not a member of the configured guild");
        }
        match guild_id.set_commands(&ctx.http, guild_commands()).await {
            Ok(commands) => info!(count = commands.len(), "guild commands registered"),
            Err(e) => log_error("failed to register guild commands", &GuildError::from(e)),
        }
        events.on_ready(ready.user.name.clone()).await;
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Command(command) = interaction else {
            return;
        };
        if command.data.name != USER_INFO_COMMAND {
            return;
        }
        let Some(target) = command.data.target_id else {
            return;
        };
        let Some(events) = guild_events(&ctx).await else {
            return;
        };
        if !events.is_our_guild(command.guild_id.map(|g| g.get())) {
            return;
        }

        let reply = match events.on_user_info(target.to_user_id().get()).await {
            Ok(reply) => CreateInteractionResponseMessage::new()
                .content(reply.content)
                .embeds(reply.embeds.iter().map(convert_embed).collect()),
            Err(e) => {
                warn!(command = USER_INFO_COMMAND, error = %e, "command failed");
                CreateInteractionResponseMessage::new()
                    .content(e.to_string())
                    .ephemeral(true)
            }
        }
        .allowed_mentions(CreateAllowedMentions::new());

        if let Err(e) = command
            .create_response(&ctx.http, CreateInteractionResponse::Message(reply))
            .await
        {
            log_error("failed to answer command", &GuildError::from(e));
        }
    }

    async fn resume(&self, ctx: Context, _event: ResumedEvent) {
        let Some(events) = guild_events(&ctx).await else {
            return;
        };
        let username = ctx.cache.current_user().name.clone();
        info!("Gateway session resumed");
        events.on_ready(username).await;
    }

    async fn shard_stage_update(&self, ctx: Context, event: ShardStageUpdateEvent) {
        if event.new != ConnectionStage::Disconnected {
            return;
        }
        warn!(shard = ?event.shard_id, "Gateway shard disconnected");
        if let Some(events) = guild_events(&ctx).await {
            events.on_disconnect();
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        let Some(events) = guild_events(&ctx).await else {
            return;
        };
        events.on_message(observe(&msg)).await;
    }

    async fn message_delete(
        &self,
        ctx: Context,
        _channel_id: ChannelId,
        deleted_message_id: MessageId,
        guild_id: Option<GuildId>,
    ) {
        let Some(events) = guild_events(&ctx).await else {
            return;
        };
        events
            .on_message_deleted(guild_id.map(|g| g.get()), deleted_message_id.get())
            .await;
    }

    async fn guild_member_addition(&self, ctx: Context, new_member: Member) {
        let Some(events) = guild_events(&ctx).await else {
            return;
        };
        events
            .on_member_join(new_member.guild_id.get(), new_member.user.id.get())
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_info_command_is_a_user_command_for_role_managers() {
        let commands = guild_commands();
        assert_eq!(commands.len(), 1);

        let json = serde_json::to_value(&commands[0]).unwrap();
        assert_eq!(json["name"], USER_INFO_COMMAND);
        assert_eq!(json["type"], 2);
        assert_eq!(
            json["default_member_permissions"],
            Permissions::MANAGE_ROLES.bits().to_string()
        );
    }
}

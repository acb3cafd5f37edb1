//! In-memory guild and store doubles for testing without Discord or a
//! database.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rolebridge_types::{
    AppRole, AppUser, BotIdentity, GuildMember, GuildRole, OutboundMessage, PlatformUserId, RoleId,
};

use crate::errors::GuildError;
use crate::guild::{GuildClient, MessageRelay};
use crate::store::{RoleFilter, StoreError, UserStore};

/// A guild call recorded by [`MockGuild`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuildCall {
    CurrentUser,
    Member(PlatformUserId),
    Roles,
    ReplaceRoles {
        user_id: PlatformUserId,
        roles: Vec<RoleId>,
    },
    AddRole {
        user_id: PlatformUserId,
        role_id: RoleId,
    },
    SendMessage {
        channel_id: u64,
    },
    SendWebhook {
        channel_id: u64,
    },
}

impl GuildCall {
    pub fn is_write(&self) -> bool {
        matches!(self, Self::ReplaceRoles { .. } | Self::AddRole { .. })
    }
}

/// A message captured by [`MockGuild`]
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub channel_id: u64,
    pub message: OutboundMessage,
    pub via_webhook: bool,
}

#[derive(Default)]
struct GuildState {
    members: HashMap<PlatformUserId, GuildMember>,
    roles: Vec<GuildRole>,
    webhook_channels: Vec<u64>,
    calls: Vec<GuildCall>,
    sent: Vec<SentMessage>,
    read_error: Option<GuildError>,
    write_error: Option<GuildError>,
    next_message_id: u64,
}

/// In-memory guild. Role writes are applied to the stored members so a
/// second reconciliation sees the result of the first.
#[derive(Clone)]
pub struct MockGuild {
    bot: BotIdentity,
    state: Arc<Mutex<GuildState>>,
}

impl MockGuild {
    pub fn new(bot_user_id: PlatformUserId) -> Self {
        Self {
            bot: BotIdentity {
                user_id: bot_user_id,
            },
            state: Arc::new(Mutex::new(GuildState {
                next_message_id: 1000,
                ..Default::default()
            })),
        }
    }

    pub fn with_role(self, role: GuildRole) -> Self {
        self.state.lock().unwrap().roles.push(role);
        self
    }

    pub fn with_member(self, member: GuildMember) -> Self {
        self.state
            .lock()
            .unwrap()
            .members
            .insert(member.user_id, member);
        self
    }

    /// Give `channel_id` a usable webhook.
    pub fn with_webhook(self, channel_id: u64) -> Self {
        self.state.lock().unwrap().webhook_channels.push(channel_id);
        self
    }

    /// Fail every read call with `err`.
    pub fn fail_reads(self, err: GuildError) -> Self {
        self.state.lock().unwrap().read_error = Some(err);
        self
    }

    /// Fail every role write and message send with `err`.
    pub fn fail_writes(self, err: GuildError) -> Self {
        self.state.lock().unwrap().write_error = Some(err);
        self
    }

    /// All calls in the order they were made.
    pub fn calls(&self) -> Vec<GuildCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Role writes only.
    pub fn write_calls(&self) -> Vec<GuildCall> {
        self.calls().into_iter().filter(GuildCall::is_write).collect()
    }

    pub fn sent_messages(&self) -> Vec<SentMessage> {
        self.state.lock().unwrap().sent.clone()
    }

    /// Current roles of `user_id`, if a member.
    pub fn member_roles(&self, user_id: PlatformUserId) -> Option<Vec<RoleId>> {
        self.state
            .lock()
            .unwrap()
            .members
            .get(&user_id)
            .map(|m| m.roles.clone())
    }

    fn record_read(&self, call: GuildCall) -> Result<(), GuildError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        match &state.read_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn record_write(&self, call: GuildCall) -> Result<(), GuildError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        match &state.write_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl GuildClient for MockGuild {
    async fn current_user(&self) -> Result<BotIdentity, GuildError> {
        self.record_read(GuildCall::CurrentUser)?;
        Ok(self.bot)
    }

    async fn member(
        &self,
        _guild_id: u64,
        user_id: PlatformUserId,
    ) -> Result<Option<GuildMember>, GuildError> {
        self.record_read(GuildCall::Member(user_id))?;
        Ok(self.state.lock().unwrap().members.get(&user_id).cloned())
    }

    async fn roles(&self, _guild_id: u64) -> Result<Vec<GuildRole>, GuildError> {
        self.record_read(GuildCall::Roles)?;
        Ok(self.state.lock().unwrap().roles.clone())
    }

    async fn replace_member_roles(
        &self,
        _guild_id: u64,
        user_id: PlatformUserId,
        roles: &[RoleId],
    ) -> Result<(), GuildError> {
        self.record_write(GuildCall::ReplaceRoles {
            user_id,
            roles: roles.to_vec(),
        })?;
        if let Some(member) = self.state.lock().unwrap().members.get_mut(&user_id) {
            member.roles = roles.to_vec();
        }
        Ok(())
    }

    async fn add_member_role(
        &self,
        _guild_id: u64,
        user_id: PlatformUserId,
        role_id: RoleId,
    ) -> Result<(), GuildError> {
        self.record_write(GuildCall::AddRole { user_id, role_id })?;
        if let Some(member) = self.state.lock().unwrap().members.get_mut(&user_id)
            && !member.has_role(role_id)
        {
            member.roles.push(role_id);
        }
        Ok(())
    }
}

#[async_trait]
impl MessageRelay for MockGuild {
    async fn send_message(
        &self,
        channel_id: u64,
        message: &OutboundMessage,
    ) -> Result<u64, GuildError> {
        self.record_write(GuildCall::SendMessage { channel_id })?;
        let mut state = self.state.lock().unwrap();
        state.sent.push(SentMessage {
            channel_id,
            message: message.clone(),
            via_webhook: false,
        });
        state.next_message_id += 1;
        Ok(state.next_message_id)
    }

    async fn send_webhook_message(
        &self,
        channel_id: u64,
        message: &OutboundMessage,
    ) -> Result<Option<u64>, GuildError> {
        self.record_write(GuildCall::SendWebhook { channel_id })?;
        let mut state = self.state.lock().unwrap();
        if !state.webhook_channels.contains(&channel_id) {
            return Ok(None);
        }
        state.sent.push(SentMessage {
            channel_id,
            message: message.clone(),
            via_webhook: true,
        });
        state.next_message_id += 1;
        Ok(Some(state.next_message_id))
    }
}

#[derive(Default)]
struct StoreState {
    users: Vec<AppUser>,
    roles: Vec<AppRole>,
    unavailable: bool,
    lookups: usize,
}

/// In-memory user store
#[derive(Clone, Default)]
pub struct MockStore {
    state: Arc<Mutex<StoreState>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, user: AppUser) -> Self {
        self.state.lock().unwrap().users.push(user);
        self
    }

    pub fn with_role(self, role: AppRole) -> Self {
        self.state.lock().unwrap().roles.push(role);
        self
    }

    /// Make every call fail as if the database were down.
    pub fn unavailable(self) -> Self {
        self.state.lock().unwrap().unavailable = true;
        self
    }

    /// Number of user lookups served.
    pub fn lookups(&self) -> usize {
        self.state.lock().unwrap().lookups
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.state.lock().unwrap().unavailable {
            Err(StoreError::Sqlx(sqlx::Error::PoolTimedOut))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl UserStore for MockStore {
    async fn user_by_id(&self, id: &str) -> Result<Option<AppUser>, StoreError> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        state.lookups += 1;
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }

    async fn user_by_platform_id(
        &self,
        platform_id: PlatformUserId,
    ) -> Result<Option<AppUser>, StoreError> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        state.lookups += 1;
        Ok(state
            .users
            .iter()
            .find(|u| u.platform_id == Some(platform_id))
            .cloned())
    }

    async fn roles(&self, filter: RoleFilter) -> Result<Vec<AppRole>, StoreError> {
        self.check()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .roles
            .iter()
            .filter(|r| filter == RoleFilter::All || r.guild_role_id.is_some())
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check()
    }
}

//! Role reconciliation.
//!
//! One call moves one member's guild roles toward the application's role
//! assignments: read the user, read the guild, compute the bot's rank, keep
//! the linked roles the bot can manage, diff against the member's current
//! roles and, when anything changed, write the complete role list back in a
//! single call. Nothing is cached between calls except the bot identity.
//!
//! Two overlapping calls for the same user are not coordinated; the later
//! write wins and the next trigger converges.


pub mod delta;
pub mod eligibility;
pub mod rank;
pub mod snapshot;

use std::collections::BTreeSet;
use std::sync::Arc;

use rolebridge_types::{AppUser, BotIdentity, PlatformUserId, RoleId};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{error, info, instrument};

use crate::errors::{GuildError, log_error};
use crate::guild::GuildClient;
use crate::store::{RoleFilter, StoreError, UserStore};

pub use delta::{RoleDelta, RoleSet};
pub use eligibility::EligibleRole;
pub use snapshot::{GuildSnapshot, SnapshotError};

/// Reconciler settings
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    pub guild_id: u64,
}

/// How a reconciliation ended without error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The user has not linked a guild account.
    NoPlatformLink,
    /// The linked account is not in the guild.
    NotAMember,
    /// Nothing to change.
    InSync,
    /// The member's roles were replaced with `roles`.
    Updated {
        added: Vec<String>,
        removed: Vec<String>,
        roles: Vec<RoleId>,
    },
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("user {0} not found")]
    UserNotFound(String),
    #[error("bot is not a member of guild {guild_id}")]
    BotNotInGuild { guild_id: u64 },
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("guild error: {0}")]
    Guild(#[from] GuildError),
}

/// Reconciliation engine
pub struct Reconciler {
    store: Arc<dyn UserStore>,
    guild: Arc<dyn GuildClient>,
    config: ReconcilerConfig,
    bot: OnceCell<BotIdentity>,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn UserStore>,
        guild: Arc<dyn GuildClient>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            store,
            guild,
            config,
            bot: OnceCell::new(),
        }
    }

    pub fn guild_id(&self) -> u64 {
        self.config.guild_id
    }

    /// Reconcile the application user `user_id`. With `revoke` the user is
    /// treated as holding no application roles for this call.
    #[instrument(name = "sync_user", skip(self), fields(guild_id = self.config.guild_id))]
    pub async fn sync_user(&self, user_id: &str, revoke: bool) -> Result<SyncOutcome, SyncError> {
        let user = self
            .store
            .user_by_id(user_id)
            .await?
            .ok_or_else(|| SyncError::UserNotFound(user_id.to_string()))?;
        self.reconcile(&user, revoke).await
    }

    /// Reconcile whichever application user linked `platform_id`. A member
    /// no application user has linked is skipped.
    #[instrument(name = "sync_member", skip(self), fields(guild_id = self.config.guild_id))]
    pub async fn sync_member(&self, platform_id: PlatformUserId) -> Result<SyncOutcome, SyncError> {
        match self.store.user_by_platform_id(platform_id).await? {
            Some(user) => self.reconcile(&user, false).await,
            None => {
                info!(platform_id, "no application user linked to member, skipping");
                Ok(SyncOutcome::NoPlatformLink)
            }
        }
    }

    async fn reconcile(&self, user: &AppUser, revoke: bool) -> Result<SyncOutcome, SyncError> {
        let Some(platform_id) = user.platform_id else {
            info!(user_id = %user.id, "user has no linked platform account, skipping");
            return Ok(SyncOutcome::NoPlatformLink);
        };
        let guild_id = self.config.guild_id;

        let bot = self.bot_identity().await.inspect_err(|e| {
            log_error("failed to resolve bot identity", e);
        })?;

        let snapshot = match snapshot::fetch(self.guild.as_ref(), guild_id, bot, platform_id).await
        {
            Ok(snapshot) => snapshot,
            Err(SnapshotError::NotAMember(_)) => {
                info!(user_id = %user.id, platform_id, "user is not a guild member, skipping");
                return Ok(SyncOutcome::NotAMember);
            }
            Err(SnapshotError::BotNotInGuild(bot_id)) => {
                error!(guild_id, bot_id, "bot is not a member of the configured guild");
                return Err(SyncError::BotNotInGuild { guild_id });
            }
            Err(SnapshotError::Guild(e)) => {
                log_error("failed to read guild state", &e);
                return Err(e.into());
            }
        };

        let app_roles = self.store.roles(RoleFilter::Linked).await?;

        let bot_rank = rank::bot_rank(&snapshot.bot, &snapshot.roles);
        let no_roles = BTreeSet::new();
        let assigned = if revoke { &no_roles } else { &user.role_ids };
        let eligible = eligibility::eligible_roles(&app_roles, &snapshot.roles, assigned, bot_rank);
        let delta = delta::compute(&snapshot.member.roles, &eligible);

        if delta.is_empty() {
            info!(user_id = %user.id, platform_id, bot_rank, "user's roles are in sync");
            return Ok(SyncOutcome::InSync);
        }

        if let Err(e) = self
            .guild
            .replace_member_roles(guild_id, platform_id, &delta.roles)
            .await
        {
            log_error("failed to update member roles", &e);
            return Err(e.into());
        }

        info!(
            user_id = %user.id,
            platform_id,
            added = ?delta.added,
            removed = ?delta.removed,
            "roles updated"
        );

        Ok(SyncOutcome::Updated {
            added: delta.added,
            removed: delta.removed,
            roles: delta.roles,
        })
    }

    async fn bot_identity(&self) -> Result<BotIdentity, GuildError> {
        self.bot
            .get_or_try_init(|| self.guild.current_user())
            .await
            .copied()
    }
}

//! Domain entities read by the role reconciliation engine.
//!
//! Every value here is a read snapshot: application-side records come from the
//! user store, guild-side records from the guild API. Nothing is persisted by
//! the service itself.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Guild role snowflake.
pub type RoleId = u64;

/// Guild user snowflake.
pub type PlatformUserId = u64;

/// Application user (owned by the external application database)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppUser {
    pub id: String,
    /// Linked guild-platform account, if the user has connected one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_id: Option<PlatformUserId>,
    /// Application role ids assigned to the user.
    #[serde(default)]
    pub role_ids: BTreeSet<String>,
}

impl AppUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            platform_id: None,
            role_ids: BTreeSet::new(),
        }
    }

    pub fn with_platform_id(mut self, platform_id: PlatformUserId) -> Self {
        self.platform_id = Some(platform_id);
        self
    }

    pub fn with_role(mut self, role_id: impl Into<String>) -> Self {
        self.role_ids.insert(role_id.into());
        self
    }

    pub fn has_role(&self, role_id: &str) -> bool {
        self.role_ids.contains(role_id)
    }
}

/// Application role definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppRole {
    pub id: String,
    pub name: String,
    /// Guild role this application role is mirrored to. Unlinked roles are
    /// never synchronized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_role_id: Option<RoleId>,
}

impl AppRole {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            guild_role_id: None,
        }
    }

    pub fn linked_to(mut self, guild_role_id: RoleId) -> Self {
        self.guild_role_id = Some(guild_role_id);
        self
    }
}

/// Guild role as reported by the guild API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GuildRole {
    pub id: RoleId,
    pub name: String,
    /// Hierarchy position; higher outranks lower.
    pub position: i64,
    /// Owned by an integration (bot role, booster role, ...). Never assignable.
    #[serde(default)]
    pub managed: bool,
}

impl GuildRole {
    pub fn new(id: RoleId, name: impl Into<String>, position: i64) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            managed: false,
        }
    }

    pub fn managed(mut self) -> Self {
        self.managed = true;
        self
    }
}

/// Guild member with the roles it currently holds, in guild API order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GuildMember {
    pub user_id: PlatformUserId,
    #[serde(default)]
    pub roles: Vec<RoleId>,
}

impl GuildMember {
    pub fn new(user_id: PlatformUserId, roles: Vec<RoleId>) -> Self {
        Self { user_id, roles }
    }

    pub fn has_role(&self, role_id: RoleId) -> bool {
        self.roles.contains(&role_id)
    }
}

/// The service's own account on the guild platform
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BotIdentity {
    pub user_id: PlatformUserId,
}

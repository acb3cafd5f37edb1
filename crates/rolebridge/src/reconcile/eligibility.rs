//! Which guild roles the reconciler is allowed to touch, and whether the user
//! should hold each of them.

use std::collections::{BTreeSet, HashMap};

use rolebridge_types::{AppRole, GuildRole, RoleId};

/// A linked guild role the bot has authority over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibleRole<'a> {
    pub role: &'a GuildRole,
    /// The user should hold this role.
    pub desired: bool,
}

/// The bot can grant or revoke `role`.
pub fn can_manage(role: &GuildRole, bot_rank: i64) -> bool {
    !role.managed && role.position < bot_rank
}

/// Filter `app_roles` down to the guild roles that can be synchronized.
///
/// Unlinked roles, stale links and roles outside the bot's authority are
/// skipped. When several application roles link to the same guild role the
/// user should hold it if any of them is in `assigned`. Output order follows
/// the first application role linking each guild role.
pub fn eligible_roles<'a>(
    app_roles: &[AppRole],
    guild_roles: &'a [GuildRole],
    assigned: &BTreeSet<String>,
    bot_rank: i64,
) -> Vec<EligibleRole<'a>> {
    let by_id: HashMap<RoleId, &GuildRole> = guild_roles.iter().map(|r| (r.id, r)).collect();

    let mut eligible: Vec<EligibleRole<'a>> = Vec::new();
    let mut index: HashMap<RoleId, usize> = HashMap::new();

    for app_role in app_roles {
        let Some(linked) = app_role.guild_role_id else {
            continue;
        };
        let Some(&role) = by_id.get(&linked) else {
            continue;
        };
        if !can_manage(role, bot_rank) {
            continue;
        }

        let desired = assigned.contains(&app_role.id);
        match index.get(&linked) {
            Some(&i) => eligible[i].desired |= desired,
            None => {
                index.insert(linked, eligible.len());
                eligible.push(EligibleRole { role, desired });
            }
        }
    }

    eligible
}

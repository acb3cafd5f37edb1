//! Role delta between a member's current roles and the eligible set.

use std::collections::HashSet;

use rolebridge_types::RoleId;

use super::eligibility::EligibleRole;

/// Insertion-ordered set of role ids.
///
/// Membership decisions go through the hash set; the vector only keeps the
/// order the final role list is written in.
#[derive(Debug, Clone, Default)]
pub struct RoleSet {
    order: Vec<RoleId>,
    members: HashSet<RoleId>,
}

impl RoleSet {
    pub fn contains(&self, id: RoleId) -> bool {
        self.members.contains(&id)
    }

    /// Append `id` unless already present.
    pub fn insert(&mut self, id: RoleId) -> bool {
        if self.members.insert(id) {
            self.order.push(id);
            true
        } else {
            false
        }
    }

    pub fn remove(&mut self, id: RoleId) -> bool {
        if self.members.remove(&id) {
            self.order.retain(|r| *r != id);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn into_vec(self) -> Vec<RoleId> {
        self.order
    }
}

impl FromIterator<RoleId> for RoleSet {
    fn from_iter<I: IntoIterator<Item = RoleId>>(iter: I) -> Self {
        let mut set = RoleSet::default();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

/// Result of [`compute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDelta {
    /// Complete role list to write.
    pub roles: Vec<RoleId>,
    /// Names of granted roles.
    pub added: Vec<String>,
    /// Names of revoked roles.
    pub removed: Vec<String>,
}

impl RoleDelta {
    /// Nothing to change; the write must be skipped.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Apply `eligible` to `current`. Roles outside `eligible` are carried over
/// untouched and keep their relative order; granted roles are appended.
pub fn compute(current: &[RoleId], eligible: &[EligibleRole<'_>]) -> RoleDelta {
    let mut roles: RoleSet = current.iter().copied().collect();
    let mut added = Vec::new();
    let mut removed = Vec::new();

    for entry in eligible {
        let id = entry.role.id;
        if entry.desired {
            if roles.insert(id) {
                added.push(entry.role.name.clone());
            }
        } else if roles.remove(id) {
            removed.push(entry.role.name.clone());
        }
    }

    RoleDelta {
        roles: roles.into_vec(),
        added,
        removed,
    }
}

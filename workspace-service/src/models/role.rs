//! Workspace roles and the privilege policy attached to them.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Role a member holds inside a workspace.
///
/// Privilege is ordered OWNER > ADMIN > MEMBER for policy checks only; the
/// variant order carries no meaning for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "workspace_role", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Owner,
    Admin,
    Member,
}

/// Actions gated by workspace role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    ViewWorkspace,
    UpdateWorkspace,
    DeleteWorkspace,
    /// Add, remove or re-role members below OWNER.
    ManageMembers,
    /// Hand the OWNER role to someone through add or role change.
    GrantOwnership,
    TransferOwnership,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "OWNER",
            Role::Admin => "ADMIN",
            Role::Member => "MEMBER",
        }
    }

    pub fn privilege(&self) -> u8 {
        match self {
            Role::Owner => 3,
            Role::Admin => 2,
            Role::Member => 1,
        }
    }

    pub fn is_owner(&self) -> bool {
        matches!(self, Role::Owner)
    }

    pub fn is_owner_or_admin(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }

    pub fn outranks(&self, other: Role) -> bool {
        self.privilege() > other.privilege()
    }

    pub fn permits(&self, permission: Permission) -> bool {
        match permission {
            Permission::ViewWorkspace => true,
            Permission::UpdateWorkspace | Permission::ManageMembers => self.is_owner_or_admin(),
            Permission::DeleteWorkspace
            | Permission::GrantOwnership
            | Permission::TransferOwnership => self.is_owner(),
        }
    }

    /// Whether a holder of `self` may tombstone a member currently holding `target`.
    ///
    /// OWNER is never removable; otherwise the actor must manage members and
    /// strictly outrank the target, so ADMINs may only remove MEMBERs.
    pub fn can_remove(&self, target: Role) -> bool {
        !target.is_owner() && self.permits(Permission::ManageMembers) && self.outranks(target)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Role; 3] = [Role::Owner, Role::Admin, Role::Member];

    #[test]
    fn privilege_is_totally_ordered() {
        assert!(Role::Owner.outranks(Role::Admin));
        assert!(Role::Admin.outranks(Role::Member));
        assert!(!Role::Member.outranks(Role::Member));
    }

    #[test]
    fn ownership_permissions_belong_to_owner_only() {
        for role in ALL {
            assert_eq!(role.permits(Permission::GrantOwnership), role == Role::Owner);
            assert_eq!(role.permits(Permission::TransferOwnership), role == Role::Owner);
            assert_eq!(role.permits(Permission::DeleteWorkspace), role == Role::Owner);
        }
    }

    #[test]
    fn management_requires_owner_or_admin() {
        assert!(Role::Owner.permits(Permission::ManageMembers));
        assert!(Role::Admin.permits(Permission::UpdateWorkspace));
        assert!(!Role::Member.permits(Permission::ManageMembers));
        assert!(Role::Member.permits(Permission::ViewWorkspace));
    }

    #[test]
    fn owner_is_never_removable() {
        for actor in ALL {
            assert!(!actor.can_remove(Role::Owner));
        }
    }

    #[test]
    fn admins_cannot_remove_admins() {
        assert!(!Role::Admin.can_remove(Role::Admin));
        assert!(Role::Admin.can_remove(Role::Member));
        assert!(Role::Owner.can_remove(Role::Admin));
        assert!(!Role::Member.can_remove(Role::Member));
    }

    #[test]
    fn serializes_upper_case() {
        assert_eq!(serde_json::to_string(&Role::Owner).unwrap(), "\"OWNER\"");
    }
}

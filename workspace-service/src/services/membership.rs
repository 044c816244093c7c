//! Membership authorization engine.
//!
//! Per (user, workspace) a membership moves `NONE -> ACTIVE(role) ->
//! TOMBSTONED -> ACTIVE(role)` and is never deleted. Every operation runs in a
//! single unit of work: the actor's role, the target's state and all writes
//! commit together or not at all.

use std::sync::Arc;

use uuid::Uuid;

use crate::db::{RecordFilter, Store, StoreTx};
use crate::models::user::normalize_email;
use crate::models::{Identity, Membership, Permission, Role, User, Workspace};
use crate::services::DomainError;

/// Active workspace or `WorkspaceNotFound`.
pub(crate) async fn require_workspace(
    tx: &mut dyn StoreTx,
    workspace_id: Uuid,
) -> Result<Workspace, DomainError> {
    tx.find_workspace_by_id(workspace_id, RecordFilter::Active)
        .await?
        .ok_or(DomainError::WorkspaceNotFound)
}

/// The acting user's active membership or `NotAMember`.
pub(crate) async fn require_actor(
    tx: &mut dyn StoreTx,
    workspace_id: Uuid,
    actor: &Identity,
) -> Result<Membership, DomainError> {
    tx.find_membership(actor.user_id, workspace_id, RecordFilter::Active)
        .await?
        .ok_or_else(|| DomainError::not_a_member("You are not a member of this workspace"))
}

async fn require_user(tx: &mut dyn StoreTx, email: &str) -> Result<User, DomainError> {
    tx.find_user_by_email(&normalize_email(email))
        .await?
        .ok_or(DomainError::UserNotFound)
}

async fn require_target(
    tx: &mut dyn StoreTx,
    workspace_id: Uuid,
    user: &User,
) -> Result<Membership, DomainError> {
    tx.find_membership(user.user_id, workspace_id, RecordFilter::Active)
        .await?
        .ok_or_else(|| DomainError::not_a_member("Target user is not a member of this workspace"))
}

/// Hands OWNER away from `actor` ahead of writing a new OWNER, so the store
/// never holds two active OWNER rows.
async fn step_down(tx: &mut dyn StoreTx, actor: &mut Membership) -> Result<(), DomainError> {
    actor.member_role = Role::Admin;
    tx.save_membership(actor).await?;
    tracing::info!(
        workspace_id = %actor.workspace_id,
        user_id = %actor.user_id,
        "Owner stepped down to ADMIN"
    );
    Ok(())
}

#[derive(Clone)]
pub struct MembershipService {
    store: Arc<dyn Store>,
}

impl MembershipService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Side-effect free policy query. Non-members and tombstoned workspaces
    /// are never permitted anything.
    pub async fn check_permission(
        &self,
        workspace_id: Uuid,
        actor: &Identity,
        permission: Permission,
    ) -> Result<bool, DomainError> {
        let mut tx = self.store.begin().await?;
        if tx
            .find_workspace_by_id(workspace_id, RecordFilter::Active)
            .await?
            .is_none()
        {
            return Ok(false);
        }

        let membership = tx
            .find_membership(actor.user_id, workspace_id, RecordFilter::Active)
            .await?;
        Ok(membership.is_some_and(|m| m.member_role.permits(permission)))
    }

    pub async fn add_member(
        &self,
        workspace_id: Uuid,
        actor: &Identity,
        email: &str,
        role: Role,
    ) -> Result<(), DomainError> {
        let mut tx = self.store.begin().await?;
        require_workspace(tx.as_mut(), workspace_id).await?;
        let mut actor_membership = require_actor(tx.as_mut(), workspace_id, actor).await?;

        if !actor_membership.member_role.permits(Permission::ManageMembers) {
            return Err(DomainError::insufficient(
                "Only owner or admin can add members",
            ));
        }
        if role == Role::Owner && !actor_membership.member_role.permits(Permission::GrantOwnership) {
            return Err(DomainError::insufficient(
                "Only the owner can grant the OWNER role",
            ));
        }

        let target = require_user(tx.as_mut(), email).await?;
        let existing = tx
            .find_membership(target.user_id, workspace_id, RecordFilter::All)
            .await?;

        if existing.as_ref().is_some_and(Membership::is_active) {
            return Err(DomainError::ActiveMemberConflict);
        }

        if role == Role::Owner {
            step_down(tx.as_mut(), &mut actor_membership).await?;
        }

        let reactivated = existing.is_some();
        let mut membership = match existing {
            Some(mut tombstoned) => {
                tombstoned.reactivate(role);
                tombstoned
            }
            None => Membership::new(workspace_id, target.user_id, role),
        };
        tx.save_membership(&mut membership).await?;
        tx.commit().await?;

        tracing::info!(
            workspace_id = %workspace_id,
            actor_id = %actor.user_id,
            target_id = %target.user_id,
            role = %role,
            reactivated,
            "Member added"
        );
        Ok(())
    }

    pub async fn remove_member(
        &self,
        workspace_id: Uuid,
        actor: &Identity,
        email: &str,
    ) -> Result<(), DomainError> {
        let mut tx = self.store.begin().await?;
        require_workspace(tx.as_mut(), workspace_id).await?;
        let actor_membership = require_actor(tx.as_mut(), workspace_id, actor).await?;

        if !actor_membership.member_role.permits(Permission::ManageMembers) {
            return Err(DomainError::insufficient(
                "Only owner or admin can remove members",
            ));
        }

        let target = require_user(tx.as_mut(), email).await?;
        let mut membership = require_target(tx.as_mut(), workspace_id, &target).await?;

        if membership.member_role.is_owner() {
            return Err(DomainError::insufficient("The owner cannot be removed"));
        }
        if !actor_membership.member_role.can_remove(membership.member_role) {
            return Err(DomainError::insufficient("Admins cannot remove other admins"));
        }

        membership.tombstone();
        tx.save_membership(&mut membership).await?;
        tx.commit().await?;

        tracing::info!(
            workspace_id = %workspace_id,
            actor_id = %actor.user_id,
            target_id = %target.user_id,
            role = %membership.member_role,
            "Member removed"
        );
        Ok(())
    }

    pub async fn change_role(
        &self,
        workspace_id: Uuid,
        actor: &Identity,
        email: &str,
        new_role: Role,
    ) -> Result<(), DomainError> {
        let mut tx = self.store.begin().await?;
        require_workspace(tx.as_mut(), workspace_id).await?;
        let mut actor_membership = require_actor(tx.as_mut(), workspace_id, actor).await?;

        if !actor_membership.member_role.permits(Permission::ManageMembers) {
            return Err(DomainError::insufficient(
                "Only owner or admin can change roles",
            ));
        }
        if new_role == Role::Owner
            && !actor_membership.member_role.permits(Permission::GrantOwnership)
        {
            return Err(DomainError::insufficient(
                "Only the owner can grant the OWNER role",
            ));
        }

        let target = require_user(tx.as_mut(), email).await?;
        let mut membership = require_target(tx.as_mut(), workspace_id, &target).await?;

        if membership.member_role.is_owner() {
            return Err(DomainError::insufficient(
                "The owner's role can only change through an ownership transfer",
            ));
        }

        let previous = membership.member_role;
        if new_role == Role::Owner {
            step_down(tx.as_mut(), &mut actor_membership).await?;
        }

        membership.member_role = new_role;
        tx.save_membership(&mut membership).await?;
        tx.commit().await?;

        tracing::info!(
            workspace_id = %workspace_id,
            actor_id = %actor.user_id,
            target_id = %target.user_id,
            from = %previous,
            to = %new_role,
            "Member role changed"
        );
        Ok(())
    }

    pub async fn leave(&self, workspace_id: Uuid, actor: &Identity) -> Result<(), DomainError> {
        let mut tx = self.store.begin().await?;
        require_workspace(tx.as_mut(), workspace_id).await?;
        let mut membership = require_actor(tx.as_mut(), workspace_id, actor).await?;

        if membership.member_role.is_owner() {
            return Err(DomainError::OwnerCannotLeave);
        }

        membership.tombstone();
        tx.save_membership(&mut membership).await?;
        tx.commit().await?;

        tracing::info!(
            workspace_id = %workspace_id,
            user_id = %actor.user_id,
            role = %membership.member_role,
            "Member left workspace"
        );
        Ok(())
    }

    /// Makes `new_owner_email` the OWNER and the acting owner an ADMIN, as one
    /// atomic change.
    pub async fn transfer_ownership(
        &self,
        workspace_id: Uuid,
        actor: &Identity,
        new_owner_email: &str,
    ) -> Result<(), DomainError> {
        let mut tx = self.store.begin().await?;
        require_workspace(tx.as_mut(), workspace_id).await?;
        let mut actor_membership = require_actor(tx.as_mut(), workspace_id, actor).await?;

        if !actor_membership.member_role.permits(Permission::TransferOwnership) {
            return Err(DomainError::insufficient(
                "Only the owner can transfer ownership",
            ));
        }

        let target = require_user(tx.as_mut(), new_owner_email).await?;
        if target.user_id == actor.user_id {
            return Err(DomainError::ValidationFailed(
                "Cannot transfer ownership to yourself".to_string(),
            ));
        }
        let mut membership = require_target(tx.as_mut(), workspace_id, &target).await?;

        step_down(tx.as_mut(), &mut actor_membership).await?;
        membership.member_role = Role::Owner;
        tx.save_membership(&mut membership).await?;
        tx.commit().await?;

        tracing::info!(
            workspace_id = %workspace_id,
            previous_owner = %actor.user_id,
            new_owner = %target.user_id,
            "Ownership transferred"
        );
        Ok(())
    }

    pub async fn count_active_members(&self, workspace_id: Uuid) -> Result<i64, DomainError> {
        let mut tx = self.store.begin().await?;
        Ok(tx.count_active_memberships(workspace_id).await?)
    }
}

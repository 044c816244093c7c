//! Workspace lifecycle: create, update, soft delete, and member-scoped reads.

use std::sync::Arc;

use uuid::Uuid;

use crate::db::Store;
use crate::models::{Identity, Membership, Permission, Role, Workspace, WorkspaceDetails, WorkspaceType};
use crate::services::membership::{require_actor, require_workspace};
use crate::services::DomainError;

#[derive(Clone)]
pub struct WorkspaceService {
    store: Arc<dyn Store>,
}

impl WorkspaceService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Creates the workspace together with the creator's OWNER membership.
    pub async fn create(
        &self,
        name: &str,
        workspace_type: WorkspaceType,
        owner: &Identity,
    ) -> Result<Uuid, DomainError> {
        let mut tx = self.store.begin().await?;

        let mut workspace = Workspace::new(name.trim().to_string(), workspace_type);
        tx.save_workspace(&mut workspace).await?;

        let mut membership = Membership::new(workspace.workspace_id, owner.user_id, Role::Owner);
        tx.save_membership(&mut membership).await?;
        tx.commit().await?;

        tracing::info!(
            workspace_id = %workspace.workspace_id,
            owner_id = %owner.user_id,
            workspace_type = ?workspace_type,
            "Workspace created"
        );
        Ok(workspace.workspace_id)
    }

    pub async fn update(
        &self,
        workspace_id: Uuid,
        actor: &Identity,
        name: &str,
        workspace_type: WorkspaceType,
    ) -> Result<(), DomainError> {
        let mut tx = self.store.begin().await?;
        let mut workspace = require_workspace(tx.as_mut(), workspace_id).await?;
        let membership = require_actor(tx.as_mut(), workspace_id, actor).await?;

        if !membership.member_role.permits(Permission::UpdateWorkspace) {
            return Err(DomainError::insufficient(
                "Only owner or admin can update the workspace",
            ));
        }

        workspace.workspace_name = name.trim().to_string();
        workspace.workspace_type = workspace_type;
        tx.save_workspace(&mut workspace).await?;
        tx.commit().await?;

        tracing::info!(workspace_id = %workspace_id, actor_id = %actor.user_id, "Workspace updated");
        Ok(())
    }

    /// Tombstones the workspace. Memberships are left untouched.
    pub async fn soft_delete(&self, workspace_id: Uuid, actor: &Identity) -> Result<(), DomainError> {
        let mut tx = self.store.begin().await?;
        let mut workspace = require_workspace(tx.as_mut(), workspace_id).await?;
        let membership = require_actor(tx.as_mut(), workspace_id, actor).await?;

        if !membership.member_role.permits(Permission::DeleteWorkspace) {
            return Err(DomainError::insufficient(
                "Only the owner can delete the workspace",
            ));
        }

        workspace.tombstone();
        tx.save_workspace(&mut workspace).await?;
        tx.commit().await?;

        tracing::info!(workspace_id = %workspace_id, actor_id = %actor.user_id, "Workspace deleted");
        Ok(())
    }

    /// Non-members get `NotAMember`, whether or not the workspace exists.
    pub async fn get_details(
        &self,
        workspace_id: Uuid,
        actor: &Identity,
    ) -> Result<WorkspaceDetails, DomainError> {
        let mut tx = self.store.begin().await?;
        tx.list_workspace_details_for_user(actor.user_id, Some(workspace_id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::not_a_member("You are not a member of this workspace"))
    }

    pub async fn list_for_user(&self, actor: &Identity) -> Result<Vec<WorkspaceDetails>, DomainError> {
        let mut tx = self.store.begin().await?;
        Ok(tx.list_workspace_details_for_user(actor.user_id, None).await?)
    }
}

//! In-process store used for development without `DATABASE_URL` and by tests.
//!
//! Units of work are serialized behind one async mutex. Each works on a copy of
//! the state that replaces the shared state on commit, so the same version and
//! uniqueness rules as the Postgres schema apply.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::gateway::{RecordFilter, Store, StoreError, StoreTx};
use crate::models::{Membership, OwnerInfo, Role, User, Workspace, WorkspaceDetails};

#[derive(Debug, Default, Clone)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    workspaces: HashMap<Uuid, Workspace>,
    memberships: HashMap<Uuid, Membership>,
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx { guard, working }))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

fn check_version(entity: &str, stored: Option<i64>, expected: i64) -> Result<(), StoreError> {
    if stored.unwrap_or(0) != expected {
        return Err(StoreError::Conflict(format!(
            "{} changed since it was read",
            entity
        )));
    }
    Ok(())
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, StoreError> {
        let email = email.to_lowercase();
        Ok(self
            .working
            .users
            .values()
            .find(|u| u.email.to_lowercase() == email)
            .cloned())
    }

    async fn find_user_by_id(&mut self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.working.users.get(&user_id).cloned())
    }

    async fn save_user(&mut self, user: &mut User) -> Result<(), StoreError> {
        let stored = self.working.users.get(&user.user_id).map(|u| u.row_version);
        check_version("user", stored, user.row_version)?;

        let email = user.email.to_lowercase();
        let taken = self
            .working
            .users
            .values()
            .any(|u| u.user_id != user.user_id && u.email.to_lowercase() == email);
        if taken {
            return Err(StoreError::Duplicate("email already registered".to_string()));
        }

        user.row_version += 1;
        self.working.users.insert(user.user_id, user.clone());
        Ok(())
    }

    async fn find_workspace_by_id(
        &mut self,
        workspace_id: Uuid,
        filter: RecordFilter,
    ) -> Result<Option<Workspace>, StoreError> {
        Ok(self
            .working
            .workspaces
            .get(&workspace_id)
            .filter(|w| filter.admits(!w.is_active()))
            .cloned())
    }

    async fn save_workspace(&mut self, workspace: &mut Workspace) -> Result<(), StoreError> {
        let stored = self
            .working
            .workspaces
            .get(&workspace.workspace_id)
            .map(|w| w.row_version);
        check_version("workspace", stored, workspace.row_version)?;

        workspace.row_version += 1;
        self.working
            .workspaces
            .insert(workspace.workspace_id, workspace.clone());
        Ok(())
    }

    async fn find_membership(
        &mut self,
        user_id: Uuid,
        workspace_id: Uuid,
        filter: RecordFilter,
    ) -> Result<Option<Membership>, StoreError> {
        Ok(self
            .working
            .memberships
            .values()
            .find(|m| m.user_id == user_id && m.workspace_id == workspace_id)
            .filter(|m| filter.admits(!m.is_active()))
            .cloned())
    }

    async fn save_membership(&mut self, membership: &mut Membership) -> Result<(), StoreError> {
        let stored = self
            .working
            .memberships
            .get(&membership.membership_id)
            .map(|m| m.row_version);
        check_version("membership", stored, membership.row_version)?;

        let others = self
            .working
            .memberships
            .values()
            .filter(|m| m.membership_id != membership.membership_id)
            .filter(|m| m.workspace_id == membership.workspace_id);

        for other in others {
            if other.user_id == membership.user_id {
                return Err(StoreError::Conflict(
                    "workspace_members_user_workspace_key".to_string(),
                ));
            }
            if membership.is_active()
                && membership.member_role == Role::Owner
                && other.is_active()
                && other.member_role == Role::Owner
            {
                return Err(StoreError::Conflict(
                    "workspace_members_single_owner_idx".to_string(),
                ));
            }
        }

        membership.row_version += 1;
        self.working
            .memberships
            .insert(membership.membership_id, membership.clone());
        Ok(())
    }

    async fn count_active_memberships(&mut self, workspace_id: Uuid) -> Result<i64, StoreError> {
        let count = self
            .working
            .memberships
            .values()
            .filter(|m| m.workspace_id == workspace_id && m.is_active())
            .count();
        Ok(count as i64)
    }

    async fn list_workspace_details_for_user(
        &mut self,
        user_id: Uuid,
        workspace_id: Option<Uuid>,
    ) -> Result<Vec<WorkspaceDetails>, StoreError> {
        let state = &self.working;
        let mut rows: Vec<(&Workspace, WorkspaceDetails)> = state
            .memberships
            .values()
            .filter(|m| m.user_id == user_id && m.is_active())
            .filter(|m| workspace_id.map_or(true, |id| m.workspace_id == id))
            .filter_map(|caller| {
                let workspace = state
                    .workspaces
                    .get(&caller.workspace_id)
                    .filter(|w| w.is_active())?;
                let members = state
                    .memberships
                    .values()
                    .filter(|m| m.workspace_id == workspace.workspace_id && m.is_active());
                let owner = members
                    .clone()
                    .find(|m| m.member_role == Role::Owner)
                    .and_then(|m| state.users.get(&m.user_id))?;

                Some((
                    workspace,
                    WorkspaceDetails {
                        workspace_id: workspace.workspace_id,
                        workspace_name: workspace.workspace_name.clone(),
                        workspace_type: workspace.workspace_type,
                        owner: OwnerInfo {
                            user_id: owner.user_id,
                            display_name: owner.display_name.clone(),
                            email: owner.email.clone(),
                        },
                        member_count: members.count() as i64,
                        caller_role: caller.member_role,
                    },
                ))
            })
            .collect();

        rows.sort_by_key(|(w, _)| w.created_utc);
        Ok(rows.into_iter().map(|(_, details)| details).collect())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WorkspaceType;

    #[tokio::test]
    async fn uncommitted_writes_are_discarded() {
        let store = InMemoryStore::new();
        let mut user = User::new("Aspen".into(), "aspen@x.com".into(), "h".into());

        {
            let mut tx = store.begin().await.unwrap();
            tx.save_user(&mut user).await.unwrap();
        }

        let mut tx = store.begin().await.unwrap();
        assert!(tx.find_user_by_id(user.user_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stale_version_is_a_conflict() {
        let store = InMemoryStore::new();
        let mut user = User::new("Aspen".into(), "aspen@x.com".into(), "h".into());
        let mut tx = store.begin().await.unwrap();
        tx.save_user(&mut user).await.unwrap();
        tx.commit().await.unwrap();

        let mut stale = user.clone();
        let mut tx = store.begin().await.unwrap();
        user.refresh_token_hash = Some("a".into());
        tx.save_user(&mut user).await.unwrap();
        stale.refresh_token_hash = Some("b".into());
        let err = tx.save_user(&mut stale).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn email_uniqueness_ignores_case() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let mut first = User::new("A".into(), "aspen@x.com".into(), "h".into());
        tx.save_user(&mut first).await.unwrap();

        let mut second = User::new("B".into(), "aspen@x.com".into(), "h".into());
        second.email = "ASPEN@X.COM".into();
        let err = tx.save_user(&mut second).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
        assert!(tx.find_user_by_email("Aspen@X.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn second_active_owner_is_rejected() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let mut ws = Workspace::new("Eng".into(), WorkspaceType::Team);
        tx.save_workspace(&mut ws).await.unwrap();

        let mut a = Membership::new(ws.workspace_id, Uuid::new_v4(), Role::Owner);
        tx.save_membership(&mut a).await.unwrap();
        let mut b = Membership::new(ws.workspace_id, Uuid::new_v4(), Role::Owner);
        assert!(matches!(
            tx.save_membership(&mut b).await,
            Err(StoreError::Conflict(_))
        ));

        // Demote first, then the promotion goes through.
        a.member_role = Role::Admin;
        tx.save_membership(&mut a).await.unwrap();
        tx.save_membership(&mut b).await.unwrap();
        assert_eq!(tx.count_active_memberships(ws.workspace_id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn tombstoned_rows_hidden_from_active_lookups() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let mut ws = Workspace::new("Eng".into(), WorkspaceType::Team);
        ws.tombstone();
        tx.save_workspace(&mut ws).await.unwrap();

        let id = ws.workspace_id;
        assert!(tx.find_workspace_by_id(id, RecordFilter::Active).await.unwrap().is_none());
        assert!(tx.find_workspace_by_id(id, RecordFilter::All).await.unwrap().is_some());
    }
}

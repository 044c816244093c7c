//! Persistence boundary used by every service.
//!
//! A [`StoreTx`] is one unit of work: everything read through it is locked for
//! its lifetime and every write becomes visible atomically on [`StoreTx::commit`].
//! Dropping a unit of work without committing discards its writes.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Membership, User, Workspace, WorkspaceDetails};

#[derive(Debug, Error)]
pub enum StoreError {
    /// Optimistic version check or a uniqueness rule lost a race. Retryable.
    #[error("Concurrent modification: {0}")]
    Conflict(String),

    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Storage failure: {0}")]
    Backend(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.is_unique_violation() {
                let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                return if constraint == "users_email_lower_key" {
                    StoreError::Duplicate("email already registered".to_string())
                } else {
                    StoreError::Conflict(constraint)
                };
            }
        }
        StoreError::Backend(anyhow::Error::new(err))
    }
}

/// Whether tombstoned rows are visible to a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFilter {
    Active,
    All,
}

impl RecordFilter {
    pub fn admits(&self, deleted: bool) -> bool {
        match self {
            RecordFilter::Active => !deleted,
            RecordFilter::All => true,
        }
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

/// Saves are version-checked: an entity is written only if the stored row
/// still carries the `row_version` it was read with (0 for a new entity).
/// On success the entity's `row_version` is advanced in place.
#[async_trait]
pub trait StoreTx: Send {
    /// Case-insensitive.
    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_id(&mut self, user_id: Uuid) -> Result<Option<User>, StoreError>;

    async fn save_user(&mut self, user: &mut User) -> Result<(), StoreError>;

    async fn find_workspace_by_id(
        &mut self,
        workspace_id: Uuid,
        filter: RecordFilter,
    ) -> Result<Option<Workspace>, StoreError>;

    async fn save_workspace(&mut self, workspace: &mut Workspace) -> Result<(), StoreError>;

    async fn find_membership(
        &mut self,
        user_id: Uuid,
        workspace_id: Uuid,
        filter: RecordFilter,
    ) -> Result<Option<Membership>, StoreError>;

    async fn save_membership(&mut self, membership: &mut Membership) -> Result<(), StoreError>;

    async fn count_active_memberships(&mut self, workspace_id: Uuid) -> Result<i64, StoreError>;

    /// Active workspaces in which `user_id` holds an active membership, oldest
    /// first, optionally narrowed to a single workspace.
    async fn list_workspace_details_for_user(
        &mut self,
        user_id: Uuid,
        workspace_id: Option<Uuid>,
    ) -> Result<Vec<WorkspaceDetails>, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

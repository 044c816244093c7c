//! Membership model - the (user, workspace, role) relation with its tombstone.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::Role;

/// One row per (user, workspace) pair, ever. Leaving or removal tombstones it;
/// re-adding reactivates the same row.
#[derive(Debug, Clone, FromRow)]
pub struct Membership {
    pub membership_id: Uuid,
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub member_role: Role,
    pub joined_utc: DateTime<Utc>,
    pub deleted_utc: Option<DateTime<Utc>>,
    pub row_version: i64,
}

impl Membership {
    pub fn new(workspace_id: Uuid, user_id: Uuid, member_role: Role) -> Self {
        Self {
            membership_id: Uuid::new_v4(),
            workspace_id,
            user_id,
            member_role,
            joined_utc: Utc::now(),
            deleted_utc: None,
            row_version: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.deleted_utc.is_none()
    }

    pub fn tombstone(&mut self) {
        self.deleted_utc = Some(Utc::now());
    }

    /// TOMBSTONED -> ACTIVE(role).
    pub fn reactivate(&mut self, role: Role) {
        self.deleted_utc = None;
        self.member_role = role;
        self.joined_utc = Utc::now();
    }
}

//! Workspace model and the joined read projection served to members.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::Role;

/// Workspace classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "workspace_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkspaceType {
    Personal,
    Team,
    Organization,
}

/// Workspace entity. `deleted_utc` is the tombstone; `None` means active.
#[derive(Debug, Clone, FromRow)]
pub struct Workspace {
    pub workspace_id: Uuid,
    pub workspace_name: String,
    pub workspace_type: WorkspaceType,
    pub created_utc: DateTime<Utc>,
    pub deleted_utc: Option<DateTime<Utc>>,
    pub row_version: i64,
}

impl Workspace {
    pub fn new(workspace_name: String, workspace_type: WorkspaceType) -> Self {
        Self {
            workspace_id: Uuid::new_v4(),
            workspace_name,
            workspace_type,
            created_utc: Utc::now(),
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
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct OwnerInfo {
    pub user_id: Uuid,
    pub display_name: String,
    pub email: String,
}

/// Workspace as seen by one of its active members.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WorkspaceDetails {
    pub workspace_id: Uuid,
    pub workspace_name: String,
    pub workspace_type: WorkspaceType,
    pub owner: OwnerInfo,
    pub member_count: i64,
    pub caller_role: Role,
}

//! PostgreSQL implementation of the store.
//!
//! Entity reads inside a unit of work take row locks (`FOR UPDATE`); saves are
//! upserts guarded by `row_version`, and the partial unique index on active
//! OWNER memberships backs the single-owner rule.

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::gateway::{RecordFilter, Store, StoreError, StoreTx};
use crate::models::{
    Membership, OwnerInfo, Role, User, Workspace, WorkspaceDetails, WorkspaceType,
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        super::health_check(&self.pool).await?;
        Ok(())
    }
}

struct PgTx {
    tx: Transaction<'static, Postgres>,
}

fn stale(entity: &str) -> StoreError {
    StoreError::Conflict(format!("{} changed since it was read", entity))
}

#[derive(FromRow)]
struct DetailsRow {
    workspace_id: Uuid,
    workspace_name: String,
    workspace_type: WorkspaceType,
    owner_user_id: Uuid,
    owner_display_name: String,
    owner_email: String,
    member_count: i64,
    caller_role: Role,
}

impl From<DetailsRow> for WorkspaceDetails {
    fn from(row: DetailsRow) -> Self {
        Self {
            workspace_id: row.workspace_id,
            workspace_name: row.workspace_name,
            workspace_type: row.workspace_type,
            owner: OwnerInfo {
                user_id: row.owner_user_id,
                display_name: row.owner_display_name,
                email: row.owner_email,
            },
            member_count: row.member_count,
            caller_role: row.caller_role,
        }
    }
}

#[async_trait]
impl StoreTx for PgTx {
    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, display_name, email, password_hash, refresh_token_hash,
                   created_utc, row_version
            FROM users
            WHERE LOWER(email) = LOWER($1)
            FOR UPDATE
            "#,
        )
        .bind(email)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(user)
    }

    async fn find_user_by_id(&mut self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, display_name, email, password_hash, refresh_token_hash,
                   created_utc, row_version
            FROM users
            WHERE user_id = $1
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(user)
    }

    async fn save_user(&mut self, user: &mut User) -> Result<(), StoreError> {
        let version = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO users (user_id, display_name, email, password_hash, refresh_token_hash,
                               created_utc, row_version)
            VALUES ($1, $2, $3, $4, $5, $6, 1)
            ON CONFLICT (user_id) DO UPDATE SET
                display_name = EXCLUDED.display_name,
                email = EXCLUDED.email,
                password_hash = EXCLUDED.password_hash,
                refresh_token_hash = EXCLUDED.refresh_token_hash,
                row_version = users.row_version + 1
            WHERE users.row_version = $7
            RETURNING row_version
            "#,
        )
        .bind(user.user_id)
        .bind(&user.display_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.refresh_token_hash)
        .bind(user.created_utc)
        .bind(user.row_version)
        .fetch_optional(&mut *self.tx)
        .await?;

        user.row_version = version.ok_or_else(|| stale("user"))?;
        Ok(())
    }

    async fn find_workspace_by_id(
        &mut self,
        workspace_id: Uuid,
        filter: RecordFilter,
    ) -> Result<Option<Workspace>, StoreError> {
        let workspace = sqlx::query_as::<_, Workspace>(
            r#"
            SELECT workspace_id, workspace_name, workspace_type, created_utc, deleted_utc,
                   row_version
            FROM workspaces
            WHERE workspace_id = $1 AND ($2 OR deleted_utc IS NULL)
            FOR UPDATE
            "#,
        )
        .bind(workspace_id)
        .bind(filter == RecordFilter::All)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(workspace)
    }

    async fn save_workspace(&mut self, workspace: &mut Workspace) -> Result<(), StoreError> {
        let version = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO workspaces (workspace_id, workspace_name, workspace_type, created_utc,
                                    deleted_utc, row_version)
            VALUES ($1, $2, $3, $4, $5, 1)
            ON CONFLICT (workspace_id) DO UPDATE SET
                workspace_name = EXCLUDED.workspace_name,
                workspace_type = EXCLUDED.workspace_type,
                deleted_utc = EXCLUDED.deleted_utc,
                row_version = workspaces.row_version + 1
            WHERE workspaces.row_version = $6
            RETURNING row_version
            "#,
        )
        .bind(workspace.workspace_id)
        .bind(&workspace.workspace_name)
        .bind(workspace.workspace_type)
        .bind(workspace.created_utc)
        .bind(workspace.deleted_utc)
        .bind(workspace.row_version)
        .fetch_optional(&mut *self.tx)
        .await?;

        workspace.row_version = version.ok_or_else(|| stale("workspace"))?;
        Ok(())
    }

    async fn find_membership(
        &mut self,
        user_id: Uuid,
        workspace_id: Uuid,
        filter: RecordFilter,
    ) -> Result<Option<Membership>, StoreError> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            SELECT membership_id, workspace_id, user_id, member_role, joined_utc, deleted_utc,
                   row_version
            FROM workspace_members
            WHERE user_id = $1 AND workspace_id = $2 AND ($3 OR deleted_utc IS NULL)
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .bind(workspace_id)
        .bind(filter == RecordFilter::All)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(membership)
    }

    async fn save_membership(&mut self, membership: &mut Membership) -> Result<(), StoreError> {
        let version = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO workspace_members (membership_id, workspace_id, user_id, member_role,
                                           joined_utc, deleted_utc, row_version)
            VALUES ($1, $2, $3, $4, $5, $6, 1)
            ON CONFLICT (membership_id) DO UPDATE SET
                member_role = EXCLUDED.member_role,
                joined_utc = EXCLUDED.joined_utc,
                deleted_utc = EXCLUDED.deleted_utc,
                row_version = workspace_members.row_version + 1
            WHERE workspace_members.row_version = $7
            RETURNING row_version
            "#,
        )
        .bind(membership.membership_id)
        .bind(membership.workspace_id)
        .bind(membership.user_id)
        .bind(membership.member_role)
        .bind(membership.joined_utc)
        .bind(membership.deleted_utc)
        .bind(membership.row_version)
        .fetch_optional(&mut *self.tx)
        .await?;

        membership.row_version = version.ok_or_else(|| stale("membership"))?;
        Ok(())
    }

    async fn count_active_memberships(&mut self, workspace_id: Uuid) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM workspace_members WHERE workspace_id = $1 AND deleted_utc IS NULL",
        )
        .bind(workspace_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(count)
    }

    async fn list_workspace_details_for_user(
        &mut self,
        user_id: Uuid,
        workspace_id: Option<Uuid>,
    ) -> Result<Vec<WorkspaceDetails>, StoreError> {
        let rows = sqlx::query_as::<_, DetailsRow>(
            r#"
            SELECT w.workspace_id, w.workspace_name, w.workspace_type,
                   o.user_id AS owner_user_id,
                   ou.display_name AS owner_display_name,
                   ou.email AS owner_email,
                   (SELECT COUNT(*) FROM workspace_members c
                     WHERE c.workspace_id = w.workspace_id AND c.deleted_utc IS NULL) AS member_count,
                   m.member_role AS caller_role
            FROM workspace_members m
            JOIN workspaces w
              ON w.workspace_id = m.workspace_id AND w.deleted_utc IS NULL
            JOIN workspace_members o
              ON o.workspace_id = w.workspace_id AND o.member_role = 'OWNER' AND o.deleted_utc IS NULL
            JOIN users ou ON ou.user_id = o.user_id
            WHERE m.user_id = $1
              AND m.deleted_utc IS NULL
              AND ($2::uuid IS NULL OR w.workspace_id = $2)
            ORDER BY w.created_utc
            "#,
        )
        .bind(user_id)
        .bind(workspace_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(WorkspaceDetails::from).collect())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::WorkspaceType;

/// Body for both create and update.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct WorkspaceRequest {
    #[validate(custom(function = "crate::utils::validation::validate_workspace_name"))]
    #[schema(example = "Eng", min_length = 3, max_length = 50)]
    pub name: String,

    pub workspace_type: WorkspaceType,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateWorkspaceResponse {
    #[schema(example = "Workspace created successfully")]
    pub message: String,
    pub workspace_id: Uuid,
}

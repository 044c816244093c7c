use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::models::Role;

/// Body for add and change-role.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct MemberRoleRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "bob@x.com")]
    pub email: String,

    pub role: Role,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct RemoveMemberQuery {
    #[param(example = "bob@x.com")]
    pub email: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(rename_all = "camelCase")]
pub struct TransferOwnershipQuery {
    #[param(example = "bob@x.com")]
    pub new_owner_email: String,
}

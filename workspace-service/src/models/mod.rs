pub mod membership;
pub mod role;
pub mod user;
pub mod workspace;

pub use membership::Membership;
pub use role::{Permission, Role};
pub use user::{Identity, User};
pub use workspace::{OwnerInfo, Workspace, WorkspaceDetails, WorkspaceType};

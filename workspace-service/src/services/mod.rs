pub mod credential;
pub mod error;
pub mod jwt;
pub mod membership;
pub mod workspace;

pub use credential::CredentialService;
pub use error::DomainError;
pub use jwt::{JwtService, TokenClaims, TokenError, TokenPair, TokenUse};
pub use membership::MembershipService;
pub use workspace::WorkspaceService;

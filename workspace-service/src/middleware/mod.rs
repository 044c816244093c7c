pub mod auth;

pub use auth::{resolve_identity, AuthUser};

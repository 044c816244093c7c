pub mod password;
pub mod validation;

pub use password::{Argon2Hasher, SecretHasher};
pub use validation::{PathParam, QueryParams, ValidatedJson};

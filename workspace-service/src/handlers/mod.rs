pub mod auth;
pub mod member;
pub mod metrics;
pub mod workspace;

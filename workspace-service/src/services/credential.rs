//! Signup, login and refresh-token rotation.

use std::sync::Arc;

use crate::db::Store;
use crate::models::user::normalize_email;
use crate::models::User;
use crate::services::jwt::{fingerprint, fingerprint_matches, JwtService, TokenPair, TokenUse};
use crate::services::DomainError;
use crate::utils::SecretHasher;

#[derive(Clone)]
pub struct CredentialService {
    store: Arc<dyn Store>,
    jwt: JwtService,
    hasher: Arc<dyn SecretHasher>,
}

impl CredentialService {
    pub fn new(store: Arc<dyn Store>, jwt: JwtService, hasher: Arc<dyn SecretHasher>) -> Self {
        Self { store, jwt, hasher }
    }

    /// Registers a user and returns a token pair.
    ///
    /// No refresh fingerprint is stored here, so the returned refresh token is
    /// not honoured until the first login.
    pub async fn signup(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<TokenPair, DomainError> {
        let email = normalize_email(email);
        let password_hash = self.hasher.hash(password)?;

        let mut tx = self.store.begin().await?;
        if tx.find_user_by_email(&email).await?.is_some() {
            tracing::info!(email = %email, "Signup rejected: email already registered");
            return Err(DomainError::DuplicateIdentity);
        }

        let mut user = User::new(name.trim().to_string(), email, password_hash);
        tx.save_user(&mut user).await?;
        let pair = self.jwt.issue_token_pair(&user)?;
        tx.commit().await?;

        tracing::info!(user_id = %user.user_id, "User registered");
        Ok(pair)
    }

    /// Verifies the password and starts a new session, replacing any earlier
    /// refresh token.
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, DomainError> {
        let email = normalize_email(email);
        let mut tx = self.store.begin().await?;

        let Some(mut user) = tx.find_user_by_email(&email).await? else {
            tracing::info!("Login failed: unknown email");
            return Err(DomainError::InvalidCredential);
        };

        if !self.hasher.verify(password, &user.password_hash) {
            tracing::info!(user_id = %user.user_id, "Login failed: password mismatch");
            return Err(DomainError::InvalidCredential);
        }

        let pair = self.jwt.issue_token_pair(&user)?;
        user.refresh_token_hash = Some(fingerprint(&pair.refresh_token));
        tx.save_user(&mut user).await?;
        tx.commit().await?;

        tracing::info!(user_id = %user.user_id, "User logged in");
        Ok(pair)
    }

    /// Exchanges the current refresh token for a new pair. The presented token
    /// stops working once this returns.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, DomainError> {
        let claims = self
            .jwt
            .validate(refresh_token, TokenUse::Refresh)
            .ok_or(DomainError::InvalidToken)?;

        let mut tx = self.store.begin().await?;
        let mut user = tx
            .find_user_by_id(claims.sub)
            .await?
            .ok_or(DomainError::InvalidToken)?;

        let current = user
            .refresh_token_hash
            .as_deref()
            .is_some_and(|stored| fingerprint_matches(refresh_token, stored));
        if !current {
            tracing::warn!(user_id = %user.user_id, "Refresh token is not the current one for this user");
            return Err(DomainError::InvalidToken);
        }

        let pair = self.jwt.issue_token_pair(&user)?;
        user.refresh_token_hash = Some(fingerprint(&pair.refresh_token));
        tx.save_user(&mut user).await?;
        tx.commit().await?;

        tracing::info!(user_id = %user.user_id, "Refresh token rotated");
        Ok(pair)
    }
}

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::{JwtConfig, MAX_ACCESS_TOKEN_EXPIRY_MINUTES, MAX_REFRESH_TOKEN_EXPIRY_DAYS};
use crate::models::{Identity, User};

const ALGORITHM: Algorithm = Algorithm::HS512;

/// Which half of a token pair a token is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenUse {
    Access,
    Refresh,
}

/// Claims carried by both access and refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user ID)
    pub sub: Uuid,
    pub email: String,
    pub token_use: TokenUse,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Unique per token, so two tokens minted in the same second still differ.
    pub jti: Uuid,
}

impl TokenClaims {
    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.sub,
            email: self.email.clone(),
        }
    }
}

/// Token pair returned to the client
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    #[schema(example = "Bearer")]
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Malformed token: {0}")]
    Malformed(String),
}

/// Issues and validates HS512 bearer tokens.
///
/// Validation is stateless: nothing here touches storage.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Result<Self, anyhow::Error> {
        let secret = config.secret.expose_secret().as_bytes();
        if secret.is_empty() {
            return Err(anyhow::anyhow!("JWT secret must not be empty"));
        }

        let access_ttl = Some(config.access_token_expiry_minutes)
            .filter(|m| (1..=MAX_ACCESS_TOKEN_EXPIRY_MINUTES).contains(m))
            .and_then(Duration::try_minutes)
            .ok_or_else(|| anyhow::anyhow!("Access token lifetime out of range"))?;
        let refresh_ttl = Some(config.refresh_token_expiry_days)
            .filter(|d| (1..=MAX_REFRESH_TOKEN_EXPIRY_DAYS).contains(d))
            .and_then(Duration::try_days)
            .ok_or_else(|| anyhow::anyhow!("Refresh token lifetime out of range"))?;

        tracing::info!("JWT service initialized with HS512 signing");

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl,
            refresh_ttl,
        })
    }

    fn sign(&self, user: &User, token_use: TokenUse, ttl: Duration) -> Result<String, anyhow::Error> {
        let now = Utc::now();
        let claims = TokenClaims {
            sub: user.user_id,
            email: user.email.clone(),
            token_use,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4(),
        };

        encode(&Header::new(ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode {:?} token: {}", token_use, e))
    }

    pub fn issue_access_token(&self, user: &User) -> Result<String, anyhow::Error> {
        self.sign(user, TokenUse::Access, self.access_ttl)
    }

    pub fn issue_refresh_token(&self, user: &User) -> Result<String, anyhow::Error> {
        self.sign(user, TokenUse::Refresh, self.refresh_ttl)
    }

    pub fn issue_token_pair(&self, user: &User) -> Result<TokenPair, anyhow::Error> {
        Ok(TokenPair {
            access_token: self.issue_access_token(user)?,
            refresh_token: self.issue_refresh_token(user)?,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry_seconds(),
        })
    }

    /// Verifies signature, expiry and token use. Any failure is `None`:
    /// callers treat an invalid token as no token at all.
    pub fn validate(&self, token: &str, expected: TokenUse) -> Option<TokenClaims> {
        let validation = Validation::new(ALGORITHM);

        match decode::<TokenClaims>(token, &self.decoding_key, &validation) {
            Ok(data) if data.claims.token_use == expected => Some(data.claims),
            Ok(data) => {
                tracing::debug!(token_use = ?data.claims.token_use, expected = ?expected, "Token used for the wrong purpose");
                None
            }
            Err(e) => {
                tracing::debug!(error = %e, "Token rejected");
                None
            }
        }
    }

    /// Reads the subject without checking signature or expiry.
    pub fn extract_subject(&self, token: &str) -> Result<Identity, TokenError> {
        let mut validation = Validation::new(ALGORITHM);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)
            .map(|data| data.claims.identity())
            .map_err(|e| TokenError::Malformed(e.to_string()))
    }

    pub fn access_token_expiry_seconds(&self) -> i64 {
        self.access_ttl.num_seconds()
    }
}

/// SHA-256 hex fingerprint persisted in place of a refresh token.
pub fn fingerprint(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Constant-time check of a presented token against a stored fingerprint.
pub fn fingerprint_matches(token: &str, stored: &str) -> bool {
    fingerprint(token).as_bytes().ct_eq(stored.as_bytes()).into()
}

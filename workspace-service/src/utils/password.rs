use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

/// One-way hash/verify pair for user secrets.
pub trait SecretHasher: Send + Sync {
    fn hash(&self, secret: &str) -> Result<String, anyhow::Error>;

    /// `false` on mismatch or on an unparseable stored hash.
    fn verify(&self, secret: &str, hash: &str) -> bool;
}

/// Argon2id hasher. Salt is generated per hash and embedded in the PHC string.
#[derive(Clone, Default)]
pub struct Argon2Hasher {
    params: Option<Params>,
}

impl Argon2Hasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Custom cost parameters (memory KiB, iterations, parallelism).
    pub fn with_cost(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self, anyhow::Error> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|e| anyhow::anyhow!("Invalid Argon2 parameters: {}", e))?;
        Ok(Self {
            params: Some(params),
        })
    }

    fn argon2(&self) -> Argon2<'static> {
        match &self.params {
            Some(params) => Argon2::new(Algorithm::Argon2id, Version::V0x13, params.clone()),
            None => Argon2::default(),
        }
    }
}

impl SecretHasher for Argon2Hasher {
    fn hash(&self, secret: &str) -> Result<String, anyhow::Error> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2()
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
            .to_string();

        Ok(hash)
    }

    fn verify(&self, secret: &str, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            tracing::warn!("Stored password hash is not a valid PHC string");
            return false;
        };

        // Parameters are read from the PHC string, so any cost verifies.
        self.argon2()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok()
    }
}

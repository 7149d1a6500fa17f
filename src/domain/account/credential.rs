use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};
use std::fmt;

use super::errors::AccountError;

// ============================================================================
// Credential - one-way hashed secret
// ============================================================================
//
// Holds an argon2 PHC string (algorithm, parameters, salt and digest).
// The clear-text password never outlives the hashing call.
//
// ============================================================================

#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Hash `password` with a fresh random salt.
    ///
    /// Argon2 is deliberately slow, so the work runs on the blocking pool
    /// instead of stalling the async worker that serves the request.
    pub async fn hash(password: String) -> Result<Self, AccountError> {
        tokio::task::spawn_blocking(move || Self::hash_blocking(&password))
            .await
            .map_err(|e| AccountError::CredentialHashing(e.to_string()))?
    }

    fn hash_blocking(password: &str) -> Result<Self, AccountError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AccountError::CredentialHashing(e.to_string()))?;
        Ok(Self(hash.to_string()))
    }

    /// Wrap a hash loaded from storage.
    pub fn from_hash(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    /// The service never authenticates; tests use this to check stored hashes.
    #[cfg(test)]
    pub fn verify(&self, password: &str) -> bool {
        use argon2::password_hash::{PasswordHash, PasswordVerifier};

        match PasswordHash::new(&self.0) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

//! One-way credential storage.
//!
//! Credentials are Argon2id PHC strings (`$argon2id$v=19$m=..,t=..,p=..$<salt>$<key>`), so the
//! algorithm, cost parameters and salt travel with the hash and verification needs no external
//! state even after the configured parameters change.

use std::{fmt, sync::Arc};

use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};

/// Plaintext hashed once at construction; unknown-account logins verify against it.
const DUMMY_PASSWORD: &str = "centralauth-timing-equalizer";

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashingParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingParams {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("invalid password hashing parameters: {0}")]
    InvalidParams(String),
    #[error("failed to hash password: {0}")]
    Hash(String),
}

/// Hashes and verifies passwords with a fixed, process-wide parameter set.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
    dummy_hash: Arc<str>,
}

impl PasswordHasher {
    pub fn new(params: HashingParams) -> Result<Self, PasswordError> {
        let params = Params::new(
            params.memory_kib,
            params.iterations,
            params.parallelism,
            None,
        )
        .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut hasher = Self {
            argon2,
            dummy_hash: Arc::from(""),
        };
        hasher.dummy_hash = Arc::from(hasher.hash(DUMMY_PASSWORD)?);
        Ok(hasher)
    }

    /// Derives a credential from `password` and a fresh random salt.
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PasswordError::Hash(e.to_string()))
    }

    /// Re-derives the key with the salt and parameters embedded in `credential`.
    ///
    /// The key comparison is constant time. A credential that cannot be parsed never verifies.
    pub fn verify(&self, credential: &str, password: &str) -> bool {
        let parsed = match PasswordHash::new(credential) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!(error = %err, "Stored credential is malformed");
                return false;
            }
        };

        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => true,
            Err(argon2::password_hash::Error::Password) => false,
            Err(err) => {
                tracing::warn!(error = %err, "Stored credential could not be verified");
                false
            }
        }
    }

    /// Spends the same work as a real verification and discards the result.
    pub fn verify_dummy(&self, password: &str) {
        let _ = self.verify(&self.dummy_hash, password);
    }
}

impl fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("params", self.argon2.params())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap_hasher() -> PasswordHasher {
        PasswordHasher::new(HashingParams {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        })
        .expect("build hasher")
    }

    #[test]
    fn hash_and_verify_roundtrip() {
        let hasher = cheap_hasher();
        let hash = hasher.hash("S3cr3t!pass").expect("hash should succeed");
        assert!(hasher.verify(&hash, "S3cr3t!pass"));
        assert!(!hasher.verify(&hash, "wrong-pass"));
    }

    #[test]
    fn same_password_hashes_differently_but_both_verify() {
        let hasher = cheap_hasher();
        let first = hasher.hash("password123").expect("hash");
        let second = hasher.hash("password123").expect("hash");
        assert_ne!(first, second);
        assert!(hasher.verify(&first, "password123"));
        assert!(hasher.verify(&second, "password123"));
    }

    #[test]
    fn credential_is_self_describing() {
        let hasher = cheap_hasher();
        let hash = hasher.hash("password123").expect("hash");
        assert!(hash.starts_with("$argon2id$v=19$m=64,t=1,p=1$"));

        // A hasher with different parameters still verifies the older credential.
        let other = PasswordHasher::new(HashingParams {
            memory_kib: 128,
            iterations: 2,
            parallelism: 1,
        })
        .expect("build hasher");
        assert!(other.verify(&hash, "password123"));
    }

    #[test]
    fn malformed_credentials_fail_closed() {
        let hasher = cheap_hasher();
        assert!(!hasher.verify("", "password123"));
        assert!(!hasher.verify("not-a-phc-string", "password123"));
        assert!(!hasher.verify("$argon2id$v=19$m=64,t=1,p=1$AAAA", "password123"));
    }

    #[test]
    fn invalid_params_are_rejected() {
        let result = PasswordHasher::new(HashingParams {
            memory_kib: 0,
            iterations: 0,
            parallelism: 0,
        });
        assert!(matches!(result, Err(PasswordError::InvalidParams(_))));
    }
}

//! Argon2id password hashing and verification.
//!
//! All password hashes use the Argon2id variant with a cryptographically random
//! salt generated via [`OsRng`]. The PHC string format is used for storage so
//! that algorithm parameters and salt are embedded in the hash itself, which
//! lets cost parameters change without invalidating existing hashes.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl PasswordConfig {
    /// | Env Var                     | Default |
    /// |-----------------------------|---------|
    /// | `PASSWORD_HASH_MEMORY_KIB`  | `19456` |
    /// | `PASSWORD_HASH_ITERATIONS`  | `2`     |
    /// | `PASSWORD_HASH_PARALLELISM` | `1`     |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let read = |name: &str, default: u32| -> u32 {
            std::env::var(name)
                .map(|v| v.parse().unwrap_or_else(|_| panic!("{name} must be a valid u32")))
                .unwrap_or(default)
        };
        Self {
            memory_kib: read("PASSWORD_HASH_MEMORY_KIB", defaults.memory_kib),
            iterations: read("PASSWORD_HASH_ITERATIONS", defaults.iterations),
            parallelism: read("PASSWORD_HASH_PARALLELISM", defaults.parallelism),
        }
    }
}

/// Hashes new passwords with the configured cost and verifies stored hashes.
#[derive(Clone)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
    /// Hash compared against when the account does not exist, so that an
    /// unknown email costs as much as a wrong password.
    dummy_hash: String,
}

impl Argon2Hasher {
    pub fn new(config: PasswordConfig) -> Result<Self, argon2::password_hash::Error> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let dummy_hash = hash_with(&argon2, "dummy-password-for-timing")?;
        Ok(Self { argon2, dummy_hash })
    }

    /// Hash a plaintext password with a fresh random salt.
    ///
    /// Returns the PHC-formatted hash string.
    pub fn hash(&self, password: &str) -> Result<String, argon2::password_hash::Error> {
        hash_with(&self.argon2, password)
    }

    /// Verify a plaintext password against a stored PHC-formatted hash.
    ///
    /// Returns `Ok(true)` if the password matches, `Ok(false)` if it does not.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
        let parsed_hash = PasswordHash::new(hash)?;
        match self.argon2.verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Burn one verification against the dummy hash.
    pub fn verify_dummy(&self, password: &str) {
        let _ = self.verify(password, &self.dummy_hash);
    }
}

fn hash_with(argon2: &Argon2<'_>, password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimum legal cost so the tests stay fast.
    fn cheap() -> Argon2Hasher {
        Argon2Hasher::new(PasswordConfig {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        })
        .expect("params are valid")
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = cheap();
        let hash = hasher.hash("correct-horse-battery-staple").expect("hashing should succeed");

        assert!(hash.starts_with("$argon2id$"), "expected argon2id PHC prefix");
        assert!(hasher.verify("correct-horse-battery-staple", &hash).unwrap());
    }

    #[test]
    fn test_wrong_password_fails() {
        let hasher = cheap();
        let hash = hasher.hash("real-password").unwrap();
        assert!(!hasher.verify("wrong-password", &hash).unwrap());
    }

    #[test]
    fn test_same_password_gets_distinct_salts() {
        let hasher = cheap();
        assert_ne!(hasher.hash("same").unwrap(), hasher.hash("same").unwrap());
    }

    #[test]
    fn test_hash_from_other_params_still_verifies() {
        let stronger = Argon2Hasher::new(PasswordConfig {
            memory_kib: 16,
            iterations: 2,
            parallelism: 1,
        })
        .unwrap();
        let hash = stronger.hash("pw-123456").unwrap();
        assert!(cheap().verify("pw-123456", &hash).unwrap());
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        assert!(cheap().verify("pw", "not-a-phc-string").is_err());
    }

    #[test]
    fn test_invalid_params_are_rejected() {
        let result = Argon2Hasher::new(PasswordConfig {
            memory_kib: 8,
            iterations: 0,
            parallelism: 1,
        });
        assert!(result.is_err());
    }
}

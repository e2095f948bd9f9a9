//! # gt-auth-simple
//!
//! Argon2-based implementation of `AuthProvider`.
//! Handles password storage and opaque session tokens.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use gt_core::traits::AuthProvider;
use rand::RngCore;
use sha2::{Digest, Sha256};

pub struct SimpleAuthProvider {
    /// Secret salt mixed into generated tokens (e.g., from an environment
    /// variable). Tokens are persisted, so rotating the salt only affects
    /// tokens issued afterwards.
    session_salt: String,
}

impl SimpleAuthProvider {
    /// Accepts a salt string (e.g., from an environment variable)
    pub fn new(salt: &str) -> Self {
        Self {
            session_salt: salt.to_string(),
        }
    }
}

impl AuthProvider for SimpleAuthProvider {
    /// Hashes a password with a per-password random salt, PHC format.
    fn hash_password(&self, password: &str) -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("argon2 hashing failed: {}", e))?;
        Ok(hash.to_string())
    }

    /// Verifies a password against a stored Argon2 hash. An unparseable
    /// hash verifies as false rather than erroring.
    fn verify_password(&self, password: &str, hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(p) => p,
            Err(_) => return false,
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Generates an opaque token: SHA-256 over the session salt, the
    /// username, and 16 random bytes, hex-encoded.
    fn generate_token(&self, username: &str) -> String {
        let mut nonce = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut nonce);

        let mut hasher = Sha256::new();
        hasher.update(self.session_salt.as_bytes());
        hasher.update(username.as_bytes());
        hasher.update(nonce);
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_roundtrip() {
        let auth = SimpleAuthProvider::new("test-salt");
        let hash = auth.hash_password("pouetpouet").unwrap();
        assert!(auth.verify_password("pouetpouet", &hash));
        assert!(!auth.verify_password("wrong", &hash));
    }

    #[test]
    fn garbage_hash_never_verifies() {
        let auth = SimpleAuthProvider::new("test-salt");
        assert!(!auth.verify_password("anything", "not-a-phc-hash"));
    }

    #[test]
    fn tokens_are_unique_per_call() {
        let auth = SimpleAuthProvider::new("test-salt");
        let a = auth.generate_token("toto");
        let b = auth.generate_token("toto");
        assert_ne!(a, b);
        // 32 bytes of SHA-256, hex-encoded.
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }
}

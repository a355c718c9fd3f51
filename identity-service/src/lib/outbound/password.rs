use async_trait::async_trait;
use auth::PasswordHasher;

use crate::domain::subject::ports::PasswordHashing;
use crate::subject::errors::AuthError;

/// Argon2id adapter for the password hashing port.
///
/// Both operations run on the blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2PasswordHashing {
    hasher: PasswordHasher,
}

impl Argon2PasswordHashing {
    pub fn new() -> Self {
        Self {
            hasher: PasswordHasher::new(),
        }
    }
}

#[async_trait]
impl PasswordHashing for Argon2PasswordHashing {
    async fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        let hasher = self.hasher;
        let plaintext = plaintext.to_owned();

        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|e| AuthError::Internal(format!("Password hashing task failed: {}", e)))?
            .map_err(|e| AuthError::Internal(e.to_string()))
    }

    async fn verify(&self, plaintext: &str, hash: &str) -> bool {
        let hasher = self.hasher;
        let plaintext = plaintext.to_owned();
        let hash = hash.to_owned();

        match tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &hash)).await {
            Ok(matches) => matches,
            Err(e) => {
                tracing::error!(error = %e, "Password verification task failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_and_verify_on_blocking_pool() {
        let passwords = Argon2PasswordHashing::new();

        let hash = passwords.hash("Secret123!").await.expect("Hashing failed");

        assert_ne!(hash, "Secret123!");
        assert!(passwords.verify("Secret123!", &hash).await);
        assert!(!passwords.verify("WrongPass!", &hash).await);
        assert!(!passwords.verify("Secret123!", "not-a-phc-string").await);
    }
}

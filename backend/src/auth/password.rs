//! Password hashing with bcrypt
//!
//! bcrypt is CPU bound, so both operations run on the blocking pool instead
//! of an async worker thread.

use tokio::task;

use super::AuthError;

/// Hash a plaintext password for storage
pub async fn hash_password(password: &str) -> Result<String, AuthError> {
    let password = password.to_owned();
    task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| AuthError::PasswordHash(e.to_string()))?
        .map_err(|e| AuthError::PasswordHash(e.to_string()))
}

/// Check a plaintext password against a stored hash
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let password = password.to_owned();
    let hash = hash.to_owned();
    task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AuthError::PasswordHash(e.to_string()))?
        .map_err(|e| AuthError::PasswordHash(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hash = hash_password("correct horse battery").await.unwrap();
        assert_ne!(hash, "correct horse battery");
        assert!(verify_password("correct horse battery", &hash).await.unwrap());
        assert!(!verify_password("wrong password", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_malformed_hash() {
        assert!(verify_password("anything", "not-a-bcrypt-hash").await.is_err());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_hashing_yields_to_other_tasks() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;

        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        tokio::spawn(async move { flag.store(true, Ordering::SeqCst) });

        let hash = hash_password("correct horse battery").await.unwrap();
        assert!(ran.load(Ordering::SeqCst));
        assert!(hash.starts_with("$2"));
    }
}

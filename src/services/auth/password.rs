use bcrypt::DEFAULT_COST;
use tracing::error;

use crate::error::ApiError;

/// Hash a password with bcrypt on the blocking thread pool.
///
/// bcrypt is deliberately slow; running it inline would stall the async
/// runtime under load.
pub async fn hash(password: &str) -> Result<String, ApiError> {
    let password = password.to_string();

    tokio::task::spawn_blocking(move || bcrypt::hash(password, DEFAULT_COST))
        .await
        .map_err(|e| {
            error!(error = %e, "password hashing task failed");
            ApiError::Internal
        })?
        .map_err(|e| {
            error!(error = %e, "password hashing failed");
            ApiError::Internal
        })
}

/// Verify a password against a stored bcrypt hash.
pub async fn verify(password: &str, hashed: &str) -> Result<bool, ApiError> {
    let password = password.to_string();
    let hashed = hashed.to_string();

    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hashed))
        .await
        .map_err(|e| {
            error!(error = %e, "password verification task failed");
            ApiError::Internal
        })?
        .map_err(|e| {
            error!(error = %e, "password verification failed");
            ApiError::Internal
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn correct_password_verifies_and_wrong_password_does_not() {
        let hashed = hash("hunter2hunter2").await.unwrap();

        assert!(verify("hunter2hunter2", &hashed).await.unwrap());
        assert!(!verify("wrong-password", &hashed).await.unwrap());
    }
}

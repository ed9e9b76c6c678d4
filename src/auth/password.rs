use crate::error::AppError;
use bcrypt::{hash, verify};

/// Hashes a password on the blocking pool. `cost` is the bcrypt work factor.
pub async fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
        .map_err(AppError::from)
}

/// Verifies a password against a stored hash on the blocking pool.
///
/// A malformed stored hash is reported as a mismatch rather than an error, so it can
/// never be told apart from a wrong password.
pub async fn verify_password(password: &str, hashed_password: &str) -> Result<bool, AppError> {
    let password = password.to_owned();
    let hashed_password = hashed_password.to_owned();
    let verified = tokio::task::spawn_blocking(move || verify(password, &hashed_password))
        .await
        .map_err(|e| AppError::Internal(format!("Password verification task failed: {}", e)))?;
    match verified {
        Ok(matches) => Ok(matches),
        Err(e) => {
            log::warn!("Stored password hash could not be parsed: {}", e);
            Ok(false)
        }
    }
}

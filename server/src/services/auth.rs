//! Email + password auth: registration, credential checks, digests.
//!
//! DESIGN
//! ======
//! Passwords are stored as `salt$sha256(salt || password)` with a random
//! per-user salt. New users get a presence color from the shared cursor
//! palette; collisions are accepted.

use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::services::session::bytes_to_hex;

/// Presence colors assigned at registration. Matches the client palette.
const USER_COLORS: [&str; 7] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#96CEB4", "#FFEAA7", "#DDA0DD", "#98D8C8",
];

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("email already registered")]
    EmailTaken,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Hash a password with a fresh random salt.
#[must_use]
pub fn hash_password(password: &str) -> String {
    let salt: [u8; 16] = rand::rng().random();
    let salt_hex = bytes_to_hex(&salt);
    format!("{salt_hex}${}", digest(&salt_hex, password))
}

/// Constant-shape verification against a stored `salt$digest` value.
#[must_use]
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_hex, expected)) = stored.split_once('$') else {
        return false;
    };
    digest(salt_hex, password) == expected
}

fn digest(salt_hex: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt_hex.as_bytes());
    hasher.update(password.as_bytes());
    bytes_to_hex(&hasher.finalize())
}

fn pick_color() -> String {
    let idx = rand::rng().random_range(0..USER_COLORS.len());
    USER_COLORS[idx].to_string()
}

/// Register a new user and return its id.
///
/// # Errors
///
/// Returns `EmailTaken` on a duplicate email, or a database error.
pub async fn register_user(pool: &PgPool, email: &str, name: &str, password: &str) -> Result<Uuid, AuthError> {
    let id = Uuid::new_v4();
    let result = sqlx::query(
        "INSERT INTO users (id, email, name, password_digest, color)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (email) DO NOTHING",
    )
    .bind(id)
    .bind(email)
    .bind(name)
    .bind(hash_password(password))
    .bind(pick_color())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AuthError::EmailTaken);
    }
    Ok(id)
}

/// Check credentials and return the user id on success.
///
/// # Errors
///
/// Returns `InvalidCredentials` for an unknown email or a wrong password.
pub async fn authenticate(pool: &PgPool, email: &str, password: &str) -> Result<Uuid, AuthError> {
    let row = sqlx::query("SELECT id, password_digest FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    let stored: String = row.get("password_digest");
    if !verify_password(password, &stored) {
        return Err(AuthError::InvalidCredentials);
    }
    Ok(row.get("id"))
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;

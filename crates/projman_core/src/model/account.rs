//! User accounts and profiles.

use super::{check_identifier, now_epoch_ms, EntityValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable user identifier.
pub type UserId = Uuid;

/// Maximum username length in characters.
pub const USERNAME_MAX_LEN: usize = 30;

/// Registered user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub uuid: UserId,
    pub username: String,
    /// Argon2 PHC string. Never serialized to callers.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: i64,
}

impl User {
    /// Creates a user with a generated id and an already hashed password.
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            username: username.into(),
            password_hash: password_hash.into(),
            created_at: now_epoch_ms(),
        }
    }

    pub fn validate(&self) -> Result<(), EntityValidationError> {
        check_identifier("username", &self.username, USERNAME_MAX_LEN)?;
        if self.password_hash.is_empty() {
            return Err(EntityValidationError::EmptyField("password_hash"));
        }
        Ok(())
    }
}

/// Per-user preferences record created alongside every account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_uuid: UserId,
    pub created_at: i64,
}

impl UserProfile {
    pub fn for_user(user: &User) -> Self {
        Self {
            user_uuid: user.uuid,
            created_at: now_epoch_ms(),
        }
    }
}

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use sqlx::FromRow;
use uuid::Uuid;

/// Server-side record backing an issued refresh token
#[derive(Debug, Clone, FromRow)]
pub struct RefreshToken {
    /// Matches the `jti` claim of the issued token
    pub id: Uuid,
    pub user_id: Uuid,
    /// SHA-256 hex of the token string
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl RefreshToken {
    pub fn new_with_id(id: Uuid, user_id: Uuid, token: &str, expires_at: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id,
            token_hash: Self::hash_token(token),
            expires_at,
            created_at: Utc::now(),
        }
    }

    pub fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Shorthand for records that expire `days` from now.
    pub fn expiring_in_days(id: Uuid, user_id: Uuid, token: &str, days: i64) -> Self {
        Self::new_with_id(id, user_id, token, Utc::now() + Duration::days(days))
    }
}

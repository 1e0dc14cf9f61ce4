use chrono::{Duration, Utc};
use rand::Rng;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{RefreshToken, User};
use crate::services::store::{RefreshTokenStore, UserStore};
use crate::services::{JwtService, ServiceError, Store};

/// Issues, refreshes and revokes tokens, and manages one-time verification codes.
#[derive(Clone)]
pub struct TokenService {
    store: Arc<dyn Store>,
    jwt: JwtService,
    verification_code_expiry: Duration,
}

impl TokenService {
    pub fn new(store: Arc<dyn Store>, jwt: JwtService, verification_code_expiry_minutes: i64) -> Self {
        Self {
            store,
            jwt,
            verification_code_expiry: Duration::minutes(verification_code_expiry_minutes),
        }
    }

    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    pub fn issue_access_token(&self, user: &User) -> Result<String, ServiceError> {
        Ok(self.jwt.generate_access_token(user.id, &user.username)?)
    }

    /// Signs a refresh token and persists its hashed record.
    pub async fn issue_refresh_token(&self, user: &User) -> Result<String, ServiceError> {
        let signed = self.jwt.generate_refresh_token(user.id, &user.username)?;

        let id = Uuid::parse_str(&signed.claims.jti)
            .map_err(|e| anyhow::anyhow!("Refresh token id is not a UUID: {}", e))?;
        let expires_at = chrono::DateTime::from_timestamp(signed.claims.exp, 0)
            .ok_or_else(|| anyhow::anyhow!("Refresh token expiry out of range"))?;

        let record = RefreshToken::new_with_id(id, user.id, &signed.token, expires_at);
        self.store.insert_refresh_token(&record).await?;

        tracing::debug!(user_id = %user.id, token_id = %record.id, "Refresh token issued");
        Ok(signed.token)
    }

    /// Returns `(access_token, refresh_token)`.
    pub async fn issue_session(&self, user: &User) -> Result<(String, String), ServiceError> {
        let access_token = self.issue_access_token(user)?;
        let refresh_token = self.issue_refresh_token(user).await?;
        Ok((access_token, refresh_token))
    }

    /// Mints a new access token for a live refresh token. `None` when the token
    /// is malformed, expired, of the wrong type, or has no unexpired record.
    /// The refresh token itself is not rotated.
    pub async fn refresh(&self, raw: &str) -> Result<Option<String>, ServiceError> {
        let claims = match self.jwt.validate_refresh_token(raw) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!("Refresh token rejected: {}", e);
                return Ok(None);
            }
        };

        let Some(record) = self
            .store
            .find_refresh_token_by_hash(&RefreshToken::hash_token(raw))
            .await?
        else {
            tracing::debug!(token_id = %claims.jti, "Refresh token has no record");
            return Ok(None);
        };

        if record.is_expired() {
            tracing::debug!(token_id = %record.id, "Refresh token record expired");
            return Ok(None);
        }

        let Some(user_id) = claims.user_id() else {
            return Ok(None);
        };
        if user_id != record.user_id {
            tracing::warn!(token_id = %record.id, "Refresh token subject does not match its record");
            return Ok(None);
        }

        let access_token = self.jwt.generate_access_token(user_id, &claims.username)?;
        Ok(Some(access_token))
    }

    /// Deletes every record for this token. Unknown tokens are not an error.
    pub async fn revoke(&self, raw: &str) -> Result<(), ServiceError> {
        let removed = self
            .store
            .delete_refresh_tokens_by_hash(&RefreshToken::hash_token(raw))
            .await?;
        tracing::debug!(removed, "Refresh token revoked");
        Ok(())
    }

    pub async fn purge_expired(&self) -> Result<u64, ServiceError> {
        Ok(self.store.delete_expired_refresh_tokens(Utc::now()).await?)
    }

    /// Stores a fresh six-digit code on the user and returns it.
    pub async fn issue_verification_code(&self, user_id: Uuid) -> Result<String, ServiceError> {
        let code = rand::thread_rng().gen_range(100_000..=999_999u32).to_string();
        let expires_at = Utc::now() + self.verification_code_expiry;

        let updated = self
            .store
            .set_verification_code(user_id, Some(&code), Some(expires_at))
            .await?;
        if !updated {
            return Err(ServiceError::UserNotFound);
        }

        Ok(code)
    }

    /// Single use: a matching, unexpired code is cleared before returning true.
    pub async fn verify_code(&self, user_id: Uuid, code: &str) -> Result<bool, ServiceError> {
        Ok(self
            .store
            .consume_verification_code(user_id, code, Utc::now())
            .await?)
    }
}

use secrecy::ExposeSecret;

use crate::config::SeedConfig;
use crate::models::User;
use crate::services::store::UserStore;
use crate::services::{ServiceError, Store};
use crate::utils::{hash_password, Password};

/// Creates the admin account, or resets its password, when both
/// ADMIN_USERNAME and ADMIN_PASSWORD are configured.
pub async fn seed_admin(store: &dyn Store, config: &SeedConfig) -> Result<Option<User>, ServiceError> {
    let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) else {
        tracing::debug!("Admin seed skipped");
        return Ok(None);
    };

    let password_hash = hash_password(&Password::new(password.expose_secret().clone()))
        .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Password hashing error: {}", e)))?;

    let user = store
        .upsert_user_password(&User::new(username.clone(), password_hash.into_string()))
        .await?;

    tracing::info!(user_id = %user.id, username = %user.username, "Admin user seeded");
    Ok(Some(user))
}

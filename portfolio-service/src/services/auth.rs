use std::sync::Arc;
use uuid::Uuid;

use crate::config::TwoFactorConfig;
use crate::dtos::auth::{
    AuthResponse, LoginRequest, LoginResponse, LogoutRequest, PendingTwoFactorResponse,
    RefreshRequest, RefreshResponse, RegisterRequest, VerifyTwoFactorRequest,
};
use crate::models::User;
use crate::services::store::UserStore;
use crate::services::{EmailProvider, ServiceError, Store, TokenService};
use crate::utils::{hash_password, verify_password, Password, PasswordHashString};

pub const VERIFICATION_SENT_MESSAGE: &str = "Verification code sent to your email";

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Store>,
    tokens: TokenService,
    email: Arc<dyn EmailProvider>,
    two_factor: TwoFactorConfig,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn Store>,
        tokens: TokenService,
        email: Arc<dyn EmailProvider>,
        two_factor: TwoFactorConfig,
    ) -> Self {
        Self {
            store,
            tokens,
            email,
            two_factor,
        }
    }

    async fn session_for(&self, user: &User) -> Result<AuthResponse, ServiceError> {
        let (access_token, refresh_token) = self.tokens.issue_session(user).await?;
        Ok(AuthResponse {
            access_token,
            refresh_token,
            user: user.sanitized(),
        })
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<AuthResponse, ServiceError> {
        if self
            .store
            .find_user_by_username(&req.username)
            .await?
            .is_some()
        {
            return Err(ServiceError::UsernameTaken);
        }

        let password_hash = hash_password(&Password::new(req.password)).map_err(|e| {
            ServiceError::Internal(anyhow::anyhow!("Password hashing error: {}", e))
        })?;

        let user = User::new(req.username, password_hash.into_string());
        // The unique index still decides concurrent registrations
        self.store.insert_user(&user).await?;

        tracing::info!(user_id = %user.id, "User registered");
        self.session_for(&user).await
    }

    pub async fn login(&self, req: LoginRequest) -> Result<LoginResponse, ServiceError> {
        let user = self
            .store
            .find_user_by_username(&req.username)
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        verify_password(
            &Password::new(req.password),
            &PasswordHashString::new(user.password_hash.clone()),
        )
        .map_err(|_| ServiceError::InvalidCredentials)?;

        if !self.two_factor.enabled {
            tracing::info!(user_id = %user.id, "User logged in");
            return Ok(LoginResponse::Session(self.session_for(&user).await?));
        }

        let recipient = self.two_factor.email.as_deref().ok_or_else(|| {
            ServiceError::Internal(anyhow::anyhow!(
                "Two-factor authentication is enabled but TWO_FACTOR_EMAIL is not set"
            ))
        })?;

        let code = self.tokens.issue_verification_code(user.id).await?;
        self.email
            .send_verification_code(recipient, &code)
            .await
            .map_err(|e| ServiceError::EmailError(e.to_string()))?;

        tracing::info!(user_id = %user.id, "Verification code sent");
        Ok(LoginResponse::PendingTwoFactor(PendingTwoFactorResponse {
            pending_2fa: true,
            user_id: user.id.to_string(),
            message: VERIFICATION_SENT_MESSAGE.to_string(),
        }))
    }

    pub async fn verify_two_factor(
        &self,
        req: VerifyTwoFactorRequest,
    ) -> Result<AuthResponse, ServiceError> {
        let user_id =
            Uuid::parse_str(&req.user_id).map_err(|_| ServiceError::InvalidVerificationCode)?;

        if !self.tokens.verify_code(user_id, &req.code).await? {
            tracing::warn!(user_id = %user_id, "Verification code rejected");
            return Err(ServiceError::InvalidVerificationCode);
        }

        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(ServiceError::UserNotFound)?;

        tracing::info!(user_id = %user.id, "User logged in with verification code");
        self.session_for(&user).await
    }

    pub async fn refresh(&self, req: RefreshRequest) -> Result<RefreshResponse, ServiceError> {
        let raw = req
            .refresh_token
            .filter(|t| !t.is_empty())
            .ok_or(ServiceError::InvalidRefreshToken)?;

        let access_token = self
            .tokens
            .refresh(&raw)
            .await?
            .ok_or(ServiceError::InvalidRefreshToken)?;

        Ok(RefreshResponse { access_token })
    }

    pub async fn logout(&self, req: LogoutRequest) -> Result<(), ServiceError> {
        if let Some(raw) = req.refresh_token.filter(|t| !t.is_empty()) {
            self.tokens.revoke(&raw).await?;
        }
        Ok(())
    }
}

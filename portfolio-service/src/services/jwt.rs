use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtConfig;

/// Distinguishes access from refresh tokens signed with the same secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user ID)
    pub sub: String,
    pub username: String,
    pub typ: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// JWT ID; for refresh tokens this is the store record id
    pub jti: String,
}

impl TokenClaims {
    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }
}

/// A freshly signed refresh token and the claims it carries
pub struct SignedRefreshToken {
    pub token: String,
    pub claims: TokenClaims,
}

/// HS256 signer/verifier for access and refresh tokens
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expiry: Duration,
    refresh_token_expiry: Duration,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Result<Self, anyhow::Error> {
        let secret = config.secret.expose_secret().as_bytes();
        if secret.is_empty() {
            return Err(anyhow::anyhow!("JWT secret must not be empty"));
        }

        tracing::info!("JWT service initialized with HS256 secret");

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_token_expiry: Duration::minutes(config.access_token_expiry_minutes),
            refresh_token_expiry: Duration::days(config.refresh_token_expiry_days),
        })
    }

    fn sign(
        &self,
        user_id: Uuid,
        username: &str,
        typ: TokenType,
        lifetime: Duration,
    ) -> Result<(String, TokenClaims), anyhow::Error> {
        let now = Utc::now();
        let claims = TokenClaims {
            sub: user_id.to_string(),
            username: username.to_string(),
            typ,
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode {:?} token: {}", typ, e))?;

        Ok((token, claims))
    }

    pub fn generate_access_token(
        &self,
        user_id: Uuid,
        username: &str,
    ) -> Result<String, anyhow::Error> {
        self.sign(user_id, username, TokenType::Access, self.access_token_expiry)
            .map(|(token, _)| token)
    }

    pub fn generate_refresh_token(
        &self,
        user_id: Uuid,
        username: &str,
    ) -> Result<SignedRefreshToken, anyhow::Error> {
        let (token, claims) =
            self.sign(user_id, username, TokenType::Refresh, self.refresh_token_expiry)?;
        Ok(SignedRefreshToken { token, claims })
    }

    fn decode(&self, token: &str, expected: TokenType) -> Result<TokenClaims, anyhow::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        let claims = decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| anyhow::anyhow!("Invalid {:?} token: {}", expected, e))?
            .claims;

        if claims.typ != expected {
            return Err(anyhow::anyhow!(
                "Expected {:?} token, got {:?}",
                expected,
                claims.typ
            ));
        }

        Ok(claims)
    }

    /// Signature, expiry and token type; no store lookup.
    pub fn validate_access_token(&self, token: &str) -> Result<TokenClaims, anyhow::Error> {
        self.decode(token, TokenType::Access)
    }

    /// Signature, expiry and token type only. Callers must still check the store record.
    pub fn validate_refresh_token(&self, token: &str) -> Result<TokenClaims, anyhow::Error> {
        self.decode(token, TokenType::Refresh)
    }

    pub fn access_token_expiry_seconds(&self) -> i64 {
        self.access_token_expiry.num_seconds()
    }
}

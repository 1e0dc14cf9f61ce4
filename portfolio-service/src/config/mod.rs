use secrecy::{ExposeSecret, Secret};
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct PortfolioConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub two_factor: TwoFactorConfig,
    pub storage: StorageConfig,
    pub upload: UploadConfig,
    pub smtp: SmtpConfig,
    pub security: SecurityConfig,
    pub rate_limit: RateLimitConfig,
    pub seed: SeedConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: Secret<String>,
    pub access_token_expiry_minutes: i64,
    pub refresh_token_expiry_days: i64,
    pub verification_code_expiry_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct TwoFactorConfig {
    pub enabled: bool,
    /// Recipient of login verification codes.
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StorageBackend {
    Local,
    Supabase,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub local_path: PathBuf,
    pub public_base_url: String,
    pub supabase_url: Option<String>,
    pub supabase_service_role_key: Option<Secret<String>>,
    pub bucket: String,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub temp_dir: PathBuf,
    pub max_file_size: u64,
    pub max_files: usize,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<Secret<String>>,
    pub from: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub login_attempts: u32,
    pub login_window_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct SeedConfig {
    pub admin_username: Option<String>,
    pub admin_password: Option<Secret<String>>,
}

impl PortfolioConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let environment: Environment = get_env("ENVIRONMENT", Some("dev"), false)?
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = PortfolioConfig {
            common: common_config,
            environment,
            service_name: get_env("SERVICE_NAME", Some("portfolio-service"), false)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), false)?,
            log_level: get_env("LOG_LEVEL", Some("info"), false)?,
            otlp_endpoint: get_optional_env("OTLP_ENDPOINT"),
            database: DatabaseConfig {
                url: get_env("DATABASE_URL", None, is_prod)?,
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS", "10")?,
                min_connections: parse_env("DATABASE_MIN_CONNECTIONS", "1")?,
            },
            jwt: JwtConfig {
                secret: Secret::new(get_env("JWT_SECRET", None, is_prod)?),
                access_token_expiry_minutes: parse_env("JWT_ACCESS_TOKEN_EXPIRY_MINUTES", "60")?,
                refresh_token_expiry_days: parse_env("JWT_REFRESH_TOKEN_EXPIRY_DAYS", "7")?,
                verification_code_expiry_minutes: parse_env(
                    "VERIFICATION_CODE_EXPIRY_MINUTES",
                    "10",
                )?,
            },
            two_factor: TwoFactorConfig {
                enabled: parse_env("TWO_FACTOR_ENABLED", "false")?,
                email: get_optional_env("TWO_FACTOR_EMAIL"),
            },
            storage: StorageConfig {
                backend: get_env("STORAGE_BACKEND", Some("local"), false)?
                    .parse()
                    .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?,
                local_path: get_env("STORAGE_LOCAL_PATH", Some("./storage"), false)?.into(),
                public_base_url: get_env(
                    "STORAGE_PUBLIC_BASE_URL",
                    Some("http://localhost:8080/storage"),
                    false,
                )?,
                supabase_url: get_optional_env("SUPABASE_URL"),
                supabase_service_role_key: get_optional_env("SUPABASE_SERVICE_ROLE_KEY")
                    .map(Secret::new),
                bucket: get_env("STORAGE_BUCKET", Some("portfolio-assets"), false)?,
            },
            upload: UploadConfig {
                temp_dir: get_env("UPLOAD_DIR", Some("./uploads"), false)?.into(),
                max_file_size: parse_env("MAX_FILE_SIZE", "104857600")?,
                max_files: parse_env("MAX_FILES_PER_UPLOAD", "10")?,
            },
            smtp: {
                let user = get_optional_env("SMTP_USER");
                SmtpConfig {
                    host: get_env("SMTP_HOST", Some("smtp.gmail.com"), false)?,
                    port: parse_env("SMTP_PORT", "587")?,
                    from: get_optional_env("SMTP_FROM").or_else(|| user.clone()),
                    user,
                    password: get_optional_env("SMTP_PASS").map(Secret::new),
                }
            },
            security: SecurityConfig {
                allowed_origins: get_env("ALLOWED_ORIGINS", Some("http://localhost:3000"), false)?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            rate_limit: RateLimitConfig {
                login_attempts: parse_env("RATE_LIMIT_LOGIN_ATTEMPTS", "5")?,
                login_window_seconds: parse_env("RATE_LIMIT_LOGIN_WINDOW_SECONDS", "900")?,
            },
            seed: SeedConfig {
                admin_username: get_optional_env("ADMIN_USERNAME"),
                admin_password: get_optional_env("ADMIN_PASSWORD").map(Secret::new),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn is_prod(&self) -> bool {
        self.environment == Environment::Prod
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.common.port == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        if self.jwt.access_token_expiry_minutes <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "JWT_ACCESS_TOKEN_EXPIRY_MINUTES must be positive"
            )));
        }

        if self.jwt.refresh_token_expiry_days <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "JWT_REFRESH_TOKEN_EXPIRY_DAYS must be positive"
            )));
        }

        if self.jwt.verification_code_expiry_minutes <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "VERIFICATION_CODE_EXPIRY_MINUTES must be positive"
            )));
        }

        if self.upload.max_files == 0 || self.upload.max_file_size == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "MAX_FILES_PER_UPLOAD and MAX_FILE_SIZE must be positive"
            )));
        }

        if self.storage.backend == StorageBackend::Supabase
            && (self.storage.supabase_url.is_none()
                || self.storage.supabase_service_role_key.is_none())
        {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "SUPABASE_URL and SUPABASE_SERVICE_ROLE_KEY are required for the supabase storage backend"
            )));
        }

        if self.two_factor.enabled && self.two_factor.email.is_none() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "TWO_FACTOR_EMAIL is required when TWO_FACTOR_ENABLED is true"
            )));
        }

        if self.is_prod() {
            if self.jwt.secret.expose_secret().len() < 32 {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "JWT_SECRET must be at least 32 bytes in production"
                )));
            }

            if self.security.allowed_origins.iter().any(|o| o == "*") {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "Wildcard CORS origin not allowed in production"
                )));
            }
        }

        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

fn get_optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env(key, Some(default), false)?
        .trim()
        .parse()
        .map_err(|e: T::Err| AppError::ConfigError(anyhow::anyhow!("Invalid {}: {}", key, e)))
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Dev),
            "prod" | "production" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(StorageBackend::Local),
            "supabase" => Ok(StorageBackend::Supabase),
            _ => Err(format!("Invalid storage backend: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> PortfolioConfig {
        PortfolioConfig {
            common: core_config::Config::default(),
            environment: Environment::Dev,
            service_name: "portfolio-service".into(),
            service_version: "test".into(),
            log_level: "debug".into(),
            otlp_endpoint: None,
            database: DatabaseConfig {
                url: "postgres://localhost/portfolio_test".into(),
                max_connections: 5,
                min_connections: 1,
            },
            jwt: JwtConfig {
                secret: Secret::new("short".into()),
                access_token_expiry_minutes: 60,
                refresh_token_expiry_days: 7,
                verification_code_expiry_minutes: 10,
            },
            two_factor: TwoFactorConfig {
                enabled: false,
                email: None,
            },
            storage: StorageConfig {
                backend: StorageBackend::Local,
                local_path: "./storage".into(),
                public_base_url: "http://localhost:8080/storage".into(),
                supabase_url: None,
                supabase_service_role_key: None,
                bucket: "portfolio-assets".into(),
            },
            upload: UploadConfig {
                temp_dir: "./uploads".into(),
                max_file_size: 1024,
                max_files: 10,
            },
            smtp: SmtpConfig {
                host: "smtp.gmail.com".into(),
                port: 587,
                user: None,
                password: None,
                from: None,
            },
            security: SecurityConfig {
                allowed_origins: vec!["http://localhost:3000".into()],
            },
            rate_limit: RateLimitConfig {
                login_attempts: 5,
                login_window_seconds: 900,
            },
            seed: SeedConfig {
                admin_username: None,
                admin_password: None,
            },
        }
    }

    #[test]
    fn test_dev_config_accepts_short_secret() {
        assert!(sample_config().validate().is_ok());
    }

    #[test]
    fn test_prod_requires_long_secret() {
        let mut config = sample_config();
        config.environment = Environment::Prod;
        assert!(config.validate().is_err());

        config.jwt.secret = Secret::new("x".repeat(32));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_supabase_backend_requires_credentials() {
        let mut config = sample_config();
        config.storage.backend = StorageBackend::Supabase;
        assert!(config.validate().is_err());

        config.storage.supabase_url = Some("https://example.supabase.co".into());
        config.storage.supabase_service_role_key = Some(Secret::new("key".into()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_two_factor_requires_recipient() {
        let mut config = sample_config();
        config.two_factor.enabled = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_enums() {
        assert_eq!("PROD".parse::<Environment>().unwrap(), Environment::Prod);
        assert_eq!(
            "supabase".parse::<StorageBackend>().unwrap(),
            StorageBackend::Supabase
        );
        assert!("s3".parse::<StorageBackend>().is_err());
    }
}

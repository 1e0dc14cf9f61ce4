//! Services layer for portfolio-service.
//!
//! Credential store access, token issuance, project and file resources,
//! the upload pipeline and object storage.

mod auth;
mod database;
mod email;
pub mod error;
pub mod file_validation;
mod files;
mod jwt;
mod memory;
mod projects;
mod seed;
pub mod storage;
pub mod store;
mod tokens;
pub mod uploads;

pub use auth::{AuthService, VERIFICATION_SENT_MESSAGE};
pub use database::Database;
pub use email::{EmailProvider, EmailService, MockEmailService};
pub use error::ServiceError;
pub use files::FileService;
pub use jwt::{JwtService, SignedRefreshToken, TokenClaims, TokenType};
pub use memory::InMemoryStore;
pub use projects::ProjectService;
pub use seed::seed_admin;
pub use storage::{LocalStorage, Storage, SupabaseStorage};
pub use store::Store;
pub use tokens::TokenService;
pub use uploads::UploadPipeline;

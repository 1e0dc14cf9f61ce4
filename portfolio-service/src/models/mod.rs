mod file;
mod project;
mod refresh_token;
mod user;

pub use file::ProjectFile;
pub use project::Project;
pub use refresh_token::RefreshToken;
pub use user::{SanitizedUser, User};

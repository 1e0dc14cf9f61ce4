//! Client for the portfolio API.
//!
//! [`PortfolioApi`] exposes one typed method per endpoint. Underneath,
//! [`SessionClient`] attaches the bearer token, refreshes it once on a 401
//! (concurrent 401s share a single refresh) and logs out when the refresh
//! fails.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod session;
pub mod token_store;

pub use api::PortfolioApi;
pub use client::SessionClient;
pub use config::ClientConfig;
pub use error::SessionError;
pub use session::{SessionManager, SessionState};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};

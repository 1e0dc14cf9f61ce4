//! HTTP handlers for portfolio-service.

pub mod auth;
pub mod files;
pub mod health;
pub mod metrics;
pub mod projects;

use uuid::Uuid;

use crate::services::ServiceError;

/// Ids that do not parse name nothing, so they map to the resource's 404.
pub(crate) fn parse_id(raw: &str, not_found: ServiceError) -> Result<Uuid, ServiceError> {
    Uuid::parse_str(raw).map_err(|_| not_found)
}

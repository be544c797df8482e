//! HTTP handlers for the `/files` routes.

pub mod file_delete;
pub mod file_get;
pub mod file_update;
pub mod storage_probe;
pub mod upload;

use iris_core::AppError;
use uuid::Uuid;

/// Ids arrive as raw path segments; anything that is not a UUID cannot name a row.
pub(crate) fn parse_id(raw: &str, entity: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(format!("{} not found", entity)))
}

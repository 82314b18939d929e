mod achievements;
mod auth;
mod categories;
mod images;
mod milestones;
mod misc;
mod tags;

pub use achievements::achievement_routes;
pub use auth::auth_routes;
pub use categories::category_routes;
pub use images::image_routes;
pub use milestones::milestone_routes;
pub use misc::misc_routes;
pub use tags::tag_routes;

use anyhow::anyhow;
use axum::http::StatusCode;
use sqlx::types::Uuid;

use crate::response::AppError;

/// Path ids arrive as strings; anything that is not a UUID can never name a
/// row, so it maps to the entity's not-found error.
pub(crate) fn parse_id(raw: &str, not_found: &'static str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::new(StatusCode::NOT_FOUND, anyhow!(not_found)))
}

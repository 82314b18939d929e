use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    middleware,
    routing::{get, put},
    Json, Router,
};
use serde_json::json;

use bragger_core::services::milestones::{self, CreateMilestoneDto, UpdateMilestoneDto};

use crate::middleware::{authenticate, AuthUser};
use crate::response::{AppError, AppSuccess};
use crate::routes::parse_id;
use crate::GlobalState;

pub fn milestone_routes() -> Router<GlobalState> {
    Router::new()
        .route("/achievements/{id}/milestones",
            get(list_milestones).post(create_milestone)
        )
        .route("/achievements/{id}/milestones/{milestone_id}",
            put(update_milestone).delete(delete_milestone)
        )
        .route_layer(middleware::from_fn(authenticate))
}

async fn list_milestones(
    State(state): State<GlobalState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(achievement_id): Path<String>,
) -> Result<AppSuccess, AppError> {
    let achievement_id = parse_id(&achievement_id, "Achievement not found")?;

    let milestones = milestones::list(state.pool(), achievement_id, user_id).await?;

    Ok(AppSuccess::new(
        StatusCode::OK,
        "Milestones fetched successfully",
        json!(milestones),
    ))
}

async fn create_milestone(
    State(state): State<GlobalState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(achievement_id): Path<String>,
    Json(payload): Json<CreateMilestoneDto>,
) -> Result<AppSuccess, AppError> {
    let achievement_id = parse_id(&achievement_id, "Achievement not found")?;

    let milestone = milestones::create(state.pool(), achievement_id, user_id, payload).await?;

    Ok(AppSuccess::new(
        StatusCode::CREATED,
        "Milestone created successfully",
        json!(milestone),
    ))
}

async fn update_milestone(
    State(state): State<GlobalState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path((_achievement_id, milestone_id)): Path<(String, String)>,
    Json(payload): Json<UpdateMilestoneDto>,
) -> Result<AppSuccess, AppError> {
    let milestone_id = parse_id(&milestone_id, "Milestone not found")?;

    let milestone = milestones::update(state.pool(), milestone_id, user_id, payload).await?;

    Ok(AppSuccess::new(
        StatusCode::OK,
        "Milestone updated successfully",
        json!(milestone),
    ))
}

async fn delete_milestone(
    State(state): State<GlobalState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path((_achievement_id, milestone_id)): Path<(String, String)>,
) -> Result<AppSuccess, AppError> {
    let milestone_id = parse_id(&milestone_id, "Milestone not found")?;

    milestones::delete(state.pool(), milestone_id, user_id).await?;

    Ok(AppSuccess::new(
        StatusCode::OK,
        "Milestone deleted successfully",
        json!({}),
    ))
}

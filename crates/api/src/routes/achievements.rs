use anyhow::anyhow;
use axum::{
    extract::{Extension, Multipart, Path, State},
    http::StatusCode,
    middleware,
    Json, Router,
    routing::{get, post},
};
use axum_extra::extract::Query;
use serde_json::json;

use bragger_core::services::achievements::{
    self, AchievementFilters, CreateAchievementDto, UpdateAchievementDto,
};
use bragger_core::services::images::{self, NewImageFile};

use crate::middleware::{authenticate, AuthUser};
use crate::response::{AppError, AppSuccess};
use crate::routes::parse_id;
use crate::GlobalState;

pub fn achievement_routes() -> Router<GlobalState> {
    Router::new()
        .route("/achievements",
            get(list_achievements).post(create_achievement)
        )
        .route("/achievements/{id}",
            get(get_achievement).put(update_achievement).delete(delete_achievement)
        )
        .route("/achievements/{id}/images",
            post(upload_images)
        )
        .route_layer(middleware::from_fn(authenticate))
}

async fn list_achievements(
    State(state): State<GlobalState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Query(mut filters): Query<AchievementFilters>,
) -> Result<AppSuccess, AppError> {
    filters.user_id = Some(user_id);
    let page = achievements::find_all(state.pool(), &filters).await?;

    Ok(AppSuccess::new(
        StatusCode::OK,
        "Achievements fetched successfully",
        json!(page),
    ))
}

async fn get_achievement(
    State(state): State<GlobalState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<AppSuccess, AppError> {
    let id = parse_id(&id, "Achievement not found")?;

    let achievement = achievements::find_by_id(state.pool(), id, user_id)
        .await?
        .ok_or_else(|| AppError::new(StatusCode::NOT_FOUND, anyhow!("Achievement not found")))?;

    Ok(AppSuccess::new(
        StatusCode::OK,
        "Achievement fetched successfully",
        json!(achievement),
    ))
}

async fn create_achievement(
    State(state): State<GlobalState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(payload): Json<CreateAchievementDto>,
) -> Result<AppSuccess, AppError> {
    let achievement = achievements::create(state.pool(), user_id, payload).await?;

    Ok(AppSuccess::new(
        StatusCode::CREATED,
        "Achievement created successfully",
        json!(achievement),
    ))
}

async fn update_achievement(
    State(state): State<GlobalState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateAchievementDto>,
) -> Result<AppSuccess, AppError> {
    let id = parse_id(&id, "Achievement not found")?;

    let achievement = achievements::update(state.pool(), id, user_id, payload).await?;

    Ok(AppSuccess::new(
        StatusCode::OK,
        "Achievement updated successfully",
        json!(achievement),
    ))
}

async fn delete_achievement(
    State(state): State<GlobalState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<AppSuccess, AppError> {
    let id = parse_id(&id, "Achievement not found")?;

    achievements::delete(state.pool(), id, user_id).await?;

    Ok(AppSuccess::new(
        StatusCode::OK,
        "Achievement deleted successfully",
        json!({}),
    ))
}

async fn upload_images(
    State(state): State<GlobalState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<AppSuccess, AppError> {
    let achievement_id = parse_id(&id, "Achievement not found")?;

    // Ownership is checked before anything touches the disk so a rejected
    // upload leaves no stray files behind.
    achievements::find_by_id(state.pool(), achievement_id, user_id)
        .await?
        .ok_or_else(|| AppError::new(StatusCode::NOT_FOUND, anyhow!("Achievement not found")))?;

    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::new(
            StatusCode::BAD_REQUEST,
            anyhow!("Invalid multipart payload: {e}"),
        )
    })? {
        let Some(original_name) = field.file_name().map(ToString::to_string) else {
            continue;
        };

        let mime_type = field.content_type().unwrap_or("").to_string();
        if !mime_type.starts_with("image/") {
            return Err(AppError::new(
                StatusCode::BAD_REQUEST,
                anyhow!("Only image files are allowed"),
            ));
        }

        let data = field.bytes().await.map_err(|e| {
            AppError::new(
                StatusCode::BAD_REQUEST,
                anyhow!("Failed to read uploaded file: {e}"),
            )
        })?;

        let stored = state
            .storage
            .store(&original_name, &data)
            .await
            .map_err(|e| AppError::new(StatusCode::BAD_REQUEST, e))?;

        files.push(NewImageFile {
            filename: stored.filename,
            original_name,
            file_path: stored.file_path,
            file_size: stored.file_size,
            mime_type,
        });
    }

    let uploaded = images::attach(state.pool(), achievement_id, user_id, files).await?;

    Ok(AppSuccess::new(
        StatusCode::OK,
        "Images uploaded successfully",
        json!(uploaded),
    ))
}

use anyhow::anyhow;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
    routing::get,
    Router,
};
use serde_json::json;

use bragger_core::services::images;

use crate::response::{AppError, AppSuccess};
use crate::routes::parse_id;
use crate::GlobalState;

pub fn image_routes() -> Router<GlobalState> {
    Router::new()
        .route("/images/{filename}",
            get(serve_image).delete(delete_image)
        )
}

async fn serve_image(
    State(state): State<GlobalState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let image = images::find_by_filename(state.pool(), &filename).await?;

    let bytes = state
        .storage
        .read(&filename)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::new(StatusCode::NOT_FOUND, anyhow!("Image not found")))?;

    let mime_type = image
        .map(|image| image.mime_type)
        .unwrap_or_else(|| guess_mime_type(&filename).to_string());

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime_type)
        .body(Body::from(bytes))
        .map_err(|e| AppError::new(StatusCode::INTERNAL_SERVER_ERROR, e.into()))
}

/// DELETE /images/{id}: removes the database row, then best-effort unlinks
/// the file.
async fn delete_image(
    State(state): State<GlobalState>,
    Path(id): Path<String>,
) -> Result<AppSuccess, AppError> {
    let id = parse_id(&id, "Image not found")?;

    let image = images::delete(state.pool(), id).await?;

    if let Err(e) = state.storage.remove(&image.filename).await {
        tracing::warn!("failed to remove image file {}: {e}", image.filename);
    }

    Ok(AppSuccess::new(
        StatusCode::OK,
        "Image deleted successfully",
        json!({}),
    ))
}

fn guess_mime_type(filename: &str) -> &'static str {
    match std::path::Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

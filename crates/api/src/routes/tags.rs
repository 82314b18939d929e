use anyhow::anyhow;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use bragger_core::services::tags::{self, CreateTagDto, TagFilters, UpdateTagDto};

use crate::middleware::optional_auth;
use crate::response::{AppError, AppSuccess};
use crate::routes::parse_id;
use crate::GlobalState;

pub fn tag_routes() -> Router<GlobalState> {
    Router::new()
        .route("/tags",
            get(list_tags).post(create_tag)
        )
        .route("/tags/{id}",
            get(get_tag).put(update_tag).delete(delete_tag)
        )
        .route_layer(middleware::from_fn(optional_auth))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TagListQuery {
    pub search: Option<String>,
    pub include_stats: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

async fn list_tags(
    State(state): State<GlobalState>,
    Query(query): Query<TagListQuery>,
) -> Result<AppSuccess, AppError> {
    let filters = TagFilters {
        search: query.search,
        page: query.page,
        page_size: query.page_size,
    };

    let data = if query.include_stats.as_deref() == Some("true") {
        json!(tags::find_all_with_stats(state.pool(), &filters).await?)
    } else {
        json!(tags::find_all(state.pool(), &filters).await?)
    };

    Ok(AppSuccess::new(
        StatusCode::OK,
        "Tags fetched successfully",
        data,
    ))
}

async fn get_tag(
    State(state): State<GlobalState>,
    Path(id): Path<String>,
) -> Result<AppSuccess, AppError> {
    let id = parse_id(&id, "Tag not found")?;

    let tag = tags::find_by_id(state.pool(), id)
        .await?
        .ok_or_else(|| AppError::new(StatusCode::NOT_FOUND, anyhow!("Tag not found")))?;

    Ok(AppSuccess::new(
        StatusCode::OK,
        "Tag fetched successfully",
        json!(tag),
    ))
}

async fn create_tag(
    State(state): State<GlobalState>,
    Json(payload): Json<CreateTagDto>,
) -> Result<AppSuccess, AppError> {
    let tag = tags::create(state.pool(), payload).await?;

    Ok(AppSuccess::new(
        StatusCode::CREATED,
        "Tag created successfully",
        json!(tag),
    ))
}

async fn update_tag(
    State(state): State<GlobalState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateTagDto>,
) -> Result<AppSuccess, AppError> {
    let id = parse_id(&id, "Tag not found")?;

    let tag = tags::update(state.pool(), id, payload).await?;

    Ok(AppSuccess::new(
        StatusCode::OK,
        "Tag updated successfully",
        json!(tag),
    ))
}

async fn delete_tag(
    State(state): State<GlobalState>,
    Path(id): Path<String>,
) -> Result<AppSuccess, AppError> {
    let id = parse_id(&id, "Tag not found")?;

    tags::delete(state.pool(), id).await?;

    Ok(AppSuccess::new(
        StatusCode::OK,
        "Tag deleted successfully",
        json!({}),
    ))
}

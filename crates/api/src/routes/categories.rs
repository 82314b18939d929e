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

use bragger_core::services::categories::{
    self, CategoryFilters, CreateCategoryDto, UpdateCategoryDto,
};

use crate::middleware::optional_auth;
use crate::response::{AppError, AppSuccess};
use crate::routes::parse_id;
use crate::GlobalState;

pub fn category_routes() -> Router<GlobalState> {
    Router::new()
        .route("/categories",
            get(list_categories).post(create_category)
        )
        .route("/categories/{id}",
            get(get_category).put(update_category).delete(delete_category)
        )
        .route_layer(middleware::from_fn(optional_auth))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CategoryListQuery {
    pub search: Option<String>,
    pub include_stats: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

async fn list_categories(
    State(state): State<GlobalState>,
    Query(query): Query<CategoryListQuery>,
) -> Result<AppSuccess, AppError> {
    let filters = CategoryFilters {
        search: query.search,
        page: query.page,
        page_size: query.page_size,
    };

    let data = if query.include_stats.as_deref() == Some("true") {
        json!(categories::find_all_with_stats(state.pool(), &filters).await?)
    } else {
        json!(categories::find_all(state.pool(), &filters).await?)
    };

    Ok(AppSuccess::new(
        StatusCode::OK,
        "Categories fetched successfully",
        data,
    ))
}

async fn get_category(
    State(state): State<GlobalState>,
    Path(id): Path<String>,
) -> Result<AppSuccess, AppError> {
    let id = parse_id(&id, "Category not found")?;

    let category = categories::find_by_id(state.pool(), id)
        .await?
        .ok_or_else(|| AppError::new(StatusCode::NOT_FOUND, anyhow!("Category not found")))?;

    Ok(AppSuccess::new(
        StatusCode::OK,
        "Category fetched successfully",
        json!(category),
    ))
}

async fn create_category(
    State(state): State<GlobalState>,
    Json(payload): Json<CreateCategoryDto>,
) -> Result<AppSuccess, AppError> {
    let category = categories::create(state.pool(), payload).await?;

    Ok(AppSuccess::new(
        StatusCode::CREATED,
        "Category created successfully",
        json!(category),
    ))
}

async fn update_category(
    State(state): State<GlobalState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateCategoryDto>,
) -> Result<AppSuccess, AppError> {
    let id = parse_id(&id, "Category not found")?;

    let category = categories::update(state.pool(), id, payload).await?;

    Ok(AppSuccess::new(
        StatusCode::OK,
        "Category updated successfully",
        json!(category),
    ))
}

async fn delete_category(
    State(state): State<GlobalState>,
    Path(id): Path<String>,
) -> Result<AppSuccess, AppError> {
    let id = parse_id(&id, "Category not found")?;

    categories::delete(state.pool(), id).await?;

    Ok(AppSuccess::new(
        StatusCode::OK,
        "Category deleted successfully",
        json!({}),
    ))
}

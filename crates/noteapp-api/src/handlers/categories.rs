//! Category HTTP handlers.
//!
//! Provides REST endpoints under `/categories`. Category names are unique;
//! creating an existing name hands back the category that already has it.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{ApiError, AppState};
use noteapp_core::{Category, CategoryRequest};

/// List all categories ordered by name.
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, ApiError> {
    let categories = state.categories.list().await?;
    Ok(Json(categories))
}

/// Get a category by id.
///
/// # Returns
/// - 200 OK with the category
/// - 404 Not Found if it doesn't exist
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Category>, ApiError> {
    let category = state
        .categories
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Category not found: {}", id)))?;
    Ok(Json(category))
}

/// Get a category by its exact name.
pub async fn get_category_by_name(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Category>, ApiError> {
    let category = state
        .categories
        .get_by_name(&name)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Category '{}' not found", name)))?;
    Ok(Json(category))
}

/// Create a category.
///
/// # Returns
/// - 201 Created with the category (the existing one if the name is taken)
/// - 400 Bad Request if the name is blank or too long
pub async fn create_category(
    State(state): State<AppState>,
    Json(req): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let category = state.categories.create(req).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// Rename a category.
///
/// # Returns
/// - 200 OK with the renamed category
/// - 400 Bad Request if the name is blank or too long
/// - 404 Not Found if the category doesn't exist
/// - 409 Conflict if another category already has the name
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CategoryRequest>,
) -> Result<Json<Category>, ApiError> {
    let category = state.categories.update(id, req).await?;
    Ok(Json(category))
}

/// Delete a category. Notes filed under it are kept.
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.categories.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

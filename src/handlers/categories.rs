use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::error::ApiError;
use crate::models::{Category, CategoryRequest};
use crate::state::AppState;

/// GET /categories - all categories, name-ordered
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Category>>, ApiError> {
    let categories = sqlx::query_as::<_, Category>(
        "SELECT id, name, description, created_at, updated_at FROM categories ORDER BY name",
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(categories))
}

/// POST /categories
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    if body.name.is_empty() {
        return Err(ApiError::validation("name is required"));
    }

    let category = sqlx::query_as::<_, Category>(
        "INSERT INTO categories (name, description) VALUES ($1, $2)
         RETURNING id, name, description, created_at, updated_at",
    )
    .bind(&body.name)
    .bind(&body.description)
    .fetch_one(&state.pool)
    .await?;

    Ok((StatusCode::CREATED, Json(category)))
}

/// GET /categories/:id
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Category>, ApiError> {
    let category = sqlx::query_as::<_, Category>(
        "SELECT id, name, description, created_at, updated_at FROM categories WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| ApiError::not_found("category not found"))?;

    Ok(Json(category))
}

/// PUT /categories/:id - full replace of name/description
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<CategoryRequest>,
) -> Result<Json<Category>, ApiError> {
    if body.name.is_empty() {
        return Err(ApiError::validation("name is required"));
    }

    let category = sqlx::query_as::<_, Category>(
        "UPDATE categories SET name = $1, description = $2, updated_at = now()
         WHERE id = $3
         RETURNING id, name, description, created_at, updated_at",
    )
    .bind(&body.name)
    .bind(&body.description)
    .bind(id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| ApiError::not_found("category not found"))?;

    Ok(Json(category))
}

/// DELETE /categories/:id
///
/// Referencing documents keep existing; their category_id is cleared by the
/// ON DELETE SET NULL constraint.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    sqlx::query_as::<_, (i32,)>("DELETE FROM categories WHERE id = $1 RETURNING id")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("category not found"))?;

    Ok(StatusCode::NO_CONTENT)
}

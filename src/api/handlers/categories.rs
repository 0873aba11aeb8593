use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{check_limit, default_limit, replicate};
use crate::api::response::{
    require_uuid, ApiError, AppJson, AppQuery, Caller, JSend, JSendPaginated, Pagination,
};
use crate::storage::models::{Category, WriteOp};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub created_at: String,
    pub id: String,
    pub name: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ListCategoriesParams {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn create_category(
    State(state): State<Arc<AppState>>,
    _caller: Caller,
    AppJson(req): AppJson<CategoryRequest>,
) -> Result<Json<JSend<CategoryResponse>>, ApiError> {
    let name = validate_name(&req.name)?;
    let now = Utc::now();
    let category = Category {
        id: uuid::Uuid::new_v4().to_string(),
        name,
        created_at: now,
        updated_at: now,
    };

    replicate(&state, WriteOp::CreateCategory(category.clone())).await?;

    tracing::debug!(category_id = %category.id, "Created category");
    Ok(JSend::success(category_to_response(&category)))
}

pub async fn get_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<CategoryResponse>>, ApiError> {
    require_uuid("id", &id)?;
    let category = state
        .db
        .get_category(&id)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("Category not found"))?;

    Ok(JSend::success(category_to_response(&category)))
}

pub async fn update_category(
    State(state): State<Arc<AppState>>,
    _caller: Caller,
    Path(id): Path<String>,
    AppJson(req): AppJson<CategoryRequest>,
) -> Result<Json<JSend<CategoryResponse>>, ApiError> {
    require_uuid("id", &id)?;
    let name = validate_name(&req.name)?;

    state
        .db
        .get_category(&id)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("Category not found"))?;

    let operation = WriteOp::UpdateCategory {
        id: id.clone(),
        name,
        updated_at: Utc::now(),
    };
    replicate(&state, operation).await?;

    let category = state
        .db
        .get_category(&id)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::internal("Category not found after update"))?;

    tracing::debug!(category_id = %id, "Updated category");
    Ok(JSend::success(category_to_response(&category)))
}

pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    _caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<JSend<()>>, ApiError> {
    require_uuid("id", &id)?;
    state
        .db
        .get_category(&id)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("Category not found"))?;

    replicate(&state, WriteOp::DeleteCategory { id: id.clone() }).await?;

    tracing::debug!(category_id = %id, "Deleted category");
    Ok(JSend::success(()))
}

pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<ListCategoriesParams>,
) -> Result<Json<JSendPaginated<CategoryResponse>>, ApiError> {
    check_limit(params.limit, state.config.api.max_page_size)?;

    let categories = state
        .db
        .list_categories()
        .map_err(|e| ApiError::internal(e.to_string()))?;

    let total = categories.len() as u64;
    let items: Vec<CategoryResponse> = categories
        .iter()
        .skip(params.offset as usize)
        .take(params.limit as usize)
        .map(category_to_response)
        .collect();

    Ok(JSendPaginated::success(
        items,
        Pagination {
            limit: params.limit,
            offset: params.offset,
            total,
        },
    ))
}

// ============================================================================
// Helpers
// ============================================================================

fn validate_name(name: &str) -> Result<String, ApiError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("name must not be empty"));
    }
    Ok(name.to_string())
}

fn category_to_response(category: &Category) -> CategoryResponse {
    CategoryResponse {
        created_at: category.created_at.to_rfc3339(),
        id: category.id.clone(),
        name: category.name.clone(),
        updated_at: category.updated_at.to_rfc3339(),
    }
}

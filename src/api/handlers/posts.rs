use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::comments::{paginated_comments, CommentResponse};
use super::{check_limit, default_limit, ensure_owner, replicate};
use crate::api::response::{
    require_uuid, ApiError, AppJson, AppQuery, Caller, JSend, JSendPaginated, Pagination,
};
use crate::storage::models::{CommentFilter, Post, PostChanges, PostFilter, WriteOp};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub category_id: String,
    pub created_at: String,
    pub id: String,
    pub owner_id: String,
    pub price: f64,
    pub price_status: bool,
    pub science: String,
    pub theme: String,
    pub updated_at: String,
    pub views: u64,
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub category_id: String,
    #[serde(default)]
    pub price: f64,
    pub science: String,
    pub theme: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePostRequest {
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub science: Option<String>,
    #[serde(default)]
    pub theme: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListPostsParams {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
    /// Theme search terms
    #[serde(default)]
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn create_post(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    AppJson(req): AppJson<CreatePostRequest>,
) -> Result<Json<JSend<PostResponse>>, ApiError> {
    ensure_category(&state, &req.category_id)?;
    let theme = required_text("theme", &req.theme)?;
    let science = required_text("science", &req.science)?;
    validate_price(req.price)?;

    let now = Utc::now();
    let post = Post {
        id: uuid::Uuid::new_v4().to_string(),
        owner_id: caller.0,
        category_id: req.category_id,
        theme,
        science,
        price: req.price,
        price_status: req.price > 0.0,
        views: 0,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };

    replicate(&state, WriteOp::CreatePost(post.clone())).await?;

    tracing::debug!(post_id = %post.id, "Created post");
    Ok(JSend::success(post_to_response(&post)))
}

/// Fetch a post and count the read as a view.
pub async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<PostResponse>>, ApiError> {
    require_uuid("id", &id)?;
    state
        .db
        .get_post(&id)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;

    replicate(&state, WriteOp::RecordPostView { id: id.clone() }).await?;

    let post = state
        .db
        .get_post(&id)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;

    Ok(JSend::success(post_to_response(&post)))
}

pub async fn update_post(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdatePostRequest>,
) -> Result<Json<JSend<PostResponse>>, ApiError> {
    require_uuid("id", &id)?;
    let changes = build_changes(&state, req)?;
    if changes.is_empty() {
        return Err(ApiError::bad_request(
            "at least one field (category_id, price, science, theme) must be provided",
        ));
    }

    let existing = state
        .db
        .get_post(&id)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;
    ensure_owner(&existing.owner_id, &caller, "post")?;

    let operation = WriteOp::UpdatePost {
        id: id.clone(),
        changes,
        updated_at: Utc::now(),
    };
    replicate(&state, operation).await?;

    let post = state
        .db
        .get_post(&id)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::internal("Post not found after update"))?;

    tracing::debug!(post_id = %id, "Updated post");
    Ok(JSend::success(post_to_response(&post)))
}

pub async fn delete_post(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<JSend<()>>, ApiError> {
    require_uuid("id", &id)?;
    let existing = state
        .db
        .get_post(&id)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;
    ensure_owner(&existing.owner_id, &caller, "post")?;

    let operation = WriteOp::DeletePost {
        id: id.clone(),
        deleted_at: Utc::now(),
    };
    replicate(&state, operation).await?;

    tracing::debug!(post_id = %id, "Deleted post");
    Ok(JSend::success(()))
}

pub async fn list_posts(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<ListPostsParams>,
) -> Result<Json<JSendPaginated<PostResponse>>, ApiError> {
    check_limit(params.limit, state.config.api.max_page_size)?;
    if let Some(ref category_id) = params.category_id {
        require_uuid("category_id", category_id)?;
    }
    if let Some(ref owner_id) = params.owner_id {
        require_uuid("owner_id", owner_id)?;
    }

    let filter = PostFilter {
        category_id: params.category_id,
        owner_id: params.owner_id,
        search: params.q.filter(|q| !q.trim().is_empty()),
    };

    let posts = state
        .db
        .list_posts(&filter)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    let total = posts.len() as u64;
    let items: Vec<PostResponse> = posts
        .iter()
        .skip(params.offset as usize)
        .take(params.limit as usize)
        .map(post_to_response)
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

pub async fn list_post_comments(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AppQuery(params): AppQuery<PageParams>,
) -> Result<Json<JSendPaginated<CommentResponse>>, ApiError> {
    require_uuid("id", &id)?;
    check_limit(params.limit, state.config.api.max_page_size)?;

    state
        .db
        .get_post(&id)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;

    let filter = CommentFilter {
        owner_id: None,
        post_id: Some(id),
    };
    paginated_comments(&state, &filter, params.limit, params.offset)
}

// ============================================================================
// Helpers
// ============================================================================

fn ensure_category(state: &AppState, category_id: &str) -> Result<(), ApiError> {
    require_uuid("category_id", category_id)?;
    state
        .db
        .get_category(category_id)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .map(|_| ())
        .ok_or_else(|| ApiError::bad_request("category_id does not reference a category"))
}

fn required_text(field: &str, value: &str) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::bad_request(format!("{field} must not be empty")));
    }
    Ok(value.to_string())
}

fn validate_price(price: f64) -> Result<(), ApiError> {
    if !price.is_finite() || price < 0.0 {
        return Err(ApiError::bad_request(
            "price must be a non-negative number",
        ));
    }
    Ok(())
}

fn build_changes(state: &AppState, req: UpdatePostRequest) -> Result<PostChanges, ApiError> {
    if let Some(ref category_id) = req.category_id {
        ensure_category(state, category_id)?;
    }
    if let Some(price) = req.price {
        validate_price(price)?;
    }

    Ok(PostChanges {
        category_id: req.category_id,
        price: req.price,
        price_status: req.price.map(|p| p > 0.0),
        science: req
            .science
            .as_deref()
            .map(|s| required_text("science", s))
            .transpose()?,
        theme: req
            .theme
            .as_deref()
            .map(|t| required_text("theme", t))
            .transpose()?,
    })
}

fn post_to_response(post: &Post) -> PostResponse {
    PostResponse {
        category_id: post.category_id.clone(),
        created_at: post.created_at.to_rfc3339(),
        id: post.id.clone(),
        owner_id: post.owner_id.clone(),
        price: post.price,
        price_status: post.price_status,
        science: post.science.clone(),
        theme: post.theme.clone(),
        updated_at: post.updated_at.to_rfc3339(),
        views: post.views,
    }
}

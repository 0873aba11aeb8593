use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{check_limit, default_limit, ensure_owner, replicate};
use crate::api::response::{
    require_uuid, ApiError, AppJson, AppQuery, Caller, JSend, JSendPaginated, Pagination,
};
use crate::storage::models::{Comment, CommentFilter, WriteOp};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub created_at: String,
    pub dislikes: u64,
    pub id: String,
    pub likes: u64,
    pub message: String,
    pub owner_id: String,
    pub post_id: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub message: String,
    pub post_id: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCommentRequest {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ListCommentsParams {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub post_id: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn create_comment(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    AppJson(req): AppJson<CreateCommentRequest>,
) -> Result<Json<JSend<CommentResponse>>, ApiError> {
    require_uuid("post_id", &req.post_id)?;
    let message = validate_message(&req.message)?;

    state
        .db
        .get_post(&req.post_id)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;

    let now = Utc::now();
    let comment = Comment {
        id: uuid::Uuid::new_v4().to_string(),
        post_id: req.post_id,
        owner_id: caller.0,
        message,
        likes: 0,
        dislikes: 0,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };

    replicate(&state, WriteOp::CreateComment(comment.clone())).await?;

    tracing::debug!(comment_id = %comment.id, post_id = %comment.post_id, "Created comment");
    Ok(JSend::success(comment_to_response(&comment)))
}

pub async fn get_comment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<CommentResponse>>, ApiError> {
    require_uuid("id", &id)?;
    let comment = state
        .db
        .get_comment(&id)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("Comment not found"))?;

    Ok(JSend::success(comment_to_response(&comment)))
}

pub async fn update_comment(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdateCommentRequest>,
) -> Result<Json<JSend<CommentResponse>>, ApiError> {
    require_uuid("id", &id)?;
    let message = validate_message(&req.message)?;

    let existing = state
        .db
        .get_comment(&id)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("Comment not found"))?;
    ensure_owner(&existing.owner_id, &caller, "comment")?;

    let operation = WriteOp::UpdateComment {
        id: id.clone(),
        message,
        updated_at: Utc::now(),
    };
    replicate(&state, operation).await?;

    let comment = state
        .db
        .get_comment(&id)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::internal("Comment not found after update"))?;

    tracing::debug!(comment_id = %id, "Updated comment");
    Ok(JSend::success(comment_to_response(&comment)))
}

pub async fn delete_comment(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<JSend<()>>, ApiError> {
    require_uuid("id", &id)?;
    let existing = state
        .db
        .get_comment(&id)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("Comment not found"))?;
    ensure_owner(&existing.owner_id, &caller, "comment")?;

    let operation = WriteOp::DeleteComment {
        id: id.clone(),
        deleted_at: Utc::now(),
    };
    replicate(&state, operation).await?;

    tracing::debug!(comment_id = %id, "Deleted comment");
    Ok(JSend::success(()))
}

pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<ListCommentsParams>,
) -> Result<Json<JSendPaginated<CommentResponse>>, ApiError> {
    check_limit(params.limit, state.config.api.max_page_size)?;
    if let Some(ref post_id) = params.post_id {
        require_uuid("post_id", post_id)?;
    }
    if let Some(ref owner_id) = params.owner_id {
        require_uuid("owner_id", owner_id)?;
    }

    let filter = CommentFilter {
        owner_id: params.owner_id,
        post_id: params.post_id,
    };
    paginated_comments(&state, &filter, params.limit, params.offset)
}

// ============================================================================
// Helpers
// ============================================================================

pub(super) fn paginated_comments(
    state: &AppState,
    filter: &CommentFilter,
    limit: u32,
    offset: u32,
) -> Result<Json<JSendPaginated<CommentResponse>>, ApiError> {
    let comments = state
        .db
        .list_comments(filter)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    let total = comments.len() as u64;
    let items: Vec<CommentResponse> = comments
        .iter()
        .skip(offset as usize)
        .take(limit as usize)
        .map(comment_to_response)
        .collect();

    Ok(JSendPaginated::success(
        items,
        Pagination {
            limit,
            offset,
            total,
        },
    ))
}

fn validate_message(message: &str) -> Result<String, ApiError> {
    let message = message.trim();
    if message.is_empty() {
        return Err(ApiError::bad_request("message must not be empty"));
    }
    Ok(message.to_string())
}

pub(super) fn comment_to_response(comment: &Comment) -> CommentResponse {
    CommentResponse {
        created_at: comment.created_at.to_rfc3339(),
        dislikes: comment.dislikes,
        id: comment.id.clone(),
        likes: comment.likes,
        message: comment.message.clone(),
        owner_id: comment.owner_id.clone(),
        post_id: comment.post_id.clone(),
        updated_at: comment.updated_at.to_rfc3339(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{new_id, seed_comment, seed_post, test_state};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_get_comment_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        let err = get_comment(State(state), Path(new_id())).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_get_comment_rejects_malformed_id() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        let err = get_comment(State(state), Path("nope".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_comment_returns_counters() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        let post = seed_post(&state, &new_id());
        let comment = seed_comment(&state, &post.id, &new_id());

        let Json(body) = get_comment(State(state), Path(comment.id.clone()))
            .await
            .unwrap();
        assert_eq!(body.data.id, comment.id);
        assert_eq!(body.data.likes, 0);
        assert_eq!(body.data.dislikes, 0);
    }

    #[tokio::test]
    async fn test_update_comment_requires_owner() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        let post = seed_post(&state, &new_id());
        let comment = seed_comment(&state, &post.id, &new_id());

        let err = update_comment(
            State(state),
            Caller(new_id()),
            Path(comment.id),
            AppJson(UpdateCommentRequest {
                message: "edited".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_create_comment_on_missing_post() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        let err = create_comment(
            State(state),
            Caller(new_id()),
            AppJson(CreateCommentRequest {
                message: "hello".to_string(),
                post_id: new_id(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_comments_by_post() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        let post = seed_post(&state, &new_id());
        let other = seed_post(&state, &new_id());
        seed_comment(&state, &post.id, &new_id());
        seed_comment(&state, &post.id, &new_id());
        seed_comment(&state, &other.id, &new_id());

        let params = ListCommentsParams {
            limit: 1,
            offset: 0,
            owner_id: None,
            post_id: Some(post.id.clone()),
        };
        let Json(body) = list_comments(State(state), AppQuery(params)).await.unwrap();
        assert_eq!(body.data.pagination.total, 2);
        assert_eq!(body.data.items.len(), 1);
        assert_eq!(body.data.items[0].post_id, post.id);
    }
}

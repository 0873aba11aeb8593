use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use super::comments::{comment_to_response, CommentResponse};
use super::replicate;
use crate::api::response::{require_uuid, ApiError, JSend};
use crate::storage::models::WriteOp;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct ClusterStatusResponse {
    pub cluster_info: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    pub categories_deleted: u64,
    pub comments_deleted: u64,
    pub posts_deleted: u64,
    pub votes_deleted: u64,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn health() -> Json<JSend<HealthResponse>> {
    JSend::success(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn cluster_status(
    State(state): State<Arc<AppState>>,
) -> Json<JSend<ClusterStatusResponse>> {
    let info = state.node.cluster_info().await;
    let peers: Vec<serde_json::Value> = info
        .peers
        .iter()
        .map(|p| {
            serde_json::json!({
                "id": p.id,
                "address": p.address,
                "status": format!("{:?}", p.status),
                "sequence": p.sequence,
            })
        })
        .collect();

    JSend::success(ClusterStatusResponse {
        cluster_info: serde_json::json!({
            "node_id": info.node_id,
            "role": format!("{:?}", info.role),
            "term": info.term,
            "leader_id": info.leader_id,
            "peers": peers,
            "sequence": info.sequence,
        }),
    })
}

pub async fn admin_purge(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<PurgeResponse>>, ApiError> {
    let stats = state
        .db
        .purge_all()
        .map_err(|e| ApiError::internal(e.to_string()))?;

    tracing::warn!(
        categories = stats.categories,
        comments = stats.comments,
        posts = stats.posts,
        votes = stats.votes,
        "Purged all data"
    );

    Ok(JSend::success(PurgeResponse {
        categories_deleted: stats.categories,
        comments_deleted: stats.comments,
        posts_deleted: stats.posts,
        votes_deleted: stats.votes,
    }))
}

/// Recompute a comment's like/dislike counters from its vote rows.
pub async fn recount_comment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<CommentResponse>>, ApiError> {
    require_uuid("id", &id)?;
    state
        .db
        .get_comment(&id)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("Comment not found"))?;

    replicate(&state, WriteOp::RecountComment { id: id.clone() }).await?;

    let comment = state
        .db
        .get_comment(&id)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::internal("Comment not found after recount"))?;

    tracing::info!(
        comment_id = %id,
        likes = comment.likes,
        dislikes = comment.dislikes,
        "Recounted comment reactions"
    );
    Ok(JSend::success(comment_to_response(&comment)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{new_id, seed_comment, seed_post, test_state};

    #[tokio::test]
    async fn test_health() {
        let Json(body) = health().await;
        assert_eq!(body.data.status, "ok");
    }

    #[tokio::test]
    async fn test_admin_purge_counts_rows() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        let post = seed_post(&state, &new_id());
        seed_comment(&state, &post.id, &new_id());
        seed_comment(&state, &post.id, &new_id());

        let Json(body) = admin_purge(State(Arc::clone(&state))).await.unwrap();
        assert_eq!(body.data.posts_deleted, 1);
        assert_eq!(body.data.comments_deleted, 2);
        assert!(state.db.get_post(&post.id).unwrap().is_none());
    }
}

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::replicate;
use crate::api::response::{require_uuid, ApiError, AppJson, Caller, JSend};
use crate::reaction::{Reaction, ReactionState, VoteKey};
use crate::storage::models::{Comment, WriteOp};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ReactionRequest {
    pub post_id: String,
}

/// `applied` describes this request. `state` and the counters are read after
/// it commits, so a concurrent request from the same user may already show.
#[derive(Debug, Serialize)]
pub struct ReactionResponse {
    pub applied: bool,
    pub comment_id: String,
    pub dislikes: u64,
    pub likes: u64,
    pub state: ReactionState,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn like_comment(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
    AppJson(req): AppJson<ReactionRequest>,
) -> Result<Json<JSend<ReactionResponse>>, ApiError> {
    react(&state, caller, id, req, Reaction::Like).await
}

pub async fn dislike_comment(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
    AppJson(req): AppJson<ReactionRequest>,
) -> Result<Json<JSend<ReactionResponse>>, ApiError> {
    react(&state, caller, id, req, Reaction::Dislike).await
}

/// The caller's current reaction on a comment.
pub async fn get_reaction(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<JSend<ReactionResponse>>, ApiError> {
    require_uuid("id", &id)?;
    let comment = live_comment(&state, &id)?;
    let key = VoteKey::new(caller.0, &comment.post_id, &comment.id);

    let current = state
        .db
        .reaction_state(&key)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(JSend::success(reaction_response(&comment, current, false)))
}

// ============================================================================
// Helpers
// ============================================================================

async fn react(
    state: &AppState,
    caller: Caller,
    comment_id: String,
    req: ReactionRequest,
    reaction: Reaction,
) -> Result<Json<JSend<ReactionResponse>>, ApiError> {
    require_uuid("id", &comment_id)?;
    require_uuid("post_id", &req.post_id)?;

    let comment = live_comment(state, &comment_id)?;
    if comment.post_id != req.post_id {
        return Err(ApiError::not_found("Comment not found on this post"));
    }

    let key = VoteKey::new(caller.0, req.post_id, comment_id);
    let operation = WriteOp::ApplyReaction {
        key: key.clone(),
        reaction,
    };
    replicate(state, operation)
        .await
        .map_err(|e| reaction_failure(&key, reaction, e))?;

    let after = state
        .db
        .reaction_state(&key)
        .map_err(|e| ApiError::internal(e.to_string()))?;
    let comment = live_comment(state, &key.comment_id)?;

    tracing::debug!(
        comment_id = %key.comment_id,
        owner_id = %key.owner_id,
        ?reaction,
        state = %after,
        "Reaction applied"
    );

    Ok(JSend::success(reaction_response(&comment, after, true)))
}

/// Store failures reach users as one generic message; the detail is logged.
fn reaction_failure(key: &VoteKey, reaction: Reaction, err: ApiError) -> ApiError {
    match err {
        ApiError::Error(code, detail) if code == StatusCode::INTERNAL_SERVER_ERROR => {
            tracing::error!(
                comment_id = %key.comment_id,
                owner_id = %key.owner_id,
                ?reaction,
                error = %detail,
                "Failed to apply reaction"
            );
            ApiError::internal("Failed to apply reaction")
        }
        other => other,
    }
}

fn live_comment(state: &AppState, id: &str) -> Result<Comment, ApiError> {
    state
        .db
        .get_comment(id)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("Comment not found"))
}

fn reaction_response(comment: &Comment, state: ReactionState, applied: bool) -> ReactionResponse {
    ReactionResponse {
        applied,
        comment_id: comment.id.clone(),
        dislikes: comment.dislikes,
        likes: comment.likes,
        state,
    }
}

mod admin;
mod categories;
mod comments;
mod posts;
mod reactions;

use std::future::Future;
use std::time::Duration;

use crate::api::response::{ApiError, Caller};
use crate::storage::models::WriteOp;
use crate::AppState;

pub use admin::{admin_purge, cluster_status, health, recount_comment};
pub use categories::{
    create_category, delete_category, get_category, list_categories, update_category,
};
pub use comments::{create_comment, delete_comment, get_comment, list_comments, update_comment};
pub use posts::{create_post, delete_post, get_post, list_post_comments, list_posts, update_post};
pub use reactions::{dislike_comment, get_reaction, like_comment};

/// Map a MusterError to an ApiError
fn replication_error(e: muster::MusterError) -> ApiError {
    match e {
        muster::MusterError::NotLeader { .. } => {
            ApiError::unavailable("No leader available, retry shortly")
        }
        muster::MusterError::NoQuorum => {
            ApiError::unavailable("Failed to reach quorum for replication")
        }
        _ => ApiError::internal(e.to_string()),
    }
}

/// Replicate a write, giving up once the configured request deadline passes.
/// A write that already committed before the deadline stays committed.
async fn replicate(state: &AppState, op: WriteOp) -> Result<(), ApiError> {
    within_deadline(state.config.api.request_timeout, state.node.replicate(op)).await
}

async fn within_deadline<F, T>(deadline: Duration, replication: F) -> Result<(), ApiError>
where
    F: Future<Output = Result<T, muster::MusterError>>,
{
    match tokio::time::timeout(deadline, replication).await {
        Ok(result) => result.map(|_| ()).map_err(replication_error),
        Err(_) => {
            tracing::warn!(timeout_ms = deadline.as_millis() as u64, "Replication deadline exceeded");
            Err(ApiError::timeout("Request deadline exceeded"))
        }
    }
}

fn ensure_owner(owner_id: &str, caller: &Caller, resource: &str) -> Result<(), ApiError> {
    if owner_id == caller.0 {
        Ok(())
    } else {
        Err(ApiError::forbidden(format!(
            "Only the owner may modify this {resource}"
        )))
    }
}

fn check_limit(limit: u32, max: u32) -> Result<(), ApiError> {
    if limit == 0 {
        return Err(ApiError::bad_request("limit must be greater than 0"));
    }
    if limit > max {
        return Err(ApiError::bad_request(format!(
            "limit must not exceed {max}"
        )));
    }
    Ok(())
}

fn default_limit() -> u32 {
    20
}

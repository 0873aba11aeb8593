//! content-hub's state machine for muster cluster replication.

use serde::{Deserialize, Serialize};

use crate::reaction::Vote;
use crate::storage::models::{Category, Comment, Post, WriteOp};
use crate::storage::Database;

/// The content state machine, replicated by muster.
pub struct ContentStateMachine {
    db: Database,
}

impl ContentStateMachine {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

/// Full state snapshot for syncing lagging followers.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ContentSnapshot {
    pub categories: Vec<Category>,
    pub comments: Vec<Comment>,
    pub posts: Vec<Post>,
    pub votes: Vec<Vote>,
}

impl muster::StateMachine for ContentStateMachine {
    type WriteOp = WriteOp;
    type Snapshot = ContentSnapshot;

    fn apply(&self, op: &WriteOp) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        match op {
            WriteOp::CreateCategory(category) => {
                self.db.put_category(category)?;
            }
            WriteOp::UpdateCategory {
                id,
                name,
                updated_at,
            } => {
                self.db.update_category(id, name, *updated_at)?;
            }
            WriteOp::DeleteCategory { id } => {
                self.db.delete_category(id)?;
            }
            WriteOp::CreatePost(post) => {
                self.db.put_post(post)?;
            }
            WriteOp::UpdatePost {
                id,
                changes,
                updated_at,
            } => {
                self.db.update_post(id, changes, *updated_at)?;
            }
            WriteOp::DeletePost { id, deleted_at } => {
                self.db.delete_post(id, *deleted_at)?;
            }
            WriteOp::RecordPostView { id } => {
                self.db.record_post_view(id)?;
            }
            WriteOp::CreateComment(comment) => {
                self.db.put_comment(comment)?;
            }
            WriteOp::UpdateComment {
                id,
                message,
                updated_at,
            } => {
                self.db.update_comment_message(id, message, *updated_at)?;
            }
            WriteOp::DeleteComment { id, deleted_at } => {
                self.db.delete_comment(id, *deleted_at)?;
            }
            WriteOp::ApplyReaction { key, reaction } => {
                self.db.apply_reaction(key, *reaction)?;
            }
            WriteOp::RecountComment { id } => {
                self.db.recount_comment(id)?;
            }
        }
        Ok(())
    }

    fn snapshot(&self) -> Result<ContentSnapshot, Box<dyn std::error::Error + Send + Sync>> {
        Ok(ContentSnapshot {
            categories: self.db.get_all_categories()?,
            comments: self.db.get_all_comments()?,
            posts: self.db.get_all_posts()?,
            votes: self.db.get_all_votes()?,
        })
    }

    /// Replaces the local tables wholesale. A lagging follower may hold rows
    /// the leader has since removed, and counters travel inside the comment
    /// records, so stale vote rows must not survive the restore.
    fn restore(
        &self,
        snapshot: ContentSnapshot,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let replaced = self.db.replace_all(
            &snapshot.categories,
            &snapshot.posts,
            &snapshot.comments,
            &snapshot.votes,
        )?;
        tracing::info!(
            categories = snapshot.categories.len(),
            comments = snapshot.comments.len(),
            posts = snapshot.posts.len(),
            votes = snapshot.votes.len(),
            replaced_votes = replaced.votes,
            "Restored snapshot"
        );
        Ok(())
    }
}

use chrono::{DateTime, Utc};
use redb::ReadableTable;

use super::db::{Database, DatabaseError};
use super::models::{Comment, CommentFilter};
use super::tables::*;

impl Database {
    // ========================================================================
    // Comment operations
    // ========================================================================

    /// Store a comment and add it to its post's comment index
    pub fn put_comment(&self, comment: &Comment) -> Result<(), DatabaseError> {
        debug_assert!(!comment.id.is_empty(), "comment id must not be empty");
        debug_assert!(!comment.post_id.is_empty(), "comment post_id must not be empty");

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(COMMENTS)?;
            let data = rmp_serde::to_vec_named(comment)?;
            table.insert(comment.id.as_str(), data.as_slice())?;

            let mut index = write_txn.open_table(POST_COMMENTS)?;
            let mut comment_ids: Vec<String> = match index.get(comment.post_id.as_str())? {
                Some(v) => rmp_serde::from_slice(v.value())?,
                None => Vec::new(),
            };

            if !comment_ids.contains(&comment.id) {
                comment_ids.push(comment.id.clone());
                let index_data = rmp_serde::to_vec_named(&comment_ids)?;
                index.insert(comment.post_id.as_str(), index_data.as_slice())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get a live (not soft-deleted) comment by its UUID
    pub fn get_comment(&self, id: &str) -> Result<Option<Comment>, DatabaseError> {
        Ok(self
            .get_comment_including_deleted(id)?
            .filter(|comment| !comment.is_deleted()))
    }

    pub fn get_comment_including_deleted(
        &self,
        id: &str,
    ) -> Result<Option<Comment>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(COMMENTS)?;

        match table.get(id)? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    /// Replace a live comment's message. Counters are left alone.
    pub fn update_comment_message(
        &self,
        id: &str,
        message: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        self.modify_live_comment(id, |comment| {
            comment.message = message.to_string();
            comment.updated_at = updated_at;
        })
    }

    /// Soft delete. Votes on the comment are kept.
    pub fn delete_comment(
        &self,
        id: &str,
        deleted_at: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        self.modify_live_comment(id, |comment| comment.deleted_at = Some(deleted_at))
    }

    fn modify_live_comment<F>(&self, id: &str, f: F) -> Result<bool, DatabaseError>
    where
        F: FnOnce(&mut Comment),
    {
        let write_txn = self.begin_write()?;
        let modified = {
            let mut table = write_txn.open_table(COMMENTS)?;
            let existing: Option<Comment> = match table.get(id)? {
                Some(data) => Some(rmp_serde::from_slice(data.value())?),
                None => None,
            };

            match existing.filter(|comment| !comment.is_deleted()) {
                Some(mut comment) => {
                    f(&mut comment);
                    let data = rmp_serde::to_vec_named(&comment)?;
                    table.insert(id, data.as_slice())?;
                    true
                }
                None => false,
            }
        };
        write_txn.commit()?;
        Ok(modified)
    }

    /// Get all comments of a post through the post index, deleted ones included
    pub fn get_comments_by_post(&self, post_id: &str) -> Result<Vec<Comment>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let index = read_txn.open_table(POST_COMMENTS)?;
        let table = read_txn.open_table(COMMENTS)?;

        let comment_ids: Vec<String> = match index.get(post_id)? {
            Some(data) => rmp_serde::from_slice(data.value())?,
            None => return Ok(Vec::new()),
        };

        let mut comments = Vec::new();
        for comment_id in comment_ids {
            if let Some(data) = table.get(comment_id.as_str())? {
                comments.push(rmp_serde::from_slice(data.value())?);
            }
        }
        Ok(comments)
    }

    /// List live comments matching `filter`, oldest first
    pub fn list_comments(&self, filter: &CommentFilter) -> Result<Vec<Comment>, DatabaseError> {
        // Use the post index when post_id is provided
        let all = match filter.post_id {
            Some(ref post_id) => self.get_comments_by_post(post_id)?,
            None => self.get_all_comments()?,
        };

        let mut comments: Vec<Comment> = all
            .into_iter()
            .filter(|c| !c.is_deleted())
            .filter(|c| filter.owner_id.as_ref().map_or(true, |o| &c.owner_id == o))
            .collect();

        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(comments)
    }

    /// Get all comments (for snapshot/restore)
    pub fn get_all_comments(&self) -> Result<Vec<Comment>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(COMMENTS)?;

        let mut comments = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            comments.push(rmp_serde::from_slice(value.value())?);
        }
        Ok(comments)
    }
}

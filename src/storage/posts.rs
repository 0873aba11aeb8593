use chrono::{DateTime, Utc};
use redb::ReadableTable;

use super::db::{Database, DatabaseError};
use super::models::{Post, PostChanges, PostFilter};
use super::tables::*;

impl Database {
    // ========================================================================
    // Post operations
    // ========================================================================

    pub fn put_post(&self, post: &Post) -> Result<(), DatabaseError> {
        debug_assert!(!post.id.is_empty(), "post id must not be empty");

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(POSTS)?;
            let data = rmp_serde::to_vec_named(post)?;
            table.insert(post.id.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get a live (not soft-deleted) post by its UUID
    pub fn get_post(&self, id: &str) -> Result<Option<Post>, DatabaseError> {
        Ok(self
            .get_post_including_deleted(id)?
            .filter(|post| !post.is_deleted()))
    }

    pub fn get_post_including_deleted(&self, id: &str) -> Result<Option<Post>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(POSTS)?;

        match table.get(id)? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    /// Apply `changes` to a live post. Returns false if it does not exist.
    pub fn update_post(
        &self,
        id: &str,
        changes: &PostChanges,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        self.modify_live_post(id, |post| {
            if let Some(ref category_id) = changes.category_id {
                post.category_id = category_id.clone();
            }
            if let Some(price) = changes.price {
                post.price = price;
            }
            if let Some(price_status) = changes.price_status {
                post.price_status = price_status;
            }
            if let Some(ref science) = changes.science {
                post.science = science.clone();
            }
            if let Some(ref theme) = changes.theme {
                post.theme = theme.clone();
            }
            post.updated_at = updated_at;
        })
    }

    /// Soft delete. Returns false if the post is missing or already deleted.
    pub fn delete_post(&self, id: &str, deleted_at: DateTime<Utc>) -> Result<bool, DatabaseError> {
        self.modify_live_post(id, |post| post.deleted_at = Some(deleted_at))
    }

    pub fn record_post_view(&self, id: &str) -> Result<bool, DatabaseError> {
        self.modify_live_post(id, |post| post.views += 1)
    }

    fn modify_live_post<F>(&self, id: &str, f: F) -> Result<bool, DatabaseError>
    where
        F: FnOnce(&mut Post),
    {
        let write_txn = self.begin_write()?;
        let modified = {
            let mut table = write_txn.open_table(POSTS)?;
            let existing: Option<Post> = match table.get(id)? {
                Some(data) => Some(rmp_serde::from_slice(data.value())?),
                None => None,
            };

            match existing.filter(|post| !post.is_deleted()) {
                Some(mut post) => {
                    f(&mut post);
                    let data = rmp_serde::to_vec_named(&post)?;
                    table.insert(id, data.as_slice())?;
                    true
                }
                None => false,
            }
        };
        write_txn.commit()?;
        Ok(modified)
    }

    /// List live posts matching `filter`, oldest first
    pub fn list_posts(&self, filter: &PostFilter) -> Result<Vec<Post>, DatabaseError> {
        let terms: Vec<String> = filter
            .search
            .as_deref()
            .map(|s| s.split_whitespace().map(str::to_lowercase).collect())
            .unwrap_or_default();

        let mut posts: Vec<Post> = self
            .get_all_posts()?
            .into_iter()
            .filter(|p| !p.is_deleted())
            .filter(|p| filter.owner_id.as_ref().map_or(true, |o| &p.owner_id == o))
            .filter(|p| {
                filter
                    .category_id
                    .as_ref()
                    .map_or(true, |c| &p.category_id == c)
            })
            .filter(|p| theme_matches(&p.theme, &terms))
            .collect();

        posts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(posts)
    }

    /// Get all posts, deleted ones included (for snapshot/restore)
    pub fn get_all_posts(&self) -> Result<Vec<Post>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(POSTS)?;

        let mut posts = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            posts.push(rmp_serde::from_slice(value.value())?);
        }
        Ok(posts)
    }
}

/// True when every term occurs in `theme` in the given order.
fn theme_matches(theme: &str, terms: &[String]) -> bool {
    let theme = theme.to_lowercase();
    let mut rest = theme.as_str();
    for term in terms {
        match rest.find(term.as_str()) {
            Some(pos) => rest = &rest[pos + term.len()..],
            None => return false,
        }
    }
    true
}

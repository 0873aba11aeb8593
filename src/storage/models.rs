use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::reaction::{Reaction, VoteKey};

/// A post category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A post record stored in redb. Deletion is soft: `deleted_at` is set and
/// the record disappears from reads and listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub owner_id: String,
    pub category_id: String,
    pub theme: String,
    pub science: String,
    pub price: f64,
    /// Whether `price` applies; free posts keep `price` at 0.
    pub price_status: bool,
    pub views: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Post {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Mutable post fields. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostChanges {
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub price_status: Option<bool>,
    #[serde(default)]
    pub science: Option<String>,
    #[serde(default)]
    pub theme: Option<String>,
}

impl PostChanges {
    pub fn is_empty(&self) -> bool {
        self.category_id.is_none()
            && self.price.is_none()
            && self.price_status.is_none()
            && self.science.is_none()
            && self.theme.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub category_id: Option<String>,
    pub owner_id: Option<String>,
    /// Case-insensitive theme search; every whitespace-separated term must
    /// appear, in order.
    pub search: Option<String>,
}

/// A comment with its denormalized reaction counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub owner_id: String,
    pub message: String,
    pub likes: u64,
    pub dislikes: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Comment {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CommentFilter {
    pub owner_id: Option<String>,
    pub post_id: Option<String>,
}

/// Types of write operations (replicated via muster). Each op carries its
/// own ids and timestamps so every node applies it identically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WriteOp {
    CreateCategory(Category),
    UpdateCategory {
        id: String,
        name: String,
        updated_at: DateTime<Utc>,
    },
    DeleteCategory {
        id: String,
    },
    CreatePost(Post),
    UpdatePost {
        id: String,
        changes: PostChanges,
        updated_at: DateTime<Utc>,
    },
    DeletePost {
        id: String,
        deleted_at: DateTime<Utc>,
    },
    RecordPostView {
        id: String,
    },
    CreateComment(Comment),
    UpdateComment {
        id: String,
        message: String,
        updated_at: DateTime<Utc>,
    },
    DeleteComment {
        id: String,
        deleted_at: DateTime<Utc>,
    },
    ApplyReaction {
        key: VoteKey,
        reaction: Reaction,
    },
    RecountComment {
        id: String,
    },
}

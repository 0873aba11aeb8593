//! Comment reactions: the like/dislike toggle state machine.
//!
//! A user's reaction on a comment is one of three states. Repeating the same
//! action toggles it off, the opposite action flips it. Every transition
//! mutates exactly one vote row and one or two counters on the comment.
//!
//! The engine is written against two seams, [`VoteStore`] and
//! [`CommentCounters`]. The redb-backed implementation runs both inside a
//! single write transaction (see `storage::reactions`).

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReactionError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("{counter} counter of comment {comment_id} would drop below zero")]
    CounterUnderflow { comment_id: String, counter: Counter },
    #[error("Store failure: {0}")]
    StoreFailure(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Requested reaction direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reaction {
    Like,
    Dislike,
}

impl Reaction {
    /// Stored vote status for this direction (`true` = like).
    pub fn status(self) -> bool {
        matches!(self, Reaction::Like)
    }
}

/// A user's current reaction on one comment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionState {
    #[default]
    None,
    Liked,
    Disliked,
}

impl ReactionState {
    pub fn from_status(status: Option<bool>) -> Self {
        match status {
            None => ReactionState::None,
            Some(true) => ReactionState::Liked,
            Some(false) => ReactionState::Disliked,
        }
    }

    /// The vote status persisted for this state, `None` meaning no row.
    pub fn status(self) -> Option<bool> {
        match self {
            ReactionState::None => None,
            ReactionState::Liked => Some(true),
            ReactionState::Disliked => Some(false),
        }
    }

    /// Compute the transition taken when `reaction` is requested in this state.
    pub fn next(self, reaction: Reaction) -> Transition {
        use Reaction::*;
        use ReactionState::*;

        let (to, change, likes, dislikes) = match (self, reaction) {
            (None, Like) => (Liked, VoteChange::Insert(true), 1, 0),
            (Liked, Like) => (None, VoteChange::Delete, -1, 0),
            (Disliked, Like) => (Liked, VoteChange::Update(true), 1, -1),
            (None, Dislike) => (Disliked, VoteChange::Insert(false), 0, 1),
            (Disliked, Dislike) => (None, VoteChange::Delete, 0, -1),
            (Liked, Dislike) => (Disliked, VoteChange::Update(false), -1, 1),
        };

        Transition {
            from: self,
            to,
            change,
            delta: CounterDelta { likes, dislikes },
        }
    }
}

impl fmt::Display for ReactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReactionState::None => "none",
            ReactionState::Liked => "liked",
            ReactionState::Disliked => "disliked",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    Likes,
    Dislikes,
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Counter::Likes => f.write_str("likes"),
            Counter::Dislikes => f.write_str("dislikes"),
        }
    }
}

/// Relative change applied to a comment's counters, each in {-1, 0, 1}.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterDelta {
    pub likes: i8,
    pub dislikes: i8,
}

/// The single vote-row mutation a transition performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteChange {
    /// Create the row with this status.
    Insert(bool),
    /// Flip an existing row to this status.
    Update(bool),
    /// Remove the row (un-vote).
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: ReactionState,
    pub to: ReactionState,
    pub change: VoteChange,
    pub delta: CounterDelta,
}

impl Transition {
    /// Every defined transition changes state, so a returned transition was applied.
    pub fn applied(&self) -> bool {
        self.from != self.to
    }
}

/// Identifies the single vote a user may hold on a comment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoteKey {
    pub owner_id: String,
    pub post_id: String,
    pub comment_id: String,
}

impl VoteKey {
    pub fn new(
        owner_id: impl Into<String>,
        post_id: impl Into<String>,
        comment_id: impl Into<String>,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            post_id: post_id.into(),
            comment_id: comment_id.into(),
        }
    }

    /// Storage key, comment first so all votes of a comment sort together.
    pub fn storage_key(&self) -> String {
        format!("{}/{}/{}", self.comment_id, self.post_id, self.owner_id)
    }
}

/// A persisted reaction. `status == true` is a like.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub owner_id: String,
    pub post_id: String,
    pub comment_id: String,
    pub status: bool,
}

impl Vote {
    pub fn new(key: &VoteKey, status: bool) -> Self {
        Self {
            owner_id: key.owner_id.clone(),
            post_id: key.post_id.clone(),
            comment_id: key.comment_id.clone(),
            status,
        }
    }

    pub fn key(&self) -> VoteKey {
        VoteKey::new(&self.owner_id, &self.post_id, &self.comment_id)
    }
}

// ============================================================================
// Store seams
// ============================================================================

pub trait VoteStore {
    fn exists(&self, key: &VoteKey) -> Result<bool, ReactionError> {
        Ok(self.get(key)?.is_some())
    }

    fn get(&self, key: &VoteKey) -> Result<Option<Vote>, ReactionError>;

    fn insert(&mut self, vote: &Vote) -> Result<(), ReactionError>;

    /// Fails with `NotFound` when no vote exists for `key`.
    fn update_status(&mut self, key: &VoteKey, status: bool) -> Result<(), ReactionError>;

    /// Fails with `NotFound` when no vote exists for `key`.
    fn delete(&mut self, key: &VoteKey) -> Result<(), ReactionError>;
}

/// Relative updates on a comment's aggregate counters. Each call fails with
/// `NotFound` if the comment does not exist.
pub trait CommentCounters {
    fn increment_likes(&mut self, comment_id: &str) -> Result<(), ReactionError>;
    fn decrement_likes(&mut self, comment_id: &str) -> Result<(), ReactionError>;
    fn increment_dislikes(&mut self, comment_id: &str) -> Result<(), ReactionError>;
    fn decrement_dislikes(&mut self, comment_id: &str) -> Result<(), ReactionError>;
}

// ============================================================================
// Engine
// ============================================================================

pub fn apply_like<S>(store: &mut S, key: &VoteKey) -> Result<Transition, ReactionError>
where
    S: VoteStore + CommentCounters,
{
    apply_reaction(store, key, Reaction::Like)
}

pub fn apply_dislike<S>(store: &mut S, key: &VoteKey) -> Result<Transition, ReactionError>
where
    S: VoteStore + CommentCounters,
{
    apply_reaction(store, key, Reaction::Dislike)
}

/// Move the vote for `key` to its next state and adjust the comment counters.
///
/// Any failing step aborts the rest. Callers that need all-or-nothing
/// behaviour must run this inside a transaction and discard it on error.
pub fn apply_reaction<S>(
    store: &mut S,
    key: &VoteKey,
    reaction: Reaction,
) -> Result<Transition, ReactionError>
where
    S: VoteStore + CommentCounters,
{
    let current = current_state(store, key)?;
    let transition = current.next(reaction);

    match transition.change {
        VoteChange::Insert(status) => store.insert(&Vote::new(key, status))?,
        VoteChange::Update(status) => store.update_status(key, status)?,
        VoteChange::Delete => store.delete(key)?,
    }

    apply_delta(store, &key.comment_id, transition.delta)?;

    tracing::debug!(
        comment_id = %key.comment_id,
        owner_id = %key.owner_id,
        from = %transition.from,
        to = %transition.to,
        "Applied reaction"
    );

    Ok(transition)
}

/// Current state for `key`, read through the vote store.
pub fn current_state<S: VoteStore + ?Sized>(
    store: &S,
    key: &VoteKey,
) -> Result<ReactionState, ReactionError> {
    if !store.exists(key)? {
        return Ok(ReactionState::None);
    }
    let vote = store
        .get(key)?
        .ok_or_else(|| ReactionError::NotFound(format!("vote {}", key.storage_key())))?;
    Ok(ReactionState::from_status(Some(vote.status)))
}

/// Decrements run before increments so a flip never reads as an extra vote.
fn apply_delta<S: CommentCounters>(
    store: &mut S,
    comment_id: &str,
    delta: CounterDelta,
) -> Result<(), ReactionError> {
    if delta.likes < 0 {
        store.decrement_likes(comment_id)?;
    }
    if delta.dislikes < 0 {
        store.decrement_dislikes(comment_id)?;
    }
    if delta.likes > 0 {
        store.increment_likes(comment_id)?;
    }
    if delta.dislikes > 0 {
        store.increment_dislikes(comment_id)?;
    }
    Ok(())
}

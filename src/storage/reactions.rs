use redb::{ReadableTable, WriteTransaction};

use super::db::{Database, DatabaseError};
use super::models::Comment;
use super::tables::*;
use crate::reaction::{
    self, CommentCounters, Counter, Reaction, ReactionError, ReactionState, Transition, Vote,
    VoteKey, VoteStore,
};

impl From<DatabaseError> for ReactionError {
    fn from(e: DatabaseError) -> Self {
        ReactionError::StoreFailure(Box::new(e))
    }
}

/// Vote and counter seams backed by one open redb write transaction.
/// Nothing is visible to other readers until the transaction commits.
pub struct TxnReactionStore<'txn> {
    txn: &'txn WriteTransaction,
}

impl<'txn> TxnReactionStore<'txn> {
    pub fn new(txn: &'txn WriteTransaction) -> Self {
        Self { txn }
    }

    fn read_vote(&self, key: &VoteKey) -> Result<Option<Vote>, DatabaseError> {
        let table = self.txn.open_table(VOTES)?;
        let vote = match table.get(key.storage_key().as_str())? {
            Some(data) => Some(rmp_serde::from_slice(data.value())?),
            None => None,
        };
        Ok(vote)
    }

    fn write_vote(&self, vote: &Vote) -> Result<(), DatabaseError> {
        let mut table = self.txn.open_table(VOTES)?;
        let data = rmp_serde::to_vec_named(vote)?;
        table.insert(vote.key().storage_key().as_str(), data.as_slice())?;
        Ok(())
    }

    fn remove_vote(&self, key: &VoteKey) -> Result<bool, DatabaseError> {
        let mut table = self.txn.open_table(VOTES)?;
        let removed = table.remove(key.storage_key().as_str())?.is_some();
        Ok(removed)
    }

    fn read_comment(&self, id: &str) -> Result<Option<Comment>, DatabaseError> {
        let table = self.txn.open_table(COMMENTS)?;
        let comment: Option<Comment> = match table.get(id)? {
            Some(data) => Some(rmp_serde::from_slice(data.value())?),
            None => None,
        };
        Ok(comment.filter(|c| !c.is_deleted()))
    }

    fn write_comment(&self, comment: &Comment) -> Result<(), DatabaseError> {
        let mut table = self.txn.open_table(COMMENTS)?;
        let data = rmp_serde::to_vec_named(comment)?;
        table.insert(comment.id.as_str(), data.as_slice())?;
        Ok(())
    }

    /// Relative update of one counter. The transaction holds redb's single
    /// writer lock, so the read and write below cannot interleave with another.
    fn adjust(&self, comment_id: &str, counter: Counter, up: bool) -> Result<(), ReactionError> {
        let mut comment = self
            .read_comment(comment_id)?
            .ok_or_else(|| ReactionError::NotFound(format!("comment {comment_id}")))?;

        let value = match counter {
            Counter::Likes => &mut comment.likes,
            Counter::Dislikes => &mut comment.dislikes,
        };
        *value = if up {
            *value + 1
        } else {
            value
                .checked_sub(1)
                .ok_or_else(|| ReactionError::CounterUnderflow {
                    comment_id: comment_id.to_string(),
                    counter,
                })?
        };

        self.write_comment(&comment)?;
        Ok(())
    }
}

impl VoteStore for TxnReactionStore<'_> {
    fn get(&self, key: &VoteKey) -> Result<Option<Vote>, ReactionError> {
        Ok(self.read_vote(key)?)
    }

    fn insert(&mut self, vote: &Vote) -> Result<(), ReactionError> {
        Ok(self.write_vote(vote)?)
    }

    fn update_status(&mut self, key: &VoteKey, status: bool) -> Result<(), ReactionError> {
        let mut vote = self
            .read_vote(key)?
            .ok_or_else(|| ReactionError::NotFound(format!("vote {}", key.storage_key())))?;
        vote.status = status;
        Ok(self.write_vote(&vote)?)
    }

    fn delete(&mut self, key: &VoteKey) -> Result<(), ReactionError> {
        if self.remove_vote(key)? {
            Ok(())
        } else {
            Err(ReactionError::NotFound(format!(
                "vote {}",
                key.storage_key()
            )))
        }
    }
}

impl CommentCounters for TxnReactionStore<'_> {
    fn increment_likes(&mut self, comment_id: &str) -> Result<(), ReactionError> {
        self.adjust(comment_id, Counter::Likes, true)
    }

    fn decrement_likes(&mut self, comment_id: &str) -> Result<(), ReactionError> {
        self.adjust(comment_id, Counter::Likes, false)
    }

    fn increment_dislikes(&mut self, comment_id: &str) -> Result<(), ReactionError> {
        self.adjust(comment_id, Counter::Dislikes, true)
    }

    fn decrement_dislikes(&mut self, comment_id: &str) -> Result<(), ReactionError> {
        self.adjust(comment_id, Counter::Dislikes, false)
    }
}

impl Database {
    // ========================================================================
    // Reaction operations
    // ========================================================================

    /// Apply a like or dislike for `key`. The vote change and the counter
    /// changes commit together or not at all.
    pub fn apply_reaction(
        &self,
        key: &VoteKey,
        reaction: Reaction,
    ) -> Result<Transition, ReactionError> {
        let write_txn = self.begin_write()?;

        let result = {
            let mut store = TxnReactionStore::new(&write_txn);
            reaction::apply_reaction(&mut store, key, reaction)
        };

        match result {
            Ok(transition) => {
                write_txn.commit().map_err(DatabaseError::from)?;
                Ok(transition)
            }
            Err(e) => {
                if let Err(abort_err) = write_txn.abort() {
                    tracing::warn!(error = %abort_err, "Failed to abort reaction transaction");
                }
                Err(e)
            }
        }
    }

    pub fn get_vote(&self, key: &VoteKey) -> Result<Option<Vote>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(VOTES)?;

        match table.get(key.storage_key().as_str())? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    pub fn reaction_state(&self, key: &VoteKey) -> Result<ReactionState, DatabaseError> {
        Ok(ReactionState::from_status(
            self.get_vote(key)?.map(|v| v.status),
        ))
    }

    /// Store a vote row as-is, without touching counters
    pub fn put_vote(&self, vote: &Vote) -> Result<(), DatabaseError> {
        let write_txn = self.begin_write()?;
        TxnReactionStore::new(&write_txn).write_vote(vote)?;
        write_txn.commit()?;
        Ok(())
    }

    /// All votes on one comment (prefix scan over the comment-first key)
    pub fn votes_for_comment(&self, comment_id: &str) -> Result<Vec<Vote>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(VOTES)?;
        let (start, end) = comment_key_range(comment_id);

        let mut votes = Vec::new();
        for result in table.range(start.as_str()..end.as_str())? {
            let (_, value) = result?;
            votes.push(rmp_serde::from_slice(value.value())?);
        }
        Ok(votes)
    }

    /// Get all votes (for snapshot/restore)
    pub fn get_all_votes(&self) -> Result<Vec<Vote>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(VOTES)?;

        let mut votes = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            votes.push(rmp_serde::from_slice(value.value())?);
        }
        Ok(votes)
    }

    /// Recompute a live comment's counters from its vote rows, repairing any
    /// drift. Returns the updated comment, or `None` if it does not exist.
    pub fn recount_comment(&self, id: &str) -> Result<Option<Comment>, DatabaseError> {
        let write_txn = self.begin_write()?;

        let recounted = {
            let store = TxnReactionStore::new(&write_txn);
            match store.read_comment(id)? {
                Some(mut comment) => {
                    let (mut likes, mut dislikes) = (0u64, 0u64);
                    {
                        let table = write_txn.open_table(VOTES)?;
                        let (start, end) = comment_key_range(id);
                        for result in table.range(start.as_str()..end.as_str())? {
                            let (_, value) = result?;
                            let vote: Vote = rmp_serde::from_slice(value.value())?;
                            if vote.status {
                                likes += 1;
                            } else {
                                dislikes += 1;
                            }
                        }
                    }

                    if comment.likes != likes || comment.dislikes != dislikes {
                        tracing::warn!(
                            comment_id = %id,
                            stored_likes = comment.likes,
                            stored_dislikes = comment.dislikes,
                            likes,
                            dislikes,
                            "Repaired counter drift"
                        );
                    }
                    comment.likes = likes;
                    comment.dislikes = dislikes;
                    store.write_comment(&comment)?;
                    Some(comment)
                }
                None => None,
            }
        };

        write_txn.commit()?;
        Ok(recounted)
    }
}

/// Key bounds covering every "comment_id/..." vote key. '0' follows '/'.
fn comment_key_range(comment_id: &str) -> (String, String) {
    (format!("{comment_id}/"), format!("{comment_id}0"))
}

use redb::{
    Database as RedbDatabase, ReadTransaction, ReadableTable, TableDefinition, WriteTransaction,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use super::models::{Category, Comment, Post};
use super::tables::*;
use crate::reaction::Vote;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Commit error: {0}")]
    Commit(Box<redb::CommitError>),
    #[error("Database error: {0}")]
    Redb(Box<redb::Error>),
    #[error("Database error: {0}")]
    RedbDatabase(Box<redb::DatabaseError>),
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] rmp_serde::decode::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] rmp_serde::encode::Error),
    #[error("Storage error: {0}")]
    Storage(Box<redb::StorageError>),
    #[error("Table error: {0}")]
    Table(Box<redb::TableError>),
    #[error("Transaction error: {0}")]
    Transaction(Box<redb::TransactionError>),
}

impl From<redb::CommitError> for DatabaseError {
    fn from(e: redb::CommitError) -> Self {
        DatabaseError::Commit(Box::new(e))
    }
}

impl From<redb::DatabaseError> for DatabaseError {
    fn from(e: redb::DatabaseError) -> Self {
        DatabaseError::RedbDatabase(Box::new(e))
    }
}

impl From<redb::Error> for DatabaseError {
    fn from(e: redb::Error) -> Self {
        DatabaseError::Redb(Box::new(e))
    }
}

impl From<redb::StorageError> for DatabaseError {
    fn from(e: redb::StorageError) -> Self {
        DatabaseError::Storage(Box::new(e))
    }
}

impl From<redb::TableError> for DatabaseError {
    fn from(e: redb::TableError) -> Self {
        DatabaseError::Table(Box::new(e))
    }
}

impl From<redb::TransactionError> for DatabaseError {
    fn from(e: redb::TransactionError) -> Self {
        DatabaseError::Transaction(Box::new(e))
    }
}

pub struct Database {
    db: Arc<RedbDatabase>,
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
        }
    }
}

/// Statistics from a purge operation
#[derive(Debug, Default)]
pub struct PurgeStats {
    pub categories: u64,
    pub comments: u64,
    pub posts: u64,
    pub votes: u64,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, DatabaseError> {
        std::fs::create_dir_all(data_dir.as_ref())?;
        let db_path = data_dir.as_ref().join("content-hub.redb");
        let db = Arc::new(RedbDatabase::create(db_path)?);

        // Initialize application tables
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(CATEGORIES)?;
            let _ = write_txn.open_table(POSTS)?;
            let _ = write_txn.open_table(COMMENTS)?;
            let _ = write_txn.open_table(POST_COMMENTS)?;
            let _ = write_txn.open_table(VOTES)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Get a reference to the underlying redb database (for sharing with muster).
    pub fn inner(&self) -> Arc<RedbDatabase> {
        Arc::clone(&self.db)
    }

    /// Begin a read transaction
    pub fn begin_read(&self) -> Result<ReadTransaction, DatabaseError> {
        Ok(self.db.begin_read()?)
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> Result<WriteTransaction, DatabaseError> {
        Ok(self.db.begin_write()?)
    }

    // ========================================================================
    // Admin operations
    // ========================================================================

    /// Purge all data - for testing only
    pub fn purge_all(&self) -> Result<PurgeStats, DatabaseError> {
        let write_txn = self.begin_write()?;
        let stats = PurgeStats {
            categories: clear_table(&write_txn, CATEGORIES)?,
            comments: clear_table(&write_txn, COMMENTS)?,
            posts: clear_table(&write_txn, POSTS)?,
            votes: clear_table(&write_txn, VOTES)?,
        };
        clear_table(&write_txn, POST_COMMENTS)?;

        write_txn.commit()?;
        Ok(stats)
    }

    /// Replace every table with the given rows in one write transaction.
    /// Rows absent from the input are gone afterwards, so counters and vote
    /// rows always come from the same source.
    pub fn replace_all(
        &self,
        categories: &[Category],
        posts: &[Post],
        comments: &[Comment],
        votes: &[Vote],
    ) -> Result<PurgeStats, DatabaseError> {
        let write_txn = self.begin_write()?;
        let replaced = PurgeStats {
            categories: clear_table(&write_txn, CATEGORIES)?,
            comments: clear_table(&write_txn, COMMENTS)?,
            posts: clear_table(&write_txn, POSTS)?,
            votes: clear_table(&write_txn, VOTES)?,
        };
        clear_table(&write_txn, POST_COMMENTS)?;

        {
            let mut table = write_txn.open_table(CATEGORIES)?;
            for category in categories {
                insert_record(&mut table, &category.id, category)?;
            }

            let mut table = write_txn.open_table(POSTS)?;
            for post in posts {
                insert_record(&mut table, &post.id, post)?;
            }

            let mut table = write_txn.open_table(COMMENTS)?;
            let mut by_post: BTreeMap<&str, Vec<String>> = BTreeMap::new();
            for comment in comments {
                insert_record(&mut table, &comment.id, comment)?;
                let ids = by_post.entry(comment.post_id.as_str()).or_default();
                if !ids.contains(&comment.id) {
                    ids.push(comment.id.clone());
                }
            }

            let mut index = write_txn.open_table(POST_COMMENTS)?;
            for (post_id, ids) in &by_post {
                insert_record(&mut index, post_id, ids)?;
            }

            let mut table = write_txn.open_table(VOTES)?;
            for vote in votes {
                insert_record(&mut table, &vote.key().storage_key(), vote)?;
            }
        }

        write_txn.commit()?;
        Ok(replaced)
    }
}

fn insert_record<T: Serialize>(
    table: &mut redb::Table<'_, &'static str, &'static [u8]>,
    key: &str,
    record: &T,
) -> Result<(), DatabaseError> {
    let data = rmp_serde::to_vec_named(record)?;
    table.insert(key, data.as_slice())?;
    Ok(())
}

/// Remove every row of `table`, returning how many were removed.
fn clear_table(
    write_txn: &WriteTransaction,
    table: TableDefinition<'static, &'static str, &'static [u8]>,
) -> Result<u64, DatabaseError> {
    let keys: Vec<String> = {
        let t = write_txn.open_table(table)?;
        let keys = t
            .iter()?
            .map(|r| r.map(|(k, _)| k.value().to_string()))
            .collect::<Result<Vec<_>, _>>()?;
        keys
    };

    let mut t = write_txn.open_table(table)?;
    for key in &keys {
        t.remove(key.as_str())?;
    }
    Ok(keys.len() as u64)
}

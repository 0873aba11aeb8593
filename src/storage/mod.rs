mod categories;
mod comments;
pub mod db;
pub mod models;
mod posts;
mod reactions;
mod tables;

pub use db::{Database, DatabaseError, PurgeStats};
pub use reactions::TxnReactionStore;
pub use tables::*;

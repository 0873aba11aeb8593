//! content-hub - REST backend for a content-sharing platform
//!
//! This crate provides categories, posts, comments and comment reactions with:
//! - A like/dislike toggle state machine kept in lockstep with comment counters
//! - Content replicated via muster (Raft-like clustering)
//! - redb embedded database (ACID, MVCC, crash-safe), one transaction per reaction
//! - REST API with JSend envelopes

pub mod api;
pub mod config;
pub mod reaction;
pub mod state_machine;
pub mod storage;
#[cfg(test)]
pub mod testutil;

use std::sync::Arc;

use config::Config;
use state_machine::ContentStateMachine;
use storage::Database;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub node: Arc<muster::RedbNode<ContentStateMachine>>,
}

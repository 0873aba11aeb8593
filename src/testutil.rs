//! Shared test helpers for handler tests.

use std::sync::Arc;

use chrono::Utc;

use crate::config::{ApiConfig, ClusterConfig, Config, NodeConfig};
use crate::state_machine::ContentStateMachine;
use crate::storage::models::{Comment, Post};
use crate::storage::Database;
use crate::AppState;

/// Create a test AppState with a temporary database.
pub fn test_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    let data_dir = temp_dir.path().join("data");

    let config = Config {
        node: NodeConfig {
            id: uuid::Uuid::new_v4().to_string(),
            bind_address: "127.0.0.1:0".to_string(),
            data_dir: data_dir.to_string_lossy().to_string(),
        },
        cluster: ClusterConfig::default(),
        api: ApiConfig::default(),
        test_mode: true,
    };

    let db = Database::open(&data_dir).expect("Failed to open test database");

    let muster_storage =
        muster::RedbStorage::new(db.inner()).expect("Failed to create muster storage");
    let state_machine = ContentStateMachine::new(db.clone());
    let muster_config = muster::Config {
        node_id: config.node.id.clone(),
        cluster_port: 0,
        heartbeat_interval_ms: 300,
        election_timeout_ms: 3000,
        discovery: muster::DiscoveryConfig {
            dns_name: None,
            peers: vec![],
            poll_interval_secs: 5,
        },
    };
    let node = muster::MusterNode::new(muster_config, muster_storage, state_machine)
        .expect("Failed to create muster node");

    Arc::new(AppState {
        config,
        db,
        node: Arc::clone(&node),
    })
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Insert a live post owned by `owner_id` directly into the database.
pub fn seed_post(state: &AppState, owner_id: &str) -> Post {
    let now = Utc::now();
    let post = Post {
        id: new_id(),
        owner_id: owner_id.to_string(),
        category_id: new_id(),
        theme: "Seeded post".to_string(),
        science: "math".to_string(),
        price: 0.0,
        price_status: false,
        views: 0,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };
    state.db.put_post(&post).expect("Failed to seed post");
    post
}

/// Insert a live comment on `post_id` directly into the database.
pub fn seed_comment(state: &AppState, post_id: &str, owner_id: &str) -> Comment {
    let now = Utc::now();
    let comment = Comment {
        id: new_id(),
        post_id: post_id.to_string(),
        owner_id: owner_id.to_string(),
        message: "Seeded comment".to_string(),
        likes: 0,
        dislikes: 0,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };
    state.db.put_comment(&comment).expect("Failed to seed comment");
    comment
}

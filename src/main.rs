use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use content_hub::{
    api, config::Config, state_machine::ContentStateMachine, storage::Database, AppState,
};

type ContentNode = muster::RedbNode<ContentStateMachine>;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    info!(version = env!("CARGO_PKG_VERSION"), "content-hub starting");

    let config = Config::load()?;
    info!(
        node_id = %config.node.id,
        single_node = config.is_single_node(),
        request_timeout_ms = config.api.request_timeout.as_millis() as u64,
        max_page_size = config.api.max_page_size,
        test_mode = config.test_mode,
        "Loaded configuration"
    );

    let db = Database::open(&config.node.data_dir)?;
    info!(data_dir = %config.node.data_dir, "Database opened");

    let node = build_node(&config, &db)?;
    let cluster_handles = node.start();

    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        node: Arc::clone(&node),
    });

    let app = api::create_router(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(&config.node.bind_address).await?;
    info!(address = %config.node.bind_address, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Stopping cluster tasks");
    for handle in cluster_handles {
        handle.abort();
    }
    if let Err(e) = node.persist_state().await {
        tracing::error!(error = %e, "Failed to persist cluster state during shutdown");
    }

    info!("Shutdown complete");
    Ok(())
}

/// `LOG_FORMAT=gcp` emits Stackdriver records, `json` plain JSON lines,
/// anything else human-readable output. Levels come from `RUST_LOG`.
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(env_filter);

    match std::env::var("LOG_FORMAT")
        .unwrap_or_default()
        .to_lowercase()
        .as_str()
    {
        "gcp" => registry.with(tracing_stackdriver::layer()).init(),
        "json" => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_span_list(false),
            )
            .init(),
        _ => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Build the replication node. It shares the redb instance with content-hub,
/// and peers are dialled on the cluster port rather than their HTTP port.
fn build_node(config: &Config, db: &Database) -> anyhow::Result<Arc<ContentNode>> {
    let cluster_port = config.cluster.cluster_port;
    let peers = config
        .cluster
        .peers
        .iter()
        .map(|peer| {
            let host = peer.rsplit_once(':').map_or(peer.as_str(), |(host, _)| host);
            format!("{host}:{cluster_port}")
        })
        .collect();

    let muster_config = muster::Config {
        node_id: config.node.id.clone(),
        cluster_port,
        heartbeat_interval_ms: config.cluster.heartbeat_interval_ms,
        election_timeout_ms: config.cluster.election_timeout_ms,
        discovery: muster::DiscoveryConfig {
            dns_name: config.cluster.discovery.dns_name.clone(),
            peers,
            poll_interval_secs: config.cluster.discovery.poll_interval_seconds,
        },
    };

    let storage = muster::RedbStorage::new(db.inner())?;
    let node = muster::MusterNode::new(
        muster_config,
        storage,
        ContentStateMachine::new(db.clone()),
    )?;
    Ok(node)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}

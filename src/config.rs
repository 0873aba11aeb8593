use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub cluster: ClusterConfig,
    pub node: NodeConfig,
    pub api: ApiConfig,
    /// Enables dangerous operations like purge. Must never be true in production.
    pub test_mode: bool,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Deadline for replicating a single write
    pub request_timeout: Duration,
    /// Upper bound for the `limit` query parameter of list endpoints
    pub max_page_size: u32,
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind_address: String,
    pub data_dir: String,
    pub id: String,
}

#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// TCP port for inter-node cluster communication
    pub cluster_port: u16,
    pub discovery: DiscoveryConfig,
    pub election_timeout_ms: u64,
    pub heartbeat_interval_ms: u64,
    pub peers: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// DNS name to resolve for peer discovery (e.g., a Kubernetes headless service).
    pub dns_name: Option<String>,
    /// How often to poll for peer changes (seconds)
    pub poll_interval_seconds: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            dns_name: None,
            poll_interval_seconds: 5,
        }
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            cluster_port: 9993,
            discovery: DiscoveryConfig::default(),
            election_timeout_ms: 3000,
            heartbeat_interval_ms: 300,
            peers: Vec::new(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_millis(30_000),
            max_page_size: 100,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let node_id = std::env::var("NODE_ID").unwrap_or_else(|_| uuid::Uuid::new_v4().to_string());

        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());

        let peers: Vec<String> = std::env::var("PEERS")
            .map(|p| {
                p.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .filter(|s| !s.starts_with(&format!("{node_id}:")) && s != &node_id)
                    .collect()
            })
            .unwrap_or_default();

        let dns_name = std::env::var("DISCOVERY_DNS_NAME").ok();
        let poll_interval = std::env::var("DISCOVERY_POLL_INTERVAL")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        let cluster_port = std::env::var("CLUSTER_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(9993);

        let test_mode = std::env::var("TEST_MODE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let request_timeout_ms: u64 = std::env::var("REQUEST_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30_000);

        let max_page_size = std::env::var("MAX_PAGE_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(100);

        let config = Config {
            node: NodeConfig {
                id: node_id,
                bind_address,
                data_dir,
            },
            cluster: ClusterConfig {
                cluster_port,
                peers,
                discovery: DiscoveryConfig {
                    dns_name,
                    poll_interval_seconds: poll_interval,
                },
                ..Default::default()
            },
            api: ApiConfig {
                request_timeout: Duration::from_millis(request_timeout_ms),
                max_page_size,
            },
            test_mode,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.node.id.is_empty() {
            return Err(ConfigError::ValidationError(
                "NODE_ID cannot be empty".to_string(),
            ));
        }

        if self.api.request_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "REQUEST_TIMEOUT_MS must be greater than 0".to_string(),
            ));
        }

        if self.api.max_page_size == 0 {
            return Err(ConfigError::ValidationError(
                "MAX_PAGE_SIZE must be greater than 0".to_string(),
            ));
        }

        let cluster_size = self.cluster.peers.len() + 1;
        if cluster_size > 1 && cluster_size.is_multiple_of(2) {
            tracing::warn!(
                "Cluster size {} is even. This may lead to split-brain scenarios. \
                 Consider using an odd number of nodes.",
                cluster_size
            );
        }

        Ok(())
    }

    /// Check if running in single-node mode.
    pub fn is_single_node(&self) -> bool {
        self.cluster.peers.is_empty() && self.cluster.discovery.dns_name.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            cluster: ClusterConfig::default(),
            node: NodeConfig {
                bind_address: "127.0.0.1:0".to_string(),
                data_dir: "./data".to_string(),
                id: "node-1".to_string(),
            },
            api: ApiConfig::default(),
            test_mode: false,
        }
    }

    #[test]
    fn test_default_config_is_valid_single_node() {
        let config = config();
        assert!(config.validate().is_ok());
        assert!(config.is_single_node());
    }

    #[test]
    fn test_zero_request_timeout_rejected() {
        let mut config = config();
        config.api.request_timeout = Duration::ZERO;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let mut config = config();
        config.api.max_page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_peers_disable_single_node() {
        let mut config = config();
        config.cluster.peers = vec!["node-2:9993".to_string(), "node-3:9993".to_string()];
        assert!(config.validate().is_ok());
        assert!(!config.is_single_node());
    }
}

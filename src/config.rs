use serde::Deserialize;
use std::collections::HashSet;

use crate::models::{Location, NodeRegistryEntry};

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

// ---- node ----

#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub node: NodeIdentity,
    pub server: ServerConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeIdentity {
    #[serde(default = "default_node_id")]
    pub id: String,
    #[serde(default = "default_capacity")]
    pub capacity: f64,
}

impl Default for NodeIdentity {
    fn default() -> Self {
        Self {
            id: default_node_id(),
            capacity: default_capacity(),
        }
    }
}

fn default_node_id() -> String {
    "T1".into()
}

fn default_capacity() -> f64 {
    100.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_sim_interval_ms")]
    pub interval_ms: u64,
    /// Fixed RNG seed for reproducible runs; entropy-seeded when absent.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_sim_interval_ms(),
            seed: None,
        }
    }
}

fn default_sim_interval_ms() -> u64 {
    3000
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    /// Inference endpoint, e.g. `http://localhost:10000/predict`. Local rule only when absent.
    pub predict_url: Option<String>,
    #[serde(default = "default_request_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            predict_url: None,
            timeout_ms: default_request_timeout_ms(),
        }
    }
}

fn default_request_timeout_ms() -> u64 {
    3000
}

impl NodeConfig {
    /// Reads `CONFIG_FILE` (default `node.toml`), then applies `TRANSFORMER_ID` and `PORT`.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "node.toml".into());
        let s = std::fs::read_to_string(&path)?;
        let mut config: NodeConfig = toml::from_str(&s)?;
        if let Ok(id) = std::env::var("TRANSFORMER_ID") {
            config.node.id = id;
        }
        if let Ok(port) = std::env::var("PORT") {
            config.server.port = port
                .parse()
                .map_err(|e| anyhow::anyhow!("PORT must be a port number, got {port:?}: {e}"))?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: NodeConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(!self.node.id.is_empty(), "node.id must be non-empty");
        anyhow::ensure!(
            self.node.capacity.is_finite() && self.node.capacity > 0.0,
            "node.capacity must be a positive number, got {}",
            self.node.capacity
        );
        anyhow::ensure!(
            self.simulation.interval_ms > 0,
            "simulation.interval_ms must be > 0, got {}",
            self.simulation.interval_ms
        );
        anyhow::ensure!(
            self.classifier.timeout_ms > 0,
            "classifier.timeout_ms must be > 0, got {}",
            self.classifier.timeout_ms
        );
        if let Some(url) = &self.classifier.predict_url {
            anyhow::ensure!(
                url.starts_with("http://") || url.starts_with("https://"),
                "classifier.predict_url must be an http(s) URL, got {url:?}"
            );
        }
        Ok(())
    }
}

// ---- aggregator ----

#[derive(Debug, Clone, Deserialize)]
pub struct AggregatorConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub publishing: PublishingConfig,
    pub nodes: Vec<NodeEntryConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishingConfig {
    /// Max fleet reports buffered for /ws/fleet (slow clients may lag).
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

impl Default for PublishingConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: default_broadcast_capacity(),
        }
    }
}

fn default_broadcast_capacity() -> usize {
    16
}

/// One `[[nodes]]` entry: where a transformer lives on the network and on the map.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeEntryConfig {
    pub id: String,
    pub url: String,
    pub lat: f64,
    pub lon: f64,
}

impl NodeEntryConfig {
    pub fn to_entry(&self) -> NodeRegistryEntry {
        NodeRegistryEntry::new(
            self.id.as_str(),
            self.url.as_str(),
            Location {
                lat: self.lat,
                lon: self.lon,
            },
        )
    }
}

impl AggregatorConfig {
    /// Reads `CONFIG_FILE` (default `aggregator.toml`), then applies `PORT`.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "aggregator.toml".into());
        let s = std::fs::read_to_string(&path)?;
        let mut config: AggregatorConfig = toml::from_str(&s)?;
        if let Ok(port) = std::env::var("PORT") {
            config.server.port = port
                .parse()
                .map_err(|e| anyhow::anyhow!("PORT must be a port number, got {port:?}: {e}"))?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AggregatorConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn registry(&self) -> Vec<NodeRegistryEntry> {
        self.nodes.iter().map(NodeEntryConfig::to_entry).collect()
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            self.polling.interval_ms > 0,
            "polling.interval_ms must be > 0, got {}",
            self.polling.interval_ms
        );
        anyhow::ensure!(
            self.polling.request_timeout_ms > 0,
            "polling.request_timeout_ms must be > 0, got {}",
            self.polling.request_timeout_ms
        );
        anyhow::ensure!(
            self.publishing.broadcast_capacity > 0,
            "publishing.broadcast_capacity must be > 0, got {}",
            self.publishing.broadcast_capacity
        );
        anyhow::ensure!(!self.nodes.is_empty(), "nodes must list at least one transformer");
        let mut seen = HashSet::new();
        for node in &self.nodes {
            anyhow::ensure!(!node.id.is_empty(), "nodes.id must be non-empty");
            anyhow::ensure!(seen.insert(node.id.as_str()), "nodes.id {:?} is duplicated", node.id);
            anyhow::ensure!(
                node.url.starts_with("http://") || node.url.starts_with("https://"),
                "nodes.url for {} must be an http(s) URL, got {:?}",
                node.id,
                node.url
            );
            anyhow::ensure!(
                (-90.0..=90.0).contains(&node.lat) && (-180.0..=180.0).contains(&node.lon),
                "nodes location for {} is out of range: ({}, {})",
                node.id,
                node.lat,
                node.lon
            );
        }
        Ok(())
    }
}

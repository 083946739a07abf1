// Aggregator-side registry and per-round poll reports

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::NodeState;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

/// A known node. Created once from config; every poll round updates its last outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRegistryEntry {
    pub id: String,
    pub url: String,
    pub location: Location,
    /// State from the latest poll; `None` before the first poll or when the latest poll failed.
    pub last_state: Option<NodeState>,
    /// Unix millis of the last successful poll.
    pub last_seen_ms: Option<u64>,
    /// Why the latest poll failed; cleared by the next successful one.
    pub last_error: Option<String>,
}

impl NodeRegistryEntry {
    pub fn new(id: impl Into<String>, url: impl Into<String>, location: Location) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            location,
            last_state: None,
            last_seen_ms: None,
            last_error: None,
        }
    }

    /// True when the latest poll succeeded.
    pub fn is_reachable(&self) -> bool {
        self.last_state.is_some() && self.last_error.is_none()
    }

    pub fn record_success(&mut self, state: NodeState, timestamp: u64) {
        self.last_state = Some(state);
        self.last_seen_ms = Some(timestamp);
        self.last_error = None;
    }

    /// Drops the previous state so the view never serves stale data as current.
    pub fn record_failure(&mut self, reason: String) {
        self.last_state = None;
        self.last_error = Some(reason);
    }
}

/// Result of polling one node in one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reachability", rename_all = "lowercase")]
pub enum PollOutcome {
    Reachable { state: NodeState },
    Unreachable { reason: String },
}

impl PollOutcome {
    pub fn is_reachable(&self) -> bool {
        matches!(self, PollOutcome::Reachable { .. })
    }

    pub fn state(&self) -> Option<&NodeState> {
        match self {
            PollOutcome::Reachable { state } => Some(state),
            PollOutcome::Unreachable { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeReport {
    pub location: Location,
    pub outcome: PollOutcome,
}

/// One full poll round, keyed by node id (ascending).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetReport {
    pub timestamp: u64,
    pub nodes: BTreeMap<String, NodeReport>,
}

impl FleetReport {
    pub fn reachable_count(&self) -> usize {
        self.nodes.values().filter(|n| n.outcome.is_reachable()).count()
    }
}

// Central aggregator: polls every registered transformer on a fixed interval.
// One node failing never aborts a round; it is reported unreachable and the rest carry on.

use futures_util::future::join_all;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;
use tokio::time::{Duration, Instant, interval};
use tracing::{debug, info, instrument, warn};

use crate::config::AggregatorConfig;
use crate::models::{FleetReport, Location, NodeRegistryEntry, NodeReport, NodeState, PollOutcome};
use crate::version::USER_AGENT;

/// Rate limit for the "no report subscribers" message.
const NO_RECEIVERS_LOG_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("unexpected HTTP status {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed node state: {0}")]
    Malformed(reqwest::Error),
    #[error("request failed: {0}")]
    Transport(reqwest::Error),
}

pub struct Aggregator {
    client: reqwest::Client,
    request_timeout: Duration,
    poll_interval: Duration,
    registry: RwLock<BTreeMap<String, NodeRegistryEntry>>,
    last_report: RwLock<Option<FleetReport>>,
}

impl Aggregator {
    pub fn new(
        entries: impl IntoIterator<Item = NodeRegistryEntry>,
        poll_interval: Duration,
        request_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(request_timeout)
            .build()?;
        let registry = entries
            .into_iter()
            .map(|entry| (entry.id.clone(), entry))
            .collect();
        Ok(Self {
            client,
            request_timeout,
            poll_interval,
            registry: RwLock::new(registry),
            last_report: RwLock::new(None),
        })
    }

    pub fn from_config(config: &AggregatorConfig) -> anyhow::Result<Self> {
        Self::new(
            config.registry(),
            Duration::from_millis(config.polling.interval_ms),
            Duration::from_millis(config.polling.request_timeout_ms),
        )
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Registry snapshot in ascending id order.
    pub fn registry(&self) -> Vec<NodeRegistryEntry> {
        let registry = self.registry.read().unwrap_or_else(PoisonError::into_inner);
        registry.values().cloned().collect()
    }

    /// Report of the most recent completed round, if any.
    pub fn last_report(&self) -> Option<FleetReport> {
        self.last_report
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn classify_error(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.request_timeout)
        } else if e.is_decode() {
            FetchError::Malformed(e)
        } else {
            FetchError::Transport(e)
        }
    }

    /// `GET` one node's current state.
    pub async fn fetch_state(&self, url: &str) -> Result<NodeState, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify_error(e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        response
            .json::<NodeState>()
            .await
            .map_err(|e| self.classify_error(e))
    }

    /// Polls every registered node concurrently and records each outcome independently.
    pub async fn poll_round(&self) -> FleetReport {
        let targets: Vec<(String, String, Location)> = {
            let registry = self.registry.read().unwrap_or_else(PoisonError::into_inner);
            registry
                .values()
                .map(|e| (e.id.clone(), e.url.clone(), e.location))
                .collect()
        };

        let results = join_all(targets.iter().map(|(_, url, _)| self.fetch_state(url))).await;
        let timestamp = now_ms();

        let mut nodes = BTreeMap::new();
        let mut registry = self.registry.write().unwrap_or_else(PoisonError::into_inner);
        for ((id, _url, location), result) in targets.into_iter().zip(results) {
            let outcome = match result {
                Ok(state) => {
                    info!(
                        node_id = %id,
                        lat = location.lat,
                        lon = location.lon,
                        status = %state.status,
                        "Transformer reachable"
                    );
                    if let Some(entry) = registry.get_mut(&id) {
                        entry.record_success(state.clone(), timestamp);
                    }
                    PollOutcome::Reachable { state }
                }
                Err(e) => {
                    warn!(node_id = %id, error = %e, "Transformer is not reachable");
                    let reason = e.to_string();
                    if let Some(entry) = registry.get_mut(&id) {
                        entry.record_failure(reason.clone());
                    }
                    PollOutcome::Unreachable { reason }
                }
            };
            nodes.insert(id, NodeReport { location, outcome });
        }
        drop(registry);

        let report = FleetReport { timestamp, nodes };
        *self.last_report.write().unwrap_or_else(PoisonError::into_inner) = Some(report.clone());
        report
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_else(|e| {
            warn!(error = %e, operation = "get_timestamp", "system time error");
            0
        })
}

/// Spawns the poll driver. The first round runs immediately, then one per poll interval.
/// Every report is broadcast to `report_tx` subscribers.
pub fn spawn(
    aggregator: Arc<Aggregator>,
    report_tx: broadcast::Sender<FleetReport>,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(run(aggregator, report_tx, shutdown_rx))
}

#[instrument(skip_all, fields(interval_ms = aggregator.poll_interval().as_millis() as u64))]
async fn run(
    aggregator: Arc<Aggregator>,
    report_tx: broadcast::Sender<FleetReport>,
    mut shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) {
    let mut tick = interval(aggregator.poll_interval());
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut last_no_receivers_log: Option<Instant> = None;

    loop {
        tokio::select! {
            _ = tick.tick() => {
                let report = aggregator.poll_round().await;
                info!(
                    reachable = report.reachable_count(),
                    total = report.nodes.len(),
                    "Poll round complete"
                );
                if report_tx.send(report).is_err() {
                    let should_log = last_no_receivers_log
                        .is_none_or(|t| t.elapsed() >= NO_RECEIVERS_LOG_INTERVAL);
                    if should_log {
                        debug!(
                            operation = "broadcast_report",
                            "No active /ws/fleet clients; report not broadcast"
                        );
                        last_no_receivers_log = Some(Instant::now());
                    }
                }
            }
            _ = &mut shutdown_rx => {
                debug!("Poll driver shutting down");
                break;
            }
        }
    }
}

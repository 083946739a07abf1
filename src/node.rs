// Node service: owns one transformer's state, the simulation driver and manual updates.

use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::time::{Duration, Instant, interval_at};
use tracing::{debug, info, instrument};

use crate::classifier::StatusClassifier;
use crate::config::NodeConfig;
use crate::models::{NodeState, Status, TelemetrySnapshot, TelemetryUpdate};
use crate::simulator;

struct Inner {
    state: NodeState,
    /// Bumped on every telemetry mutation; a classification only lands if it still matches.
    generation: u64,
    rng: StdRng,
}

pub struct NodeService {
    inner: Mutex<Inner>,
    classifier: StatusClassifier,
    tick_interval: Duration,
}

impl NodeService {
    pub fn new(
        state: NodeState,
        classifier: StatusClassifier,
        tick_interval: Duration,
        rng: StdRng,
    ) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state,
                generation: 0,
                rng,
            }),
            classifier,
            tick_interval,
        }
    }

    pub fn from_config(config: &NodeConfig) -> anyhow::Result<Self> {
        let classifier = match &config.classifier.predict_url {
            Some(url) => StatusClassifier::new(
                url.as_str(),
                Duration::from_millis(config.classifier.timeout_ms),
            )?,
            None => StatusClassifier::local_only(),
        };
        let rng = match config.simulation.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self::new(
            NodeState::new(config.node.id.as_str(), config.node.capacity),
            classifier,
            Duration::from_millis(config.simulation.interval_ms),
            rng,
        ))
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Current telemetry and status. No side effects.
    pub fn get_state(&self) -> NodeState {
        self.lock().state.clone()
    }

    /// Applies the supplied fields, reclassifies and returns the post-update state.
    pub async fn update(&self, update: &TelemetryUpdate) -> NodeState {
        if update.is_empty() {
            debug!("update carries no fields; reclassifying current telemetry");
        }
        let (snapshot, capacity, generation) = {
            let mut guard = self.lock();
            let inner = &mut *guard;
            update.apply_to(&mut inner.state.telemetry, inner.state.capacity);
            inner.generation += 1;
            (inner.state.telemetry, inner.state.capacity, inner.generation)
        };
        let status = self.classifier.classify(&snapshot, capacity).await;
        let state = self.store_status(generation, snapshot, status);
        info!(node_id = %state.id, status = %state.status, "Updated transformer status");
        state
    }

    /// One simulation step: advance telemetry, then reclassify.
    pub async fn tick(&self) -> NodeState {
        let (snapshot, capacity, generation) = {
            let mut guard = self.lock();
            let inner = &mut *guard;
            inner.state.telemetry = simulator::advance(
                &inner.state.telemetry,
                inner.state.capacity,
                self.tick_interval,
                &mut inner.rng,
            );
            inner.generation += 1;
            (inner.state.telemetry, inner.state.capacity, inner.generation)
        };
        let status = self.classifier.classify(&snapshot, capacity).await;
        let state = self.store_status(generation, snapshot, status);
        debug!(
            node_id = %state.id,
            status = %state.status,
            load = state.telemetry.load,
            "Simulated transformer status"
        );
        state
    }

    fn store_status(&self, generation: u64, snapshot: TelemetrySnapshot, status: Status) -> NodeState {
        let mut inner = self.lock();
        if inner.generation == generation {
            if inner.state.status != status {
                info!(
                    node_id = %inner.state.id,
                    from = %inner.state.status,
                    to = %status,
                    "status changed"
                );
            }
            inner.state.status = status;
            inner.state.clone()
        } else {
            debug!(
                node_id = %inner.state.id,
                "telemetry changed during classification; newer result pending"
            );
            NodeState {
                telemetry: snapshot,
                status,
                ..inner.state.clone()
            }
        }
    }
}

/// Spawns the simulation driver: one [`NodeService::tick`] per interval until shutdown.
pub fn spawn_simulation(
    service: Arc<NodeService>,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(run_simulation(service, shutdown_rx))
}

#[instrument(skip_all, fields(interval_ms = service.tick_interval().as_millis() as u64))]
async fn run_simulation(
    service: Arc<NodeService>,
    mut shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) {
    let period = service.tick_interval();
    let mut tick = interval_at(Instant::now() + period, period);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = tick.tick() => {
                service.tick().await;
            }
            _ = &mut shutdown_rx => {
                debug!("Simulation shutting down");
                break;
            }
        }
    }
}

// Domain models shared by nodes and the aggregator

mod registry;
mod status;
mod telemetry;

pub use registry::{FleetReport, Location, NodeRegistryEntry, NodeReport, PollOutcome};
pub use status::Status;
pub use telemetry::{
    Bounds, CURRENT_BOUNDS, MOISTURE_BOUNDS, NodeState, TEMPERATURE_BOUNDS, TelemetrySnapshot,
    TelemetryUpdate, VOLTAGE_BOUNDS, load_bounds,
};

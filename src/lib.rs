// Library for the node and aggregator binaries (and tests)

pub mod aggregator;
pub mod classifier;
pub mod config;
pub mod logging;
pub mod models;
pub mod node;
pub mod routes;
pub mod shutdown;
pub mod simulator;
pub mod version;

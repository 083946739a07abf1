// Synthetic telemetry: bounded random walk, one step per simulation tick.

use rand::Rng;
use std::time::Duration;

use crate::models::{
    Bounds, CURRENT_BOUNDS, MOISTURE_BOUNDS, TEMPERATURE_BOUNDS, TelemetrySnapshot,
    VOLTAGE_BOUNDS, load_bounds,
};

pub const LOAD_STEP: f64 = 10.0;
pub const VOLTAGE_STEP: f64 = 2.5;
pub const CURRENT_STEP: f64 = 1.0;
pub const TEMPERATURE_STEP: f64 = 2.5;
pub const MOISTURE_STEP: f64 = 2.5;

/// Chance of a lightning surge on any single tick.
pub const SURGE_PROBABILITY: f64 = 0.05;

/// Hours of maintenance age one tick adds.
pub fn maintenance_increment(tick_interval: Duration) -> f64 {
    tick_interval.as_secs_f64() / 3600.0
}

fn walk<R: Rng + ?Sized>(rng: &mut R, value: f64, step: f64, bounds: Bounds) -> f64 {
    bounds.clamp(value + rng.gen_range(-step..=step))
}

/// Produces the next snapshot from `prev`. Every bounded field lands inside its bounds;
/// the surge flag is re-rolled each tick rather than carried over.
pub fn advance<R: Rng + ?Sized>(
    prev: &TelemetrySnapshot,
    capacity: f64,
    tick_interval: Duration,
    rng: &mut R,
) -> TelemetrySnapshot {
    TelemetrySnapshot {
        load: walk(rng, prev.load, LOAD_STEP, load_bounds(capacity)),
        voltage: walk(rng, prev.voltage, VOLTAGE_STEP, VOLTAGE_BOUNDS),
        current: walk(rng, prev.current, CURRENT_STEP, CURRENT_BOUNDS),
        temperature: walk(rng, prev.temperature, TEMPERATURE_STEP, TEMPERATURE_BOUNDS),
        time_since_maintenance: prev.time_since_maintenance
            + maintenance_increment(tick_interval),
        moisture_level: walk(rng, prev.moisture_level, MOISTURE_STEP, MOISTURE_BOUNDS),
        lightning_surge: rng.gen_bool(SURGE_PROBABILITY),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn same_seed_same_walk() {
        let start = TelemetrySnapshot::default();
        let tick = Duration::from_secs(3);
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            assert_eq!(advance(&start, 100.0, tick, &mut a), advance(&start, 100.0, tick, &mut b));
        }
    }

    #[test]
    fn load_stays_put_at_zero_capacity() {
        let mut rng = StdRng::seed_from_u64(1);
        let next = advance(&TelemetrySnapshot::default(), 0.0, Duration::from_secs(3), &mut rng);
        assert_eq!(next.load, 0.0);
    }
}

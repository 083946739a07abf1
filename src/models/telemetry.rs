// Transformer telemetry, node state and partial updates

use serde::{Deserialize, Serialize};

use super::Status;

/// Inclusive `[min, max]` range a bounded telemetry field is clamped into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn clamp(self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    pub fn contains(self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

pub const VOLTAGE_BOUNDS: Bounds = Bounds::new(220.0, 240.0);
pub const CURRENT_BOUNDS: Bounds = Bounds::new(0.0, 15.0);
pub const TEMPERATURE_BOUNDS: Bounds = Bounds::new(15.0, 45.0);
pub const MOISTURE_BOUNDS: Bounds = Bounds::new(0.0, 100.0);

/// Load is bounded by the node's rated capacity.
pub fn load_bounds(capacity: f64) -> Bounds {
    Bounds::new(0.0, capacity)
}

/// One instant of a node's telemetry. Also the request body of the inference service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub load: f64,
    pub voltage: f64,
    pub current: f64,
    pub temperature: f64,
    /// Accumulated hours since last maintenance; only ever grows during simulation.
    pub time_since_maintenance: f64,
    pub moisture_level: f64,
    #[serde(with = "surge_flag")]
    pub lightning_surge: bool,
}

impl Default for TelemetrySnapshot {
    fn default() -> Self {
        Self {
            load: 0.0,
            voltage: 230.0,
            current: 0.0,
            temperature: 25.0,
            time_since_maintenance: 0.0,
            moisture_level: 0.0,
            lightning_surge: false,
        }
    }
}

/// Everything a node reports on `GET /api/transformer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeState {
    pub id: String,
    pub capacity: f64,
    #[serde(flatten)]
    pub telemetry: TelemetrySnapshot,
    pub status: Status,
}

impl NodeState {
    /// Startup state: default telemetry, status `NotPresent`.
    pub fn new(id: impl Into<String>, capacity: f64) -> Self {
        Self {
            id: id.into(),
            capacity,
            telemetry: TelemetrySnapshot::default(),
            status: Status::NotPresent,
        }
    }
}

/// Manual update body. Absent fields are kept; present fields (zero included) are set.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TelemetryUpdate {
    pub load: Option<f64>,
    pub voltage: Option<f64>,
    pub current: Option<f64>,
    pub temperature: Option<f64>,
    pub time_since_maintenance: Option<f64>,
    pub moisture_level: Option<f64>,
    #[serde(default, deserialize_with = "surge_flag::deserialize_option")]
    pub lightning_surge: Option<bool>,
}

impl TelemetryUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overwrites the supplied fields of `snapshot`, clamping each into its bounds.
    pub fn apply_to(&self, snapshot: &mut TelemetrySnapshot, capacity: f64) {
        if let Some(load) = self.load {
            snapshot.load = load_bounds(capacity).clamp(load);
        }
        if let Some(voltage) = self.voltage {
            snapshot.voltage = VOLTAGE_BOUNDS.clamp(voltage);
        }
        if let Some(current) = self.current {
            snapshot.current = CURRENT_BOUNDS.clamp(current);
        }
        if let Some(temperature) = self.temperature {
            snapshot.temperature = TEMPERATURE_BOUNDS.clamp(temperature);
        }
        if let Some(hours) = self.time_since_maintenance {
            snapshot.time_since_maintenance = hours.max(0.0);
        }
        if let Some(moisture) = self.moisture_level {
            snapshot.moisture_level = MOISTURE_BOUNDS.clamp(moisture);
        }
        if let Some(surge) = self.lightning_surge {
            snapshot.lightning_surge = surge;
        }
    }
}

/// `lightning_surge` is 0/1 on the wire; accept either a bool or a number on input.
mod surge_flag {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Number(f64),
    }

    impl From<Flag> for bool {
        fn from(flag: Flag) -> Self {
            match flag {
                Flag::Bool(b) => b,
                Flag::Number(n) => n != 0.0,
            }
        }
    }

    pub fn serialize<S: Serializer>(value: &bool, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        Flag::deserialize(d).map(bool::from)
    }

    pub fn deserialize_option<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        Ok(Option::<Flag>::deserialize(d)?.map(bool::from))
    }
}

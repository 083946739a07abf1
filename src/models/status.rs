// Health status reported by a node

use serde::{Deserialize, Serialize};
use std::fmt;

/// Derived health status. Wire strings follow the inference service
/// ("Failure Present" / "Failure Not Present"); anything else it returns is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    Present,
    NotPresent,
    Other(String),
}

impl Status {
    pub fn as_str(&self) -> &str {
        match self {
            Status::Present => "Failure Present",
            Status::NotPresent => "Failure Not Present",
            Status::Other(s) => s,
        }
    }
}

/// Only the two exact service strings map to known variants; every other
/// string, including near-misses like `"Present"`, is kept as `Other` unchanged.
impl From<String> for Status {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Failure Present" => Status::Present,
            "Failure Not Present" => Status::NotPresent,
            _ => Status::Other(s),
        }
    }
}

impl From<&str> for Status {
    fn from(s: &str) -> Self {
        Status::from(s.to_string())
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        match status {
            Status::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Host resource metrics for the machine running the monitor

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostMetrics {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disk_percent: f64,
    /// e.g. "AMD EPYC 7B13 (4C/8T) • Linux x86_64"
    pub label: String,
}

/// Host section of a snapshot. A failed read degrades to `Unavailable`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "metrics", rename_all = "lowercase")]
pub enum HostSection {
    Available(HostMetrics),
    Unavailable,
}

impl HostSection {
    pub fn metrics(&self) -> Option<&HostMetrics> {
        match self {
            Self::Available(m) => Some(m),
            Self::Unavailable => None,
        }
    }
}

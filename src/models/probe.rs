// Probe results and the Lavalink v4 stats payload

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Why a node is reported offline. Display is the stable reason tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ProbeFailure {
    #[error("timeout")]
    Timeout,
    #[error("connection_error")]
    ConnectionError,
    #[error("http_{0}")]
    Http(u16),
    #[error("parse_error")]
    ParseError,
}

impl FromStr for ProbeFailure {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "timeout" => Ok(Self::Timeout),
            "connection_error" => Ok(Self::ConnectionError),
            "parse_error" => Ok(Self::ParseError),
            other => other
                .strip_prefix("http_")
                .and_then(|code| code.parse::<u16>().ok())
                .map(Self::Http)
                .ok_or_else(|| format!("unknown probe failure tag: {}", other)),
        }
    }
}

impl Serialize for ProbeFailure {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ProbeFailure {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Node metrics carried through to the renderer. The core only reads `player_count`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsPayload {
    pub cpu_fraction: f64,
    pub memory_used_bytes: u64,
    pub memory_allocated_bytes: u64,
    pub player_count: u32,
    pub playing_count: u32,
    pub uptime_millis: u64,
}

/// Body of `GET /v4/stats`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LavalinkStats {
    pub players: u32,
    pub playing_players: u32,
    pub uptime: u64,
    pub memory: LavalinkMemory,
    pub cpu: LavalinkCpu,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LavalinkMemory {
    #[serde(default)]
    pub free: u64,
    pub used: u64,
    pub allocated: u64,
    #[serde(default)]
    pub reservable: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LavalinkCpu {
    #[serde(default)]
    pub cores: u32,
    pub system_load: f64,
    pub lavalink_load: f64,
}

impl From<LavalinkStats> for MetricsPayload {
    fn from(stats: LavalinkStats) -> Self {
        // Some containers report a zero system load; fall back to the JVM's own.
        let cpu_fraction = if stats.cpu.system_load > 0.0 {
            stats.cpu.system_load
        } else {
            stats.cpu.lavalink_load
        };
        Self {
            cpu_fraction,
            memory_used_bytes: stats.memory.used,
            memory_allocated_bytes: stats.memory.allocated,
            player_count: stats.players,
            playing_count: stats.playing_players,
            uptime_millis: stats.uptime,
        }
    }
}

/// Outcome of one probe against one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum ProbeResult {
    Online {
        ping_millis: f64,
        metrics: MetricsPayload,
    },
    Offline {
        reason: ProbeFailure,
    },
}

impl ProbeResult {
    pub fn offline(reason: ProbeFailure) -> Self {
        Self::Offline { reason }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online { .. })
    }

    pub fn metrics(&self) -> Option<&MetricsPayload> {
        match self {
            Self::Online { metrics, .. } => Some(metrics),
            Self::Offline { .. } => None,
        }
    }

    pub fn ping_millis(&self) -> Option<f64> {
        match self {
            Self::Online { ping_millis, .. } => Some(*ping_millis),
            Self::Offline { .. } => None,
        }
    }

    pub fn failure(&self) -> Option<ProbeFailure> {
        match self {
            Self::Online { .. } => None,
            Self::Offline { reason } => Some(*reason),
        }
    }
}

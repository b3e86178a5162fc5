// Snapshot: one immutable aggregate of a tick's node and host results

use serde::{Deserialize, Serialize};

use super::{HostSection, ProbeResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeReport {
    pub node_id: String,
    pub result: ProbeResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Unix millis at collection time.
    pub timestamp: u64,
    /// One entry per configured node, in configuration order.
    pub nodes: Vec<NodeReport>,
    pub host: HostSection,
    pub peak_players: u32,
}

impl Snapshot {
    pub fn online_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.result.is_online()).count()
    }

    /// Widened to u64: node-reported counts are untrusted.
    pub fn total_players(&self) -> u64 {
        self.nodes
            .iter()
            .filter_map(|n| n.result.metrics())
            .map(|m| u64::from(m.player_count))
            .sum()
    }

    pub fn total_playing(&self) -> u64 {
        self.nodes
            .iter()
            .filter_map(|n| n.result.metrics())
            .map(|m| u64::from(m.playing_count))
            .sum()
    }
}

/// High-water mark of observed per-node player count since process start.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PeakPlayers(u32);

impl PeakPlayers {
    /// Folds one observation in; returns the new peak.
    pub fn observe(&mut self, player_count: u32) -> u32 {
        self.0 = self.0.max(player_count);
        self.0
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

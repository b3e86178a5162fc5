// Alert events derived from a snapshot, handed to an injected sink after publish.
// The sink returns nothing: its failures can never reach dashboard state.

use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;

use crate::models::{ProbeFailure, Snapshot};

pub const DEFAULT_HIGH_PING_MS: f64 = 200.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum AlertEvent {
    NodeOffline {
        node_id: String,
        reason: ProbeFailure,
    },
    HighPing {
        node_id: String,
        ping_millis: f64,
    },
}

/// Offline nodes, and online nodes whose ping exceeds `high_ping_ms`, in node order.
pub fn derive_alerts(snapshot: &Snapshot, high_ping_ms: f64) -> Vec<AlertEvent> {
    snapshot
        .nodes
        .iter()
        .filter_map(|n| match (n.result.failure(), n.result.ping_millis()) {
            (Some(reason), _) => Some(AlertEvent::NodeOffline {
                node_id: n.node_id.clone(),
                reason,
            }),
            (None, Some(ping)) if ping > high_ping_ms => Some(AlertEvent::HighPing {
                node_id: n.node_id.clone(),
                ping_millis: ping,
            }),
            _ => None,
        })
        .collect()
}

#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn notify(&self, events: &[AlertEvent]);
}

/// Writes each alert to the log at WARN.
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn notify(&self, events: &[AlertEvent]) {
        for event in events {
            match event {
                AlertEvent::NodeOffline { node_id, reason } => {
                    warn!(node = %node_id, reason = %reason, "node offline");
                }
                AlertEvent::HighPing {
                    node_id,
                    ping_millis,
                } => {
                    warn!(node = %node_id, ping_millis, "node ping high");
                }
            }
        }
    }
}

// Aggregator: fans out one probe per node plus one host-metrics read, joins them
// into a Snapshot. Output order is configuration order, not completion order.

use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{instrument, warn};

use crate::models::{HostSection, NodeConfig, NodeReport, PeakPlayers, Snapshot};
use crate::probe::NodeProbe;
use crate::sysinfo_repo::HostMetricsSource;

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Aggregator {
    probe: Arc<dyn NodeProbe>,
    host: Arc<dyn HostMetricsSource>,
    probe_timeout: Duration,
    peak: PeakPlayers,
}

impl Aggregator {
    pub fn new(
        probe: Arc<dyn NodeProbe>,
        host: Arc<dyn HostMetricsSource>,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            probe,
            host,
            probe_timeout,
            peak: PeakPlayers::default(),
        }
    }

    pub fn peak_players(&self) -> u32 {
        self.peak.get()
    }

    /// Probes every node concurrently and reads host metrics alongside.
    /// Waits for all of them; a failed or slow node only affects its own entry.
    #[instrument(skip_all, fields(operation = "collect", nodes = nodes.len()))]
    pub async fn collect(&mut self, nodes: &[NodeConfig]) -> Snapshot {
        let probe = &self.probe;
        let timeout = self.probe_timeout;
        let probes = join_all(nodes.iter().map(|node| probe.probe(node, timeout)));
        let (results, host) = tokio::join!(probes, self.host.read());

        let host = match host {
            Ok(metrics) => HostSection::Available(metrics),
            Err(e) => {
                warn!(error = %e, operation = "read_host_metrics", "host metrics unavailable");
                HostSection::Unavailable
            }
        };

        let nodes: Vec<NodeReport> = nodes
            .iter()
            .zip(results)
            .map(|(node, result)| NodeReport {
                node_id: node.id.clone(),
                result,
            })
            .collect();

        for metrics in nodes.iter().filter_map(|n| n.result.metrics()) {
            self.peak.observe(metrics.player_count);
        }

        Snapshot {
            timestamp: now_millis(),
            nodes,
            host,
            peak_players: self.peak.get(),
        }
    }
}

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_else(|e| {
            warn!(error = %e, operation = "get_timestamp", "system time error");
            0
        })
}

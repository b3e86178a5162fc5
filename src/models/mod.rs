// Domain models: node config, probe results, host metrics, snapshots

mod host;
mod node;
mod probe;
mod snapshot;

pub use host::{HostMetrics, HostSection};
pub use node::{NodeConfig, NodeSummary};
pub use probe::{LavalinkStats, MetricsPayload, ProbeFailure, ProbeResult};
pub use snapshot::{NodeReport, PeakPlayers, Snapshot};

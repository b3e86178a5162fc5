// One tick: collect -> publish -> notify. Sole owner of the dashboard state and
// peak players; only the scheduler task touches it.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use crate::aggregator::Aggregator;
use crate::alerts::{AlertSink, derive_alerts};
use crate::dashboard::{DashboardMessage, DashboardState, DestinationId};
use crate::models::{NodeConfig, Snapshot};
use crate::scheduler::{Command, Tick};

/// Latest snapshot for the admin surface; `None` until the first tick.
pub type LatestSnapshot = watch::Receiver<Option<Arc<Snapshot>>>;

pub struct Alerting {
    pub sink: Arc<dyn AlertSink>,
    pub high_ping_ms: f64,
}

pub struct MonitorDeps {
    pub nodes: Vec<NodeConfig>,
    pub aggregator: Aggregator,
    pub dashboard: DashboardMessage,
    pub destination: DestinationId,
    pub alerting: Option<Alerting>,
    pub latest_tx: watch::Sender<Option<Arc<Snapshot>>>,
}

pub struct Monitor {
    nodes: Vec<NodeConfig>,
    aggregator: Aggregator,
    dashboard: DashboardMessage,
    state: DashboardState,
    alerting: Option<Alerting>,
    latest_tx: watch::Sender<Option<Arc<Snapshot>>>,
}

impl Monitor {
    /// Builds the monitor, resuming the dashboard message recorded for `destination`.
    pub async fn new(deps: MonitorDeps) -> Self {
        let MonitorDeps {
            nodes,
            aggregator,
            dashboard,
            destination,
            alerting,
            latest_tx,
        } = deps;
        let state = dashboard.restore(destination).await;
        Self {
            nodes,
            aggregator,
            dashboard,
            state,
            alerting,
            latest_tx,
        }
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub fn peak_players(&self) -> u32 {
        self.aggregator.peak_players()
    }
}

#[async_trait]
impl Tick for Monitor {
    async fn tick(&mut self) -> anyhow::Result<()> {
        let snapshot = self.aggregator.collect(&self.nodes).await;
        self.latest_tx.send_replace(Some(Arc::new(snapshot.clone())));

        let published = self.dashboard.publish(&mut self.state, &snapshot).await;

        if let Some(alerting) = &self.alerting {
            let events = derive_alerts(&snapshot, alerting.high_ping_ms);
            if !events.is_empty() {
                alerting.sink.notify(&events).await;
            }
        }

        let outcome = published.map_err(|e| anyhow::Error::new(e).context("publish dashboard"))?;
        debug!(
            online = snapshot.online_count(),
            nodes = snapshot.nodes.len(),
            message_id = outcome.message_id(),
            "snapshot published"
        );
        Ok(())
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::ResetDashboard { done } => {
                self.dashboard.reset(&mut self.state).await;
                let _ = done.send(());
            }
        }
    }
}

// Node health probe: one bounded GET against a node's /v4/stats endpoint.
// Every failure mode is folded into ProbeResult::Offline; nothing escapes.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

use crate::models::{LavalinkStats, NodeConfig, ProbeFailure, ProbeResult};
use crate::version::{NAME, VERSION};

#[async_trait]
pub trait NodeProbe: Send + Sync {
    /// Checks one node. Must resolve within `timeout` and never fail.
    async fn probe(&self, node: &NodeConfig, timeout: Duration) -> ProbeResult;
}

pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    pub fn new() -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(format!("{}/{}", NAME, VERSION))
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn fetch(&self, node: &NodeConfig) -> ProbeResult {
        let start = Instant::now();
        let response = self
            .client
            .get(node.stats_url())
            .header(AUTHORIZATION, node.password.as_str())
            .send()
            .await;
        // send() resolves once response headers are in.
        let ping_millis = round_tenth(start.elapsed().as_secs_f64() * 1000.0);

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                debug!(error = %e, "stats request failed");
                return ProbeResult::offline(classify(&e));
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            return ProbeResult::offline(ProbeFailure::Http(status.as_u16()));
        }

        let body = match response.bytes().await {
            Ok(b) => b,
            Err(e) => {
                debug!(error = %e, "stats body read failed");
                return ProbeResult::offline(classify(&e));
            }
        };

        match serde_json::from_slice::<LavalinkStats>(&body) {
            Ok(stats) => ProbeResult::Online {
                ping_millis,
                metrics: stats.into(),
            },
            Err(e) => {
                debug!(error = %e, "stats body did not match schema");
                ProbeResult::offline(ProbeFailure::ParseError)
            }
        }
    }
}

#[async_trait]
impl NodeProbe for HttpProbe {
    #[instrument(skip(self, node), fields(node = %node.id, operation = "probe"))]
    async fn probe(&self, node: &NodeConfig, timeout: Duration) -> ProbeResult {
        match tokio::time::timeout(timeout, self.fetch(node)).await {
            Ok(result) => result,
            Err(_) => ProbeResult::offline(ProbeFailure::Timeout),
        }
    }
}

fn classify(e: &reqwest::Error) -> ProbeFailure {
    if e.is_timeout() {
        ProbeFailure::Timeout
    } else {
        ProbeFailure::ConnectionError
    }
}

fn round_tenth(ms: f64) -> f64 {
    (ms * 10.0).round() / 10.0
}

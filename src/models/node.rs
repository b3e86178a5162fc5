// Node configuration: one independently-configured Lavalink instance

use serde::{Deserialize, Serialize};

fn default_port() -> u16 {
    2333
}

fn default_region() -> String {
    "Unknown".into()
}

/// One remote node to poll. Loaded once at startup; identity is `id`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NodeConfig {
    pub id: String,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Use https for the stats endpoint.
    #[serde(default)]
    pub secure: bool,
    /// Sent verbatim as the `Authorization` header.
    pub password: String,
    #[serde(default = "default_region")]
    pub region: String,
}

impl NodeConfig {
    pub fn base_url(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    /// Lavalink v4 stats endpoint.
    pub fn stats_url(&self) -> String {
        format!("{}/v4/stats", self.base_url())
    }

    pub fn summary(&self) -> NodeSummary {
        NodeSummary {
            id: self.id.clone(),
            region: self.region.clone(),
            url: self.base_url(),
            secure: self.secure,
        }
    }
}

/// Public view of a node for GET /api/info (no credentials).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSummary {
    pub id: String,
    pub region: String,
    pub url: String,
    pub secure: bool,
}

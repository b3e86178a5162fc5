use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

use crate::models::NodeConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    pub database: DatabaseConfig,
    pub discord: DiscordConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    /// Bearer token required by POST /api/dashboard/reset; open when unset.
    #[serde(default)]
    pub admin_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
        }
    }
}

impl MonitorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

fn default_interval_secs() -> u64 {
    10
}

fn default_probe_timeout_secs() -> u64 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub token: String,
    /// Channel holding the dashboard message.
    pub channel_id: u64,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_api_base() -> String {
    crate::transport::DEFAULT_API_BASE.into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertsConfig {
    #[serde(default = "default_alerts_enabled")]
    pub enabled: bool,
    #[serde(default = "default_high_ping_ms")]
    pub high_ping_ms: f64,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            enabled: default_alerts_enabled(),
            high_ping_ms: default_high_ping_ms(),
        }
    }
}

fn default_alerts_enabled() -> bool {
    true
}

fn default_high_ping_ms() -> f64 {
    crate::alerts::DEFAULT_HIGH_PING_MS
}

impl AppConfig {
    /// Reads `CONFIG_FILE` (default `config.toml`).
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        Self::load_from_path(&path)
    }

    /// `BOT_TOKEN` in the environment overrides `discord.token`.
    pub fn load_from_path(path: &str) -> anyhow::Result<Self> {
        let s = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("reading {}: {}", path, e))?;
        let mut config: AppConfig = toml::from_str(&s)?;
        if let Ok(token) = std::env::var("BOT_TOKEN")
            && !token.is_empty()
        {
            config.discord.token = token;
        }
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            self.monitor.interval_secs > 0,
            "monitor.interval_secs must be > 0, got {}",
            self.monitor.interval_secs
        );
        anyhow::ensure!(
            self.monitor.probe_timeout_secs > 0,
            "monitor.probe_timeout_secs must be > 0, got {}",
            self.monitor.probe_timeout_secs
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            !self.discord.token.is_empty(),
            "discord.token must be set (or BOT_TOKEN in the environment)"
        );
        anyhow::ensure!(
            self.discord.channel_id > 0,
            "discord.channel_id must be > 0"
        );
        anyhow::ensure!(
            self.alerts.high_ping_ms.is_finite() && self.alerts.high_ping_ms > 0.0,
            "alerts.high_ping_ms must be > 0, got {}",
            self.alerts.high_ping_ms
        );
        anyhow::ensure!(
            !self.nodes.is_empty(),
            "at least one [[nodes]] entry is required"
        );

        let mut seen = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            anyhow::ensure!(!node.id.is_empty(), "nodes.id must be non-empty");
            anyhow::ensure!(
                seen.insert(node.id.as_str()),
                "nodes.id must be unique, {:?} appears twice",
                node.id
            );
            anyhow::ensure!(
                !node.host.is_empty(),
                "nodes.host must be non-empty for node {:?}",
                node.id
            );
            anyhow::ensure!(
                node.port > 0,
                "nodes.port must be between 1 and 65535 for node {:?}",
                node.id
            );
        }
        Ok(())
    }
}

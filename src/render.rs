// Snapshot -> chat message body. Presentation only; the core never inspects the output.

use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::models::{HostSection, NodeConfig, ProbeResult, Snapshot};
use crate::version::{NAME, VERSION};

const COLOR_ALL_ONLINE: u32 = 0x00ff00;
const COLOR_DEGRADED: u32 = 0xff8800;
const COLOR_ALL_OFFLINE: u32 = 0xff0000;

/// Discord allows 25 fields per embed; two are reserved for quick stats and host.
const MAX_NODE_FIELDS: usize = 23;

/// Message payload accepted by the chat transport (Discord message JSON).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageBody {
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Embed {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub color: u32,
    /// ISO-8601
    pub timestamp: String,
    pub fields: Vec<EmbedField>,
    pub footer: EmbedFooter,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

pub trait Renderer: Send + Sync {
    fn render(&self, snapshot: &Snapshot) -> MessageBody;
}

pub struct EmbedRenderer {
    regions: HashMap<String, String>,
    interval: Duration,
}

impl EmbedRenderer {
    pub fn new(nodes: &[NodeConfig], interval: Duration) -> Self {
        let regions = nodes
            .iter()
            .map(|n| (n.id.clone(), n.region.clone()))
            .collect();
        Self { regions, interval }
    }

    fn node_field(&self, node_id: &str, result: &ProbeResult) -> EmbedField {
        let region = self
            .regions
            .get(node_id)
            .map(String::as_str)
            .unwrap_or("Unknown");
        let value = match result {
            ProbeResult::Online {
                ping_millis,
                metrics,
            } => format!(
                "**CPU:** {:.1}%\n**RAM:** {} / {}\n**Ping:** {:.1} ms\n**Players:** {} ({} playing)\n**Uptime:** {}",
                metrics.cpu_fraction * 100.0,
                format_bytes(metrics.memory_used_bytes),
                format_bytes(metrics.memory_allocated_bytes),
                ping_millis,
                metrics.player_count,
                metrics.playing_count,
                format_uptime(Duration::from_millis(metrics.uptime_millis)),
            ),
            ProbeResult::Offline { reason } => format!("**Offline:** `{}`", reason),
        };
        EmbedField {
            name: format!("{} ({})", node_id, region),
            value,
            inline: true,
        }
    }
}

impl Renderer for EmbedRenderer {
    fn render(&self, snapshot: &Snapshot) -> MessageBody {
        let online = snapshot.online_count();
        let total = snapshot.nodes.len();
        let color = if online == total {
            COLOR_ALL_ONLINE
        } else if online > 0 {
            COLOR_DEGRADED
        } else {
            COLOR_ALL_OFFLINE
        };

        let mut fields = Vec::with_capacity(total.min(MAX_NODE_FIELDS) + 2);
        fields.push(EmbedField {
            name: "Quick Stats".into(),
            value: format!(
                "**Players:** {}\n**Playing:** {}\n**Peak:** {}\n**Nodes:** {}/{}",
                snapshot.total_players(),
                snapshot.total_playing(),
                snapshot.peak_players,
                online,
                total
            ),
            inline: false,
        });
        fields.extend(
            snapshot
                .nodes
                .iter()
                .take(MAX_NODE_FIELDS)
                .map(|n| self.node_field(&n.node_id, &n.result)),
        );
        let description = (total > MAX_NODE_FIELDS)
            .then(|| format!("{} more nodes not shown", total - MAX_NODE_FIELDS));

        let host_value = match &snapshot.host {
            HostSection::Available(h) => format!(
                "**CPU:** {}\n**Usage:** {:.1}%\n**RAM:** {:.1}%\n**Disk:** {:.1}%",
                h.label, h.cpu_percent, h.memory_percent, h.disk_percent
            ),
            HostSection::Unavailable => "Unavailable".into(),
        };
        fields.push(EmbedField {
            name: "Host System".into(),
            value: host_value,
            inline: false,
        });

        let timestamp = chrono::DateTime::from_timestamp_millis(snapshot.timestamp as i64)
            .unwrap_or_default()
            .to_rfc3339();

        MessageBody {
            embeds: vec![Embed {
                title: "Lavalink Monitor".into(),
                description,
                color,
                timestamp,
                fields,
                footer: EmbedFooter {
                    text: format!(
                        "Updates every {}s • {} v{}",
                        self.interval.as_secs(),
                        NAME,
                        VERSION
                    ),
                },
            }],
        }
    }
}

pub fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    match secs {
        0..60 => format!("{}s", secs),
        60..3600 => format!("{}m {}s", secs / 60, secs % 60),
        3600..86400 => format!("{}h {}m", secs / 3600, (secs % 3600) / 60),
        _ => format!("{}d {}h", secs / 86400, (secs % 86400) / 3600),
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    match bytes {
        0..KB => format!("{}B", bytes),
        KB..MB => format!("{:.1}KB", bytes as f64 / KB as f64),
        MB..GB => format!("{:.1}MB", bytes as f64 / MB as f64),
        _ => format!("{:.1}GB", bytes as f64 / GB as f64),
    }
}

// Shared test helpers: in-memory fakes for every seam of the monitor
#![allow(dead_code)]

use async_trait::async_trait;
use lavawatch::dashboard::{ChatTransport, DestinationId, MessageId, MessageIdStore, PublishError};
use lavawatch::models::*;
use lavawatch::probe::NodeProbe;
use lavawatch::render::{Embed, EmbedFooter, MessageBody, Renderer};
use lavawatch::sysinfo_repo::HostMetricsSource;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

pub fn node(id: &str) -> NodeConfig {
    NodeConfig {
        id: id.into(),
        host: "127.0.0.1".into(),
        port: 2333,
        secure: false,
        password: "youshallnotpass".into(),
        region: "EU".into(),
    }
}

pub fn metrics(players: u32) -> MetricsPayload {
    MetricsPayload {
        cpu_fraction: 0.25,
        memory_used_bytes: 256 * 1024 * 1024,
        memory_allocated_bytes: 512 * 1024 * 1024,
        player_count: players,
        playing_count: players / 2,
        uptime_millis: 3_600_000,
    }
}

pub fn online(players: u32) -> ProbeResult {
    ProbeResult::Online {
        ping_millis: 12.5,
        metrics: metrics(players),
    }
}

pub fn host_metrics() -> HostMetrics {
    HostMetrics {
        cpu_percent: 10.0,
        memory_percent: 40.0,
        disk_percent: 55.0,
        label: "Test CPU (2C/4T) • Linux x86_64".into(),
    }
}

pub fn snapshot(timestamp: u64) -> Snapshot {
    Snapshot {
        timestamp,
        nodes: vec![NodeReport {
            node_id: "main".into(),
            result: online(3),
        }],
        host: HostSection::Available(host_metrics()),
        peak_players: 3,
    }
}

/// Probe answering from a per-node script; unknown nodes are refused.
#[derive(Default)]
pub struct ScriptedProbe {
    script: HashMap<String, (Duration, ProbeResult)>,
    pub calls: AtomicUsize,
}

impl ScriptedProbe {
    pub fn with(mut self, id: &str, delay: Duration, result: ProbeResult) -> Self {
        self.script.insert(id.into(), (delay, result));
        self
    }
}

#[async_trait]
impl NodeProbe for ScriptedProbe {
    async fn probe(&self, node: &NodeConfig, timeout: Duration) -> ProbeResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let Some((delay, result)) = self.script.get(&node.id).cloned() else {
            return ProbeResult::offline(ProbeFailure::ConnectionError);
        };
        let answer = async move {
            tokio::time::sleep(delay).await;
            result
        };
        tokio::time::timeout(timeout, answer)
            .await
            .unwrap_or(ProbeResult::offline(ProbeFailure::Timeout))
    }
}

pub struct FixedHost(pub Option<HostMetrics>);

#[async_trait]
impl HostMetricsSource for FixedHost {
    async fn read(&self) -> anyhow::Result<HostMetrics> {
        self.0
            .clone()
            .ok_or_else(|| anyhow::anyhow!("host metrics disabled"))
    }
}

/// Renders the snapshot timestamp into the title so edits can be told apart.
pub struct TitleRenderer;

impl Renderer for TitleRenderer {
    fn render(&self, snapshot: &Snapshot) -> MessageBody {
        MessageBody {
            embeds: vec![Embed {
                title: format!("snapshot {}", snapshot.timestamp),
                description: None,
                color: 0,
                timestamp: String::new(),
                fields: vec![],
                footer: EmbedFooter {
                    text: String::new(),
                },
            }],
        }
    }
}

/// Chat transport whose next create/edit outcomes can be queued.
/// With nothing queued, creates hand out ids from 1000 upward and edits succeed.
pub struct ScriptedTransport {
    next_id: AtomicU64,
    create_script: Mutex<VecDeque<Result<MessageId, PublishError>>>,
    edit_script: Mutex<VecDeque<Result<(), PublishError>>>,
    pub creates: AtomicUsize,
    pub edits: Mutex<Vec<MessageId>>,
    pub last_body: Mutex<Option<MessageBody>>,
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1000),
            create_script: Mutex::new(VecDeque::new()),
            edit_script: Mutex::new(VecDeque::new()),
            creates: AtomicUsize::new(0),
            edits: Mutex::new(Vec::new()),
            last_body: Mutex::new(None),
        }
    }
}

impl ScriptedTransport {
    pub fn push_create(&self, result: Result<MessageId, PublishError>) {
        self.create_script.lock().unwrap().push_back(result);
    }

    pub fn push_edit(&self, result: Result<(), PublishError>) {
        self.edit_script.lock().unwrap().push_back(result);
    }

    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn edited_ids(&self) -> Vec<MessageId> {
        self.edits.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn create_message(
        &self,
        _destination: DestinationId,
        body: &MessageBody,
    ) -> Result<MessageId, PublishError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        *self.last_body.lock().unwrap() = Some(body.clone());
        let scripted = self.create_script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    async fn edit_message(
        &self,
        _destination: DestinationId,
        message_id: MessageId,
        body: &MessageBody,
    ) -> Result<(), PublishError> {
        self.edits.lock().unwrap().push(message_id);
        *self.last_body.lock().unwrap() = Some(body.clone());
        let scripted = self.edit_script.lock().unwrap().pop_front();
        scripted.unwrap_or(Ok(()))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<DestinationId, MessageId>>,
    pub failing: std::sync::atomic::AtomicBool,
}

impl MemoryStore {
    pub fn seeded(destination: DestinationId, message_id: MessageId) -> Self {
        let store = Self::default();
        store
            .records
            .lock()
            .unwrap()
            .insert(destination, message_id);
        store
    }

    pub fn get(&self, destination: DestinationId) -> Option<MessageId> {
        self.records.lock().unwrap().get(&destination).copied()
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("store offline");
        }
        Ok(())
    }
}

#[async_trait]
impl MessageIdStore for MemoryStore {
    async fn load(&self, destination: DestinationId) -> anyhow::Result<Option<MessageId>> {
        self.check()?;
        Ok(self.get(destination))
    }

    async fn save(&self, destination: DestinationId, message_id: MessageId) -> anyhow::Result<()> {
        self.check()?;
        self.records
            .lock()
            .unwrap()
            .insert(destination, message_id);
        Ok(())
    }

    async fn clear(&self, destination: DestinationId) -> anyhow::Result<()> {
        self.check()?;
        self.records.lock().unwrap().remove(&destination);
        Ok(())
    }
}

// WebSocket stream of snapshots

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use bytes::Bytes;
use tokio::time::{Duration, timeout};

use super::AppState;
use crate::monitor::LatestSnapshot;

pub(super) const WS_PING_INTERVAL: Duration = Duration::from_secs(30);
pub(super) const WS_SEND_TIMEOUT: Duration = Duration::from_secs(10);

pub(super) async fn ws_snapshots(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let rx = state.latest.clone();
    ws.on_upgrade(move |socket| async move {
        if let Err(e) = stream_snapshots(socket, rx).await {
            tracing::info!("Snapshot stream error: {}", e);
        }
    })
}

/// Sends the current snapshot (if any) on connect, then every new one.
async fn stream_snapshots(mut socket: WebSocket, mut rx: LatestSnapshot) -> anyhow::Result<()> {
    tracing::info!("Client connected to snapshot stream");

    let mut ping_interval = tokio::time::interval(WS_PING_INTERVAL);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // The first interval tick completes immediately.
    ping_interval.tick().await;

    let current = rx.borrow_and_update().clone();
    if let Some(snapshot) = current
        && !send(&mut socket, Message::Text(serde_json::to_string(&*snapshot)?.into())).await
    {
        return Ok(());
    }

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let latest = rx.borrow_and_update().clone();
                let Some(snapshot) = latest else { continue };
                let json = serde_json::to_string(&*snapshot)?;
                if !send(&mut socket, Message::Text(json.into())).await {
                    break;
                }
            }
            _ = ping_interval.tick() => {
                if !send(&mut socket, Message::Ping(Bytes::new())).await {
                    break;
                }
            }
        }
    }
    Ok(())
}

/// False when the client is gone or too slow.
async fn send(socket: &mut WebSocket, message: Message) -> bool {
    matches!(timeout(WS_SEND_TIMEOUT, socket.send(message)).await, Ok(Ok(())))
}

use anyhow::Result;
use lavawatch::*;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

/// Pending admin commands beyond this are refused until the scheduler catches up.
const COMMAND_QUEUE: usize = 8;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    let interval = app_config.monitor.interval();

    let host_repo = sysinfo_repo::SysinfoRepo::new();
    let host_label = host_repo.label().to_string();
    let aggregator = aggregator::Aggregator::new(
        Arc::new(probe::HttpProbe::new()?),
        Arc::new(host_repo),
        app_config.monitor.probe_timeout(),
    );

    let store = message_store::SqliteMessageStore::connect(&app_config.database.path).await?;
    store.init().await?;
    let dashboard = dashboard::DashboardMessage::new(
        Arc::new(transport::DiscordTransport::new(
            &app_config.discord.api_base,
            &app_config.discord.token,
        )?),
        Arc::new(render::EmbedRenderer::new(&app_config.nodes, interval)),
        Arc::new(store),
    );

    let alerting = app_config.alerts.enabled.then(|| monitor::Alerting {
        sink: Arc::new(alerts::LogAlertSink),
        high_ping_ms: app_config.alerts.high_ping_ms,
    });

    let (latest_tx, latest_rx) = watch::channel(None);
    let monitor = monitor::Monitor::new(monitor::MonitorDeps {
        nodes: app_config.nodes.clone(),
        aggregator,
        dashboard,
        destination: app_config.discord.channel_id,
        alerting,
        latest_tx,
    })
    .await;

    let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE);
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let scheduler_handle = scheduler::spawn(
        monitor,
        interval,
        scheduler::SchedulerDeps {
            commands: command_rx,
            shutdown_rx,
        },
    );
    tracing::info!(
        nodes = app_config.nodes.len(),
        interval_secs = app_config.monitor.interval_secs,
        channel = app_config.discord.channel_id,
        "Monitoring started"
    );

    let app = routes::app(routes::AdminDeps {
        nodes: app_config.nodes.iter().map(|n| n.summary()).collect(),
        host_label,
        interval,
        latest: latest_rx,
        commands: command_tx,
        admin_token: app_config.server.admin_token.clone(),
    });
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = shutdown_signal() => {
            tracing::info!("Received shutdown signal");
        }
    }

    let _ = shutdown_tx.send(());
    let _ = scheduler_handle.await;
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

// Fixed-interval tick driver.
// The wait starts when a tick ends, so ticks never overlap and a slow tick simply
// delays the next one. Commands and shutdown are only observed between ticks.

use async_trait::async_trait;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{Instrument, debug, error, warn};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// Requests from outside the scheduler, applied between ticks.
#[derive(Debug)]
pub enum Command {
    /// Forget the live dashboard message; `done` fires once applied.
    ResetDashboard { done: oneshot::Sender<()> },
}

/// One unit of scheduled work plus its command handling.
#[async_trait]
pub trait Tick: Send {
    async fn tick(&mut self) -> anyhow::Result<()>;

    async fn handle(&mut self, command: Command);
}

pub struct SchedulerDeps {
    pub commands: mpsc::Receiver<Command>,
    pub shutdown_rx: oneshot::Receiver<()>,
}

pub fn spawn<T>(job: T, interval: Duration, deps: SchedulerDeps) -> tokio::task::JoinHandle<()>
where
    T: Tick + 'static,
{
    let span = tracing::debug_span!("scheduler", interval_ms = interval.as_millis() as u64);
    tokio::spawn(run(job, interval, deps).instrument(span))
}

/// Runs until `shutdown_rx` fires (or its sender is dropped). The first tick is immediate.
pub async fn run<T: Tick>(mut job: T, interval: Duration, deps: SchedulerDeps) {
    let SchedulerDeps {
        mut commands,
        mut shutdown_rx,
    } = deps;

    let mut ticks: u64 = 0;
    let mut failed_ticks: u64 = 0;

    loop {
        let started = Instant::now();
        ticks += 1;
        if !run_tick(&mut job).await {
            failed_ticks += 1;
        }
        debug!(
            tick = ticks,
            failed_ticks,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "tick finished"
        );

        let next = Instant::now() + interval;
        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(next) => break,
                Some(command) = commands.recv() => job.handle(command).await,
                _ = &mut shutdown_rx => {
                    debug!(ticks, failed_ticks, "scheduler shutting down");
                    return;
                }
            }
        }
    }
}

/// A failing or panicking tick is logged and swallowed. Returns whether it succeeded.
async fn run_tick<T: Tick>(job: &mut T) -> bool {
    match AssertUnwindSafe(job.tick()).catch_unwind().await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            warn!(error = %format!("{:#}", e), operation = "tick", "tick failed");
            false
        }
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".into());
            error!(panic = %message, operation = "tick", "tick panicked");
            false
        }
    }
}

// Scheduler: immediate first tick, non-overlap, failure isolation, commands, shutdown

use async_trait::async_trait;
use lavawatch::scheduler::{Command, SchedulerDeps, Tick, spawn};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Behaviour {
    Succeed,
    Fail,
    Panic,
}

#[derive(Default)]
struct Log {
    ticks: Vec<(Instant, Instant)>,
    commands: Vec<Instant>,
}

struct RecordingJob {
    log: Arc<Mutex<Log>>,
    tick_duration: Duration,
    script: Vec<Behaviour>,
}

impl RecordingJob {
    fn new(tick_duration: Duration) -> (Self, Arc<Mutex<Log>>) {
        let log = Arc::new(Mutex::new(Log::default()));
        let job = Self {
            log: log.clone(),
            tick_duration,
            script: vec![],
        };
        (job, log)
    }

    fn scripted(mut self, script: Vec<Behaviour>) -> Self {
        self.script = script;
        self
    }
}

#[async_trait]
impl Tick for RecordingJob {
    async fn tick(&mut self) -> anyhow::Result<()> {
        let started = Instant::now();
        tokio::time::sleep(self.tick_duration).await;
        let index = {
            let mut log = self.log.lock().unwrap();
            log.ticks.push((started, Instant::now()));
            log.ticks.len() - 1
        };
        match self.script.get(index).copied().unwrap_or(Behaviour::Succeed) {
            Behaviour::Succeed => Ok(()),
            Behaviour::Fail => anyhow::bail!("tick {} failed", index),
            Behaviour::Panic => panic!("tick {} panicked", index),
        }
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::ResetDashboard { done } => {
                self.log.lock().unwrap().commands.push(Instant::now());
                let _ = done.send(());
            }
        }
    }
}

struct Harness {
    commands: mpsc::Sender<Command>,
    shutdown: oneshot::Sender<()>,
    handle: tokio::task::JoinHandle<()>,
}

fn start(job: RecordingJob, interval: Duration) -> Harness {
    let (commands, command_rx) = mpsc::channel(4);
    let (shutdown, shutdown_rx) = oneshot::channel();
    let handle = spawn(
        job,
        interval,
        SchedulerDeps {
            commands: command_rx,
            shutdown_rx,
        },
    );
    Harness {
        commands,
        shutdown,
        handle,
    }
}

impl Harness {
    async fn stop(self) {
        let _ = self.shutdown.send(());
        self.handle.await.unwrap();
    }
}

#[tokio::test(start_paused = true)]
async fn first_tick_is_immediate_and_ticks_never_overlap() {
    let interval = Duration::from_secs(10);
    let (job, log) = RecordingJob::new(Duration::from_secs(3));
    let origin = Instant::now();
    let harness = start(job, interval);

    tokio::time::sleep(Duration::from_secs(31)).await;
    harness.stop().await;

    let log = log.lock().unwrap();
    assert_eq!(log.ticks.len(), 3);
    assert!(log.ticks[0].0 - origin < Duration::from_millis(1));
    for pair in log.ticks.windows(2) {
        let (_, prev_end) = pair[0];
        let (next_start, _) = pair[1];
        assert!(next_start >= prev_end + interval);
    }
}

#[tokio::test(start_paused = true)]
async fn slow_tick_delays_the_next_one() {
    let interval = Duration::from_secs(1);
    let (job, log) = RecordingJob::new(Duration::from_secs(5));
    let harness = start(job, interval);

    tokio::time::sleep(Duration::from_secs(8)).await;
    harness.stop().await;

    let log = log.lock().unwrap();
    // 0..5 tick, 5..6 wait, 6..11 tick (still running at 8, finishes before stop is seen)
    assert_eq!(log.ticks.len(), 2);
    assert!(log.ticks[1].0 >= log.ticks[0].1 + interval);
}

#[tokio::test(start_paused = true)]
async fn failing_and_panicking_ticks_do_not_stop_the_schedule() {
    let (job, log) = RecordingJob::new(Duration::ZERO);
    let job = job.scripted(vec![Behaviour::Fail, Behaviour::Panic, Behaviour::Succeed]);
    let harness = start(job, Duration::from_secs(1));

    tokio::time::sleep(Duration::from_millis(3500)).await;
    assert!(!harness.handle.is_finished());
    harness.stop().await;

    assert_eq!(log.lock().unwrap().ticks.len(), 4);
}

#[tokio::test(start_paused = true)]
async fn command_is_applied_between_ticks() {
    let (job, log) = RecordingJob::new(Duration::ZERO);
    let harness = start(job, Duration::from_secs(10));

    tokio::time::sleep(Duration::from_secs(1)).await;
    let (done, applied) = oneshot::channel();
    harness
        .commands
        .send(Command::ResetDashboard { done })
        .await
        .unwrap();
    applied.await.unwrap();

    {
        let log = log.lock().unwrap();
        assert_eq!(log.commands.len(), 1);
        // Handling a command does not trigger an extra tick.
        assert_eq!(log.ticks.len(), 1);
    }
    harness.stop().await;
}

#[tokio::test(start_paused = true)]
async fn command_sent_during_a_tick_waits_for_it_to_finish() {
    let (job, log) = RecordingJob::new(Duration::from_secs(5));
    let harness = start(job, Duration::from_secs(10));

    tokio::time::sleep(Duration::from_secs(1)).await;
    let (done, applied) = oneshot::channel();
    harness
        .commands
        .send(Command::ResetDashboard { done })
        .await
        .unwrap();
    applied.await.unwrap();

    {
        let log = log.lock().unwrap();
        assert_eq!(log.ticks.len(), 1);
        assert!(log.commands[0] >= log.ticks[0].1);
    }
    harness.stop().await;
}

#[tokio::test(start_paused = true)]
async fn dropping_the_shutdown_sender_stops_the_scheduler() {
    let (job, log) = RecordingJob::new(Duration::ZERO);
    let harness = start(job, Duration::from_secs(1));

    tokio::time::sleep(Duration::from_millis(100)).await;
    drop(harness.shutdown);
    harness.handle.await.unwrap();

    let ticks = log.lock().unwrap().ticks.len();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(log.lock().unwrap().ticks.len(), ticks);
}

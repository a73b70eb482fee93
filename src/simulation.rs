//! Simulation orchestration.
//!
//! This module wires the producer, ticker, aging, consumer and reporter loops around one shared
//! [`SchedulerContext`], exposes configuration objects that make the queue shape and loop
//! periods tunable, and owns the shutdown token that stops every loop.

use crate::class::{ClassTable, ProcessClass};
use crate::context::SchedulerContext;
use crate::error::SchedError;
use crate::process::Process;
use crate::scheduler::tiered_queue::TieredQueue;
use crate::snapshot::Snapshot;
use crate::threading::{spawn_periodic, ShutdownToken};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Snapshots buffered for the report consumer before new ones are dropped.
const SNAPSHOT_BACKLOG: usize = 16;

/// Serde helper storing a `Duration` as whole milliseconds.
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Shape of the tiered ready queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// A tier longer than this is split into the tier above.
    pub threshold: usize,
    /// Tiers present before any work arrives.
    pub initial_tiers: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            threshold: TieredQueue::DEFAULT_THRESHOLD,
            initial_tiers: TieredQueue::DEFAULT_INITIAL_TIERS,
        }
    }
}

/// Synthetic workload generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProducerConfig {
    /// One process is created per interval.
    #[serde(with = "duration_ms")]
    pub interval: Duration,
    /// Every n-th process is foreground and goes straight to the ready queue; the rest are
    /// background and sleep in the wait set first.
    pub foreground_every: u32,
    /// How long background processes sleep before they become runnable.
    #[serde(with = "duration_ms")]
    pub wake_delay: Duration,
    /// Execution time (milliseconds) given to new processes of each class.
    pub remaining_ms: ClassTable<u64>,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            foreground_every: 2,
            wake_delay: Duration::from_secs(2),
            remaining_ms: ClassTable::from_fn(|class| match class {
                ProcessClass::Foreground => 300,
                ProcessClass::Background => 1_000,
            }),
        }
    }
}

/// Work consumer that drains the ready queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerConfig {
    /// Execution charged to a process each time it is dispatched.
    #[serde(with = "duration_ms")]
    pub quantum: Duration,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            quantum: Duration::from_millis(100),
        }
    }
}

/// Periods of the background loops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntervalConfig {
    #[serde(with = "duration_ms")]
    pub tick: Duration,
    #[serde(with = "duration_ms")]
    pub aging: Duration,
    #[serde(with = "duration_ms")]
    pub consume: Duration,
    #[serde(with = "duration_ms")]
    pub report: Duration,
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
            aging: Duration::from_millis(700),
            consume: Duration::from_millis(250),
            report: Duration::from_secs(1),
        }
    }
}

/// Top-level simulation configuration used during startup.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub queue: QueueConfig,
    pub producer: ProducerConfig,
    pub consumer: ConsumerConfig,
    pub intervals: IntervalConfig,
}

impl SimulationConfig {
    /// Reject settings that would stall a loop or break a queue invariant.
    pub fn validate(&self) -> Result<(), SchedError> {
        let loops = [
            ("producer", self.producer.interval),
            ("tick", self.intervals.tick),
            ("aging", self.intervals.aging),
            ("consume", self.intervals.consume),
            ("report", self.intervals.report),
        ];
        for (name, interval) in loops {
            if interval.is_zero() {
                return Err(SchedError::InvalidConfig(format!(
                    "{name} interval must be non-zero"
                )));
            }
        }
        if self.producer.foreground_every == 0 {
            return Err(SchedError::InvalidConfig(
                "foreground_every must be at least 1".to_string(),
            ));
        }
        if self.consumer.quantum.is_zero() {
            return Err(SchedError::InvalidConfig(
                "consumer quantum must be non-zero".to_string(),
            ));
        }
        // Queue shape is checked by the queue constructor itself.
        TieredQueue::with_config(self.queue.threshold, self.queue.initial_tiers).map(|_| ())
    }
}

/// Counters updated by the simulation loops.
#[derive(Debug, Default)]
pub struct SimulationStats {
    created: AtomicU64,
    admitted_ready: AtomicU64,
    admitted_waiting: AtomicU64,
    woken: AtomicU64,
    promoted: AtomicU64,
    dispatched: AtomicU64,
    requeued: AtomicU64,
    finished: AtomicU64,
    empty_polls: AtomicU64,
    reports_dropped: AtomicU64,
}

/// Point-in-time copy of [`SimulationStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StatsSnapshot {
    pub created: u64,
    pub admitted_ready: u64,
    pub admitted_waiting: u64,
    pub woken: u64,
    pub promoted: u64,
    pub dispatched: u64,
    pub requeued: u64,
    pub finished: u64,
    pub empty_polls: u64,
    pub reports_dropped: u64,
}

impl SimulationStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            created: self.created.load(Ordering::Relaxed),
            admitted_ready: self.admitted_ready.load(Ordering::Relaxed),
            admitted_waiting: self.admitted_waiting.load(Ordering::Relaxed),
            woken: self.woken.load(Ordering::Relaxed),
            promoted: self.promoted.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            requeued: self.requeued.load(Ordering::Relaxed),
            finished: self.finished.load(Ordering::Relaxed),
            empty_polls: self.empty_polls.load(Ordering::Relaxed),
            reports_dropped: self.reports_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Final state handed back by [`Simulation::shutdown`].
#[derive(Debug, Clone)]
pub struct ShutdownReport {
    pub snapshot: Snapshot,
    pub stats: StatsSnapshot,
}

/// Complete simulation wiring: shared context, loops, counters and the report channel.
pub struct Simulation {
    config: SimulationConfig,
    context: Arc<SchedulerContext>,
    stats: Arc<SimulationStats>,
    token: ShutdownToken,
    snapshot_tx: Sender<Snapshot>,
    snapshot_rx: Receiver<Snapshot>,
    handles: Vec<JoinHandle<()>>,
}

impl Simulation {
    /// Build the simulation without starting any threads yet.
    pub fn new(config: SimulationConfig) -> Result<Self, SchedError> {
        config.validate()?;
        let ready = TieredQueue::with_config(config.queue.threshold, config.queue.initial_tiers)?;
        let (snapshot_tx, snapshot_rx) = bounded(SNAPSHOT_BACKLOG);
        Ok(Self {
            config,
            context: Arc::new(SchedulerContext::new(ready)),
            stats: Arc::new(SimulationStats::default()),
            token: ShutdownToken::new(),
            snapshot_tx,
            snapshot_rx,
            handles: Vec::new(),
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Shared scheduler context, for callers that want to admit or remove work themselves.
    pub fn context(&self) -> Arc<SchedulerContext> {
        self.context.clone()
    }

    /// Token that stops every loop when triggered (for example from a Ctrl-C handler).
    pub fn token(&self) -> ShutdownToken {
        self.token.clone()
    }

    /// Periodic snapshots published by the reporter loop.
    pub fn snapshots(&self) -> Receiver<Snapshot> {
        self.snapshot_rx.clone()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Launch the producer, ticker, aging, consumer and reporter threads.
    pub fn start(&mut self) -> io::Result<()> {
        self.spawn_producer()?;
        self.spawn_ticker()?;
        self.spawn_aging()?;
        self.spawn_consumer()?;
        self.spawn_reporter()?;
        info!(
            "simulation started: threshold {}, {} initial tiers",
            self.config.queue.threshold, self.config.queue.initial_tiers
        );
        Ok(())
    }

    fn spawn_producer(&mut self) -> io::Result<()> {
        let context = self.context.clone();
        let stats = self.stats.clone();
        let producer = self.config.producer.clone();
        let mut produced: u64 = 0;
        let handle = spawn_periodic("producer", producer.interval, self.token.clone(), move || {
            let class = if produced % u64::from(producer.foreground_every) == 0 {
                ProcessClass::Foreground
            } else {
                ProcessClass::Background
            };
            produced += 1;
            let remaining = Duration::from_millis(producer.remaining_ms[class]);
            stats.created.fetch_add(1, Ordering::Relaxed);
            match class {
                ProcessClass::Foreground => {
                    let process = Process::new(class, remaining);
                    info!("created pid {}{} (ready)", process.id, class.tag());
                    context.admit(process, true);
                    stats.admitted_ready.fetch_add(1, Ordering::Relaxed);
                }
                ProcessClass::Background => {
                    let wake = Instant::now() + producer.wake_delay;
                    let process = Process::sleeping_until(class, remaining, wake);
                    info!("created pid {}{} (sleeping)", process.id, class.tag());
                    context.admit_to_wait_set(process);
                    stats.admitted_waiting.fetch_add(1, Ordering::Relaxed);
                }
            }
        })?;
        self.handles.push(handle);
        Ok(())
    }

    fn spawn_ticker(&mut self) -> io::Result<()> {
        let context = self.context.clone();
        let stats = self.stats.clone();
        let handle = spawn_periodic(
            "ticker",
            self.config.intervals.tick,
            self.token.clone(),
            move || {
                let woken = context.tick(Instant::now());
                stats.woken.fetch_add(woken as u64, Ordering::Relaxed);
            },
        )?;
        self.handles.push(handle);
        Ok(())
    }

    fn spawn_aging(&mut self) -> io::Result<()> {
        let context = self.context.clone();
        let stats = self.stats.clone();
        let handle = spawn_periodic(
            "aging",
            self.config.intervals.aging,
            self.token.clone(),
            move || {
                if context.promote().is_some() {
                    stats.promoted.fetch_add(1, Ordering::Relaxed);
                }
            },
        )?;
        self.handles.push(handle);
        Ok(())
    }

    fn spawn_consumer(&mut self) -> io::Result<()> {
        let context = self.context.clone();
        let stats = self.stats.clone();
        let quantum = self.config.consumer.quantum;
        let handle = spawn_periodic(
            "consumer",
            self.config.intervals.consume,
            self.token.clone(),
            move || {
                let mut process = match context.remove() {
                    Ok(process) => process,
                    Err(_) => {
                        stats.empty_polls.fetch_add(1, Ordering::Relaxed);
                        return;
                    }
                };
                stats.dispatched.fetch_add(1, Ordering::Relaxed);
                // The process is owned by this thread until it is re-admitted or dropped.
                if process.run_for(quantum) {
                    info!("pid {}{} finished", process.id, process.class.tag());
                    stats.finished.fetch_add(1, Ordering::Relaxed);
                } else {
                    let is_foreground = process.class.is_foreground();
                    context.admit(process, is_foreground);
                    stats.requeued.fetch_add(1, Ordering::Relaxed);
                }
            },
        )?;
        self.handles.push(handle);
        Ok(())
    }

    fn spawn_reporter(&mut self) -> io::Result<()> {
        let context = self.context.clone();
        let stats = self.stats.clone();
        let tx = self.snapshot_tx.clone();
        let handle = spawn_periodic(
            "reporter",
            self.config.intervals.report,
            self.token.clone(),
            move || match tx.try_send(context.snapshot()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    stats.reports_dropped.fetch_add(1, Ordering::Relaxed);
                }
                Err(TrySendError::Disconnected(_)) => {}
            },
        )?;
        self.handles.push(handle);
        Ok(())
    }

    /// Signal every loop to stop, wait for them, and return the final state.
    ///
    /// Loops only exit at iteration boundaries, so the returned snapshot never contains a
    /// half-migrated process.
    pub fn shutdown(mut self) -> ShutdownReport {
        self.token.stop();
        for handle in self.handles.drain(..) {
            let name = handle.thread().name().unwrap_or("worker").to_string();
            if handle.join().is_err() {
                warn!("{name} thread panicked during shutdown");
            }
        }
        let report = ShutdownReport {
            snapshot: self.context.snapshot(),
            stats: self.stats.snapshot(),
        };
        info!(
            "simulation stopped: {} created, {} finished, {} still queued",
            report.stats.created,
            report.stats.finished,
            report.snapshot.pids().len()
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_intervals_and_bad_queue_shape_are_rejected() {
        let mut config = SimulationConfig::default();
        config.intervals.tick = Duration::ZERO;
        assert!(matches!(
            config.validate(),
            Err(SchedError::InvalidConfig(msg)) if msg.contains("tick")
        ));

        let mut config = SimulationConfig::default();
        config.queue.threshold = 0;
        assert!(Simulation::new(config).is_err());

        let mut config = SimulationConfig::default();
        config.producer.foreground_every = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_round_trips_through_json_with_millisecond_durations() {
        let json = r#"{"queue":{"threshold":3},"intervals":{"tick":50}}"#;
        let config: SimulationConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.queue.threshold, 3);
        assert_eq!(config.queue.initial_tiers, 2);
        assert_eq!(config.intervals.tick, Duration::from_millis(50));
        assert_eq!(config.intervals.report, Duration::from_secs(1));

        let encoded = serde_json::to_string(&config).unwrap();
        assert!(encoded.contains("\"tick\":50"));
    }

    #[test]
    fn short_remaining_time_table_is_rejected_at_parse_time() {
        let json = r#"{"producer":{"interval":1,"remaining_ms":{"values":[300]}}}"#;
        let err = serde_json::from_str::<SimulationConfig>(json).unwrap_err();
        assert!(err.to_string().contains("class table"));

        let json = r#"{"producer":{"remaining_ms":{"values":[20,40]}}}"#;
        let config: SimulationConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.producer.remaining_ms[ProcessClass::Background], 40);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn oversized_durations_saturate_when_serialised() {
        let mut config = SimulationConfig::default();
        config.intervals.report = Duration::MAX;
        let encoded = serde_json::to_string(&config).unwrap();
        assert!(encoded.contains(&format!("\"report\":{}", u64::MAX)));
    }

    #[test]
    fn shutdown_without_start_returns_empty_report() {
        let simulation = Simulation::new(SimulationConfig::default()).unwrap();
        let report = simulation.shutdown();
        assert_eq!(report.stats, StatsSnapshot::default());
        assert_eq!(report.snapshot.tiers.len(), 2);
    }
}

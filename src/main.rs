// Simulator binary - runs the tiered scheduler loops and prints periodic reports
//
// The binary loads the simulation configuration (defaults, optional JSON file, then command-line
// overrides), starts the producer/ticker/aging/consumer/reporter threads, and prints every
// snapshot until Ctrl+C is received.

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::RecvTimeoutError;
use log::info;
use std::path::PathBuf;
use std::time::Duration;
use tiered_sched::simulation::{Simulation, SimulationConfig};

/// Simulate a CPU scheduler with a self-rebalancing multi-level ready queue.
#[derive(Debug, Parser)]
#[command(version)]
struct Opts {
    /// Load the simulation configuration from a JSON file. Flags below override it.
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,

    /// Split a tier once it holds more than this many processes.
    #[clap(short = 't', long)]
    threshold: Option<usize>,

    /// Number of tiers present at startup.
    #[clap(long)]
    initial_tiers: Option<usize>,

    /// Interval between two produced processes, in milliseconds.
    #[clap(long)]
    produce_ms: Option<u64>,

    /// Interval between two wait-set ticks, in milliseconds.
    #[clap(long)]
    tick_ms: Option<u64>,

    /// Interval between two aging (promotion) steps, in milliseconds.
    #[clap(long)]
    aging_ms: Option<u64>,

    /// Interval between two dispatches, in milliseconds.
    #[clap(long)]
    consume_ms: Option<u64>,

    /// Interval between two reports, in milliseconds.
    #[clap(short = 'r', long)]
    report_ms: Option<u64>,

    /// Stop after this many seconds instead of waiting for Ctrl+C.
    #[clap(short = 'd', long)]
    duration_secs: Option<u64>,

    /// Print reports as JSON lines instead of the DQ/WQ text layout.
    #[clap(long, action = clap::ArgAction::SetTrue)]
    json: bool,

    /// Enable verbose output. Repeat for trace-level queue operations.
    #[clap(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Opts {
    /// Build the effective configuration: defaults, then the config file, then flags.
    fn simulation_config(&self) -> Result<SimulationConfig> {
        let mut config: SimulationConfig = match &self.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("Failed to parse config file {}", path.display()))?
            }
            None => SimulationConfig::default(),
        };

        if let Some(threshold) = self.threshold {
            config.queue.threshold = threshold;
        }
        if let Some(tiers) = self.initial_tiers {
            config.queue.initial_tiers = tiers;
        }
        if let Some(ms) = self.produce_ms {
            config.producer.interval = Duration::from_millis(ms);
        }
        if let Some(ms) = self.tick_ms {
            config.intervals.tick = Duration::from_millis(ms);
        }
        if let Some(ms) = self.aging_ms {
            config.intervals.aging = Duration::from_millis(ms);
        }
        if let Some(ms) = self.consume_ms {
            config.intervals.consume = Duration::from_millis(ms);
        }
        if let Some(ms) = self.report_ms {
            config.intervals.report = Duration::from_millis(ms);
        }
        Ok(config)
    }
}

fn init_logging(verbose: u8) -> Result<()> {
    let loglevel = match verbose {
        0 => simplelog::LevelFilter::Info,
        1 => simplelog::LevelFilter::Debug,
        _ => simplelog::LevelFilter::Trace,
    };

    let mut lcfg = simplelog::ConfigBuilder::new();
    lcfg.set_time_level(simplelog::LevelFilter::Error)
        .set_location_level(simplelog::LevelFilter::Off)
        .set_target_level(simplelog::LevelFilter::Off)
        .set_thread_level(simplelog::LevelFilter::Off);
    simplelog::TermLogger::init(
        loglevel,
        lcfg.build(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )?;
    Ok(())
}

fn main() -> Result<()> {
    let opts = Opts::parse();
    init_logging(opts.verbose)?;

    let config = opts.simulation_config()?;
    let mut simulation = Simulation::new(config).context("Invalid simulation configuration")?;

    let shutdown = simulation.token();
    let shutdown_clone = shutdown.clone();
    ctrlc::set_handler(move || {
        shutdown_clone.stop();
    })
    .context("Error setting Ctrl-C handler")?;

    simulation
        .start()
        .context("Failed to start simulation threads")?;

    let stop_at = opts
        .duration_secs
        .map(|secs| std::time::Instant::now() + Duration::from_secs(secs));
    let reports = simulation.snapshots();
    while !shutdown.is_stopped() {
        if stop_at.is_some_and(|deadline| std::time::Instant::now() >= deadline) {
            break;
        }
        match reports.recv_timeout(Duration::from_millis(100)) {
            Ok(snapshot) => {
                if opts.json {
                    println!("{}", serde_json::to_string(&snapshot)?);
                } else {
                    print!("{snapshot}");
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    let report = simulation.shutdown();
    if opts.json {
        println!("{}", serde_json::to_string(&report.stats)?);
    } else {
        print!("{}", report.snapshot);
        info!("final counters: {:?}", report.stats);
    }
    Ok(())
}

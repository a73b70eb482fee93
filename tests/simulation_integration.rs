// Integration test for the threaded simulation: start, let the loops run, shut down cleanly

use std::time::Duration;

use tiered_sched::simulation::{Simulation, SimulationConfig};

fn fast_config() -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.queue.threshold = 3;
    config.producer.interval = Duration::from_millis(2);
    config.producer.wake_delay = Duration::from_millis(5);
    config.intervals.tick = Duration::from_millis(3);
    config.intervals.aging = Duration::from_millis(4);
    config.intervals.consume = Duration::from_millis(3);
    config.intervals.report = Duration::from_millis(10);
    config.consumer.quantum = Duration::from_millis(100);
    config
}

#[test]
fn simulation_conserves_every_created_process() {
    let mut simulation = Simulation::new(fast_config()).expect("valid config");
    let reports = simulation.snapshots();
    simulation.start().expect("threads start");

    let first = reports
        .recv_timeout(Duration::from_secs(5))
        .expect("reporter publishes snapshots");
    assert!(!first.tiers.is_empty());

    std::thread::sleep(Duration::from_millis(200));
    let report = simulation.shutdown();
    let stats = report.stats;

    assert!(stats.created > 0);
    assert_eq!(stats.created, stats.admitted_ready + stats.admitted_waiting);

    // Nothing is held by a consumer once every loop has been joined.
    let queued = report.snapshot.pids().len() as u64;
    assert_eq!(stats.created, queued + stats.finished);

    let mut pids = report.snapshot.pids();
    pids.sort_unstable();
    pids.dedup();
    assert_eq!(pids.len() as u64, queued, "a process is present twice");
    assert!(!report.snapshot.tiers.is_empty());
}

#[test]
fn token_stops_loops_before_shutdown_is_called() {
    let mut simulation = Simulation::new(fast_config()).expect("valid config");
    simulation.start().expect("threads start");
    std::thread::sleep(Duration::from_millis(30));

    simulation.token().stop();
    std::thread::sleep(Duration::from_millis(50));
    let settled = simulation.stats();
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(simulation.stats(), settled);

    let report = simulation.shutdown();
    assert_eq!(report.stats, settled);
}

#[test]
fn external_consumer_can_drain_the_shared_context() {
    let mut config = fast_config();
    // Keep the built-in consumer out of the way.
    config.intervals.consume = Duration::from_secs(60);
    let mut simulation = Simulation::new(config).expect("valid config");
    let context = simulation.context();
    simulation.start().expect("threads start");
    std::thread::sleep(Duration::from_millis(50));

    let mut drained = 0;
    while context.remove().is_ok() {
        drained += 1;
    }
    assert!(drained > 0);
    simulation.shutdown();
}

pub mod class;
pub mod context;
pub mod error;
pub mod process;
pub mod scheduler;
pub mod simulation;
pub mod snapshot;
pub mod threading;

// Re-export for easier testing
pub use context::SchedulerContext;
pub use error::SchedError;
pub use process::{Pid, Process};
pub use scheduler::tiered_queue::TieredQueue;
pub use scheduler::wait_set::WaitSet;
pub use simulation::{Simulation, SimulationConfig};

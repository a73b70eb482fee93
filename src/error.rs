//! Error type shared by the scheduler structures and the simulation driver.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedError {
    /// `remove` found no process in any tier. Callers decide whether to wait and retry.
    #[error("ready queue is empty")]
    EmptyQueue,

    /// Construction parameters that would break a queue invariant.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

use thiserror::Error;

use crate::engine::TaskId;
use crate::time::SimTime;

/// A task blocked on a resource when the event queue drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockedOn {
    Processor,
    Memory { amount: u64 },
}

/// Fatal conditions of a run. Every variant carries the clock value at which
/// the condition was detected.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("[t={clock}] {task} scheduled a negative delay of {delay}")]
    NegativeDelay {
        clock: SimTime,
        task: TaskId,
        delay: SimTime,
    },

    #[error("[t={clock}] clock would move back to {due}")]
    ClockRegression { clock: SimTime, due: SimTime },

    #[error("[t={clock}] {task} already has a pending event")]
    AlreadyScheduled { clock: SimTime, task: TaskId },

    #[error("[t={clock}] memory pool: {task} used amount {amount} outside 1..={capacity}")]
    InvalidAmount {
        clock: SimTime,
        task: TaskId,
        amount: u64,
        capacity: u64,
    },

    #[error("[t={clock}] memory pool: {task} released {amount}, level {level} would exceed capacity {capacity}")]
    CapacityExceeded {
        clock: SimTime,
        task: TaskId,
        amount: u64,
        level: u64,
        capacity: u64,
    },

    #[error("[t={clock}] processor: {task} released without holding it (holder: {holder:?})")]
    ProcessorNotHeld {
        clock: SimTime,
        task: TaskId,
        holder: Option<TaskId>,
    },

    #[error("[t={clock}] processor: {task} requested it while already holding or awaiting it")]
    ProcessorBusy { clock: SimTime, task: TaskId },

    #[error("[t={clock}] no runnable task with id {task}")]
    UnknownTask { clock: SimTime, task: TaskId },

    #[error("[t={clock}] run stalled with {count} blocked task(s): {blocked:?}", count = .blocked.len())]
    Stalled {
        clock: SimTime,
        blocked: Vec<(TaskId, BlockedOn)>,
    },

    #[error("[t={clock}] run did not drain within {limit} resumptions")]
    StepLimitExceeded { clock: SimTime, limit: u64 },

    #[error("Configuration error: {0}")]
    Config(String),
}

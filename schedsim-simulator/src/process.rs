//! Process task: the per-process lifecycle as an explicit state machine.
//!
//! ```text
//! ARRIVING -> AWAITING_MEMORY -> MEMORY_SETUP -> DISPATCHING -> RUNNING
//!                  ^                                 ^             |
//!                  |                                 +-- STAY_READY (19/21)
//!                  +-- READY <--------------------------------------+ (1/21)
//!                  +-- READY <- WAITING <---------------------------+ (1/21)
//!                                                    RUNNING -> DONE when work <= 0
//! ```
//!
//! READY restarts the lifecycle in place: memory is returned, a new
//! requirement is drawn, and the process queues for memory again. Remaining
//! work carries over. This is a state transition, never a new task.

use std::num::NonZeroU64;

use rand::Rng;
use tracing::{debug, trace};

use schedsim_config::{InclusiveRange, SimulatorConfig};
use schedsim_core::{Context, SimTime, SimulationError, Step, Task};

use crate::sink::{MetricsSink, ProcessReport};

/// Per-process constants taken from the run configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessParams {
    pub quantum: u32,
    pub instruction_time: SimTime,
    pub allocation_delay: SimTime,
    pub io_wait: SimTime,
    pub preemption_die: u32,
    pub memory_range: InclusiveRange,
}

impl ProcessParams {
    pub fn from_config(config: &SimulatorConfig) -> Self {
        Self {
            quantum: config.quantum,
            instruction_time: config.instruction_time(),
            allocation_delay: config.allocation_delay,
            io_wait: config.io_wait,
            preemption_die: config.preemption_die,
            memory_range: config.memory_range,
        }
    }
}

impl Default for ProcessParams {
    fn default() -> Self {
        Self::from_config(&SimulatorConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProcessState {
    Arriving,
    AwaitingMemory,
    MemorySetup,
    Dispatching,
    /// Holding the processor with `slice_left` instructions still to execute.
    Running { slice_left: u32 },
    /// Sleeping through an I/O wait.
    Waiting,
    Ready,
    StayReady,
    Done,
}

/// What the process knows about itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessRecord {
    pub pid: u64,
    /// Signed: the last slice subtracts a full quantum and may overshoot.
    pub remaining_work: i64,
    /// Requirement drawn on the latest entry to memory acquisition.
    pub memory_required: u64,
    pub waiting_time: SimTime,
    /// Set once the process finishes.
    pub total_time: Option<SimTime>,
    pub restarts: u32,
    pub io_waits: u32,
    pub slices: u32,
}

pub struct ProcessTask {
    record: ProcessRecord,
    state: ProcessState,
    params: ProcessParams,
    held_memory: Option<u64>,
    start_time: SimTime,
    wait_started: SimTime,
}

impl ProcessTask {
    pub fn new(pid: u64, work: NonZeroU64, params: ProcessParams) -> Self {
        Self {
            record: ProcessRecord {
                pid,
                remaining_work: i64::try_from(work.get()).unwrap_or(i64::MAX),
                memory_required: 0,
                waiting_time: 0.0,
                total_time: None,
                restarts: 0,
                io_waits: 0,
                slices: 0,
            },
            state: ProcessState::Arriving,
            params,
            held_memory: None,
            start_time: 0.0,
            wait_started: 0.0,
        }
    }

    pub fn record(&self) -> &ProcessRecord {
        &self.record
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// Closes the current slice and picks the next state.
    fn finish_slice<S>(&mut self, cx: &mut Context<'_, S>) -> Result<Option<Step>, SimulationError> {
        let now = cx.now();
        self.record.remaining_work -= i64::from(self.params.quantum);
        self.record.slices += 1;
        cx.release_processor()?;

        if self.record.remaining_work <= 0 {
            self.record.total_time = Some(now - self.start_time);
            self.state = ProcessState::Done;
            return Ok(None);
        }

        let roll = cx.rng().random_range(1..=self.params.preemption_die);
        trace!(pid = self.record.pid, roll, remaining = self.record.remaining_work, "slice finished");
        match roll {
            1 => {
                self.wait_started = now;
                self.record.io_waits += 1;
                self.state = ProcessState::Waiting;
                Ok(Some(Step::Sleep(self.params.io_wait)))
            }
            2 => {
                self.state = ProcessState::Ready;
                Ok(None)
            }
            _ => {
                self.state = ProcessState::StayReady;
                Ok(None)
            }
        }
    }

    fn report(&self, completed_at: SimTime) -> ProcessReport {
        ProcessReport {
            pid: self.record.pid,
            total_time: self.record.total_time.unwrap_or_default(),
            waiting_time: self.record.waiting_time,
            restarts: self.record.restarts,
            io_waits: self.record.io_waits,
            slices: self.record.slices,
            completed_at,
        }
    }
}

impl<S: MetricsSink> Task<S> for ProcessTask {
    fn resume(&mut self, cx: &mut Context<'_, S>) -> Result<Step, SimulationError> {
        loop {
            match self.state {
                ProcessState::Arriving => {
                    self.state = ProcessState::AwaitingMemory;
                }
                ProcessState::AwaitingMemory => {
                    let range = self.params.memory_range;
                    let amount = cx.rng().random_range(range.min..=range.max);
                    self.record.memory_required = amount;
                    self.state = ProcessState::MemorySetup;
                    return Ok(Step::AcquireMemory(amount));
                }
                ProcessState::MemorySetup => {
                    // Memory is held from here on; service time counts from the grant.
                    self.held_memory = Some(self.record.memory_required);
                    self.start_time = cx.now();
                    self.state = ProcessState::Dispatching;
                    return Ok(Step::Sleep(self.params.allocation_delay));
                }
                ProcessState::Dispatching => {
                    let slice = self
                        .record
                        .remaining_work
                        .clamp(0, i64::from(self.params.quantum));
                    self.state = ProcessState::Running {
                        slice_left: u32::try_from(slice).unwrap_or(self.params.quantum),
                    };
                    return Ok(Step::RequestProcessor);
                }
                ProcessState::Running { slice_left } if slice_left > 0 => {
                    self.state = ProcessState::Running {
                        slice_left: slice_left - 1,
                    };
                    return Ok(Step::Sleep(self.params.instruction_time));
                }
                ProcessState::Running { .. } => {
                    if let Some(step) = self.finish_slice(cx)? {
                        return Ok(step);
                    }
                }
                ProcessState::Waiting => {
                    self.record.waiting_time += cx.now() - self.wait_started;
                    self.state = ProcessState::Ready;
                }
                ProcessState::Ready => {
                    if let Some(amount) = self.held_memory.take() {
                        cx.release_memory(amount)?;
                    }
                    self.record.restarts += 1;
                    debug!(pid = self.record.pid, remaining = self.record.remaining_work, "process restarting");
                    self.state = ProcessState::AwaitingMemory;
                }
                ProcessState::StayReady => {
                    self.state = ProcessState::Dispatching;
                }
                ProcessState::Done => {
                    if let Some(amount) = self.held_memory.take() {
                        cx.release_memory(amount)?;
                    }
                    let report = self.report(cx.now());
                    debug!(
                        pid = report.pid,
                        total_time = report.total_time,
                        waiting_time = report.waiting_time,
                        "process done"
                    );
                    cx.state.record(&report);
                    return Ok(Step::Exit);
                }
            }
        }
    }
}

//! ## schedsim-core::engine
//! **Cooperative task engine**
//!
//! Tasks are explicit state machines. The engine resumes a task, the task
//! runs until its next suspension point and returns the [`Step`] it wants,
//! and the engine turns that step into exactly one pending event or one
//! resource queue entry. No task is ever resumed across a clock advance
//! without having suspended first.
//!
//! All per-run state (clock, queue, resources, RNG) lives in one `Engine`
//! value, so independent runs never share anything.

use std::fmt;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::{debug, trace, warn};

use crate::error::{BlockedOn, SimulationError};
use crate::events::EventQueue;
use crate::resources::{Admission, MemoryPool, PoolStats, Processor, ProcessorStats};
use crate::time::{SimTime, VirtualClock};

/// Identity of a task within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub usize);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// What a task asks for when it suspends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    /// Resume after `delay` time units. Zero resumes at the current time,
    /// after everything already due now.
    Sleep(SimTime),
    /// Resume once this task is the processor's sole holder.
    RequestProcessor,
    /// Resume once `amount` units of memory have been taken from the pool.
    AcquireMemory(u64),
    /// The task is finished and is dropped.
    Exit,
}

/// A cooperative unit of work driven by the engine.
///
/// `S` is run-wide state shared by all tasks, such as a metrics sink.
pub trait Task<S> {
    fn resume(&mut self, cx: &mut Context<'_, S>) -> Result<Step, SimulationError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Status {
    Scheduled,
    Running,
    Blocked(BlockedOn),
    Done,
}

struct Slot<S> {
    task: Option<Box<dyn Task<S>>>,
    status: Status,
}

/// Everything a resumed task may touch, split from the task table entry that
/// is currently checked out.
struct Kernel<S> {
    clock: VirtualClock,
    queue: EventQueue,
    slots: Vec<Slot<S>>,
    processor: Processor,
    memory: MemoryPool,
    rng: SmallRng,
}

impl<S> Kernel<S> {
    /// Registers the single pending resumption of `task`.
    fn wake_after(&mut self, task: TaskId, delay: SimTime) -> Result<(), SimulationError> {
        let now = self.clock.now();
        if delay.is_nan() || delay < 0.0 {
            return Err(SimulationError::NegativeDelay {
                clock: now,
                task,
                delay,
            });
        }
        let slot = self
            .slots
            .get_mut(task.0)
            .ok_or(SimulationError::UnknownTask { clock: now, task })?;
        if slot.status == Status::Scheduled {
            return Err(SimulationError::AlreadyScheduled { clock: now, task });
        }
        slot.status = Status::Scheduled;
        self.queue.push(now + delay, task);
        Ok(())
    }

    fn block(&mut self, task: TaskId, on: BlockedOn) {
        if let Some(slot) = self.slots.get_mut(task.0) {
            slot.status = Status::Blocked(on);
        }
    }

    fn spawn(&mut self, task: Box<dyn Task<S>>) -> Result<TaskId, SimulationError> {
        let id = TaskId(self.slots.len());
        self.slots.push(Slot {
            task: Some(task),
            status: Status::Running,
        });
        self.wake_after(id, 0.0)?;
        debug!(task = %id, at = self.clock.now(), "task spawned");
        Ok(id)
    }

    fn release_processor(&mut self, task: TaskId) -> Result<(), SimulationError> {
        let now = self.clock.now();
        if let Some(next) = self.processor.release(task, now)? {
            self.wake_after(next, 0.0)?;
        }
        Ok(())
    }

    fn release_memory(&mut self, task: TaskId, amount: u64) -> Result<(), SimulationError> {
        let now = self.clock.now();
        for granted in self.memory.release(task, amount, now)? {
            self.wake_after(granted, 0.0)?;
        }
        Ok(())
    }

    /// Turns the step a task yielded into its pending event or queue entry.
    fn settle(&mut self, task: TaskId, step: Step) -> Result<(), SimulationError> {
        let now = self.clock.now();
        match step {
            Step::Sleep(delay) => self.wake_after(task, delay),
            Step::RequestProcessor => match self.processor.request(task, now)? {
                Admission::Granted => self.wake_after(task, 0.0),
                Admission::Queued => {
                    self.block(task, BlockedOn::Processor);
                    Ok(())
                }
            },
            Step::AcquireMemory(amount) => match self.memory.acquire(task, amount, now)? {
                Admission::Granted => self.wake_after(task, 0.0),
                Admission::Queued => {
                    self.block(task, BlockedOn::Memory { amount });
                    Ok(())
                }
            },
            Step::Exit => {
                if let Some(slot) = self.slots.get_mut(task.0) {
                    slot.status = Status::Done;
                    slot.task = None;
                }
                trace!(%task, at = now, "task exited");
                Ok(())
            }
        }
    }

    fn blocked(&self) -> Vec<(TaskId, BlockedOn)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| match &slot.status {
                Status::Blocked(on) => Some((TaskId(id), *on)),
                _ => None,
            })
            .collect()
    }
}

/// The handle a task receives while it is being resumed.
pub struct Context<'a, S> {
    id: TaskId,
    kernel: &'a mut Kernel<S>,
    /// Run-wide shared state.
    pub state: &'a mut S,
}

impl<'a, S> Context<'a, S> {
    /// Id of the task being resumed.
    pub fn task_id(&self) -> TaskId {
        self.id
    }

    pub fn now(&self) -> SimTime {
        self.kernel.clock.now()
    }

    /// The run's seeded random source.
    pub fn rng(&mut self) -> &mut SmallRng {
        &mut self.kernel.rng
    }

    /// Starts a new task at the current time.
    pub fn spawn(&mut self, task: Box<dyn Task<S>>) -> Result<TaskId, SimulationError> {
        self.kernel.spawn(task)
    }

    /// Releases the processor held by the current task.
    pub fn release_processor(&mut self) -> Result<(), SimulationError> {
        self.kernel.release_processor(self.id)
    }

    /// Returns `amount` units to the memory pool on behalf of the current task.
    pub fn release_memory(&mut self, amount: u64) -> Result<(), SimulationError> {
        self.kernel.release_memory(self.id, amount)
    }

    pub fn memory_level(&self) -> u64 {
        self.kernel.memory.level()
    }

    pub fn memory_capacity(&self) -> u64 {
        self.kernel.memory.capacity()
    }

    pub fn processor_holder(&self) -> Option<TaskId> {
        self.kernel.processor.holder()
    }
}

/// Totals of a drained run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunStats {
    pub final_time: SimTime,
    pub resumptions: u64,
    pub tasks_spawned: usize,
    pub memory: PoolStats,
    pub processor: ProcessorStats,
}

/// Clock, event queue and shared resources of one run.
pub struct Engine<S> {
    kernel: Kernel<S>,
    max_resumptions: u64,
    resumptions: u64,
}

impl<S> Engine<S> {
    /// Creates an engine with a full memory pool of `memory_capacity` units
    /// and a random source seeded with `seed`.
    pub fn new(memory_capacity: u64, seed: u64) -> Result<Self, SimulationError> {
        if memory_capacity == 0 {
            return Err(SimulationError::Config(
                "memory capacity must be greater than zero".into(),
            ));
        }
        Ok(Self {
            kernel: Kernel {
                clock: VirtualClock::new(),
                queue: EventQueue::new(),
                slots: Vec::new(),
                processor: Processor::new(),
                memory: MemoryPool::new(memory_capacity),
                rng: SmallRng::seed_from_u64(seed),
            },
            max_resumptions: u64::MAX,
            resumptions: 0,
        })
    }

    /// Caps the number of resumptions before a run is declared stuck.
    pub fn with_step_limit(mut self, max_resumptions: u64) -> Self {
        self.max_resumptions = max_resumptions;
        self
    }

    /// Adds a task that first runs at the current time.
    pub fn spawn(&mut self, task: Box<dyn Task<S>>) -> Result<TaskId, SimulationError> {
        self.kernel.spawn(task)
    }

    /// Schedules a resumption of `task` `delay` units from now.
    pub fn schedule_after(&mut self, task: TaskId, delay: SimTime) -> Result<(), SimulationError> {
        self.kernel.wake_after(task, delay)
    }

    pub fn now(&self) -> SimTime {
        self.kernel.clock.now()
    }

    pub fn memory(&self) -> &MemoryPool {
        &self.kernel.memory
    }

    pub fn processor(&self) -> &Processor {
        &self.kernel.processor
    }

    /// Resumes due tasks in time order until the queue is empty.
    ///
    /// A queue that empties while tasks are still blocked is reported as
    /// [`SimulationError::Stalled`].
    pub fn run(&mut self, state: &mut S) -> Result<RunStats, SimulationError> {
        while let Some(event) = self.kernel.queue.pop() {
            self.resumptions += 1;
            if self.resumptions > self.max_resumptions {
                warn!(
                    clock = self.kernel.clock.now(),
                    limit = self.max_resumptions,
                    "run exceeded its resumption budget"
                );
                return Err(SimulationError::StepLimitExceeded {
                    clock: self.kernel.clock.now(),
                    limit: self.max_resumptions,
                });
            }
            self.kernel.clock.advance_to(event.due)?;
            self.resume(event.task, state)?;
        }

        let blocked = self.kernel.blocked();
        if !blocked.is_empty() {
            warn!(
                clock = self.kernel.clock.now(),
                blocked = blocked.len(),
                memory_level = self.kernel.memory.level(),
                "event queue drained with blocked tasks"
            );
            return Err(SimulationError::Stalled {
                clock: self.kernel.clock.now(),
                blocked,
            });
        }

        debug!(
            clock = self.kernel.clock.now(),
            resumptions = self.resumptions,
            "event queue drained"
        );
        Ok(RunStats {
            final_time: self.kernel.clock.now(),
            resumptions: self.resumptions,
            tasks_spawned: self.kernel.slots.len(),
            memory: self.kernel.memory.stats().clone(),
            processor: self.kernel.processor.stats().clone(),
        })
    }

    fn resume(&mut self, id: TaskId, state: &mut S) -> Result<(), SimulationError> {
        let now = self.kernel.clock.now();
        let mut task = self
            .kernel
            .slots
            .get_mut(id.0)
            .and_then(|slot| {
                slot.status = Status::Running;
                slot.task.take()
            })
            .ok_or(SimulationError::UnknownTask { clock: now, task: id })?;

        let step = {
            let mut cx = Context {
                id,
                kernel: &mut self.kernel,
                state,
            };
            task.resume(&mut cx)?
        };
        trace!(task = %id, at = now, ?step, "task suspended");

        if step != Step::Exit {
            self.kernel.slots[id.0].task = Some(task);
        }
        self.kernel.settle(id, step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    /// Records (time, label) pairs into the shared state.
    type Trace = Vec<(SimTime, String)>;

    struct Sleeper {
        label: &'static str,
        delays: Vec<SimTime>,
    }

    impl Task<Trace> for Sleeper {
        fn resume(&mut self, cx: &mut Context<'_, Trace>) -> Result<Step, SimulationError> {
            let now = cx.now();
            cx.state.push((now, self.label.to_string()));
            Ok(match self.delays.pop() {
                Some(delay) => Step::Sleep(delay),
                None => Step::Exit,
            })
        }
    }

    /// Takes the processor for `hold` units, then releases it.
    struct CpuUser {
        label: &'static str,
        hold: SimTime,
        phase: u8,
    }

    impl Task<Trace> for CpuUser {
        fn resume(&mut self, cx: &mut Context<'_, Trace>) -> Result<Step, SimulationError> {
            self.phase += 1;
            match self.phase {
                1 => Ok(Step::RequestProcessor),
                2 => {
                    assert_eq!(cx.processor_holder(), Some(cx.task_id()));
                    let now = cx.now();
                    cx.state.push((now, format!("{} got cpu", self.label)));
                    Ok(Step::Sleep(self.hold))
                }
                _ => {
                    cx.release_processor()?;
                    Ok(Step::Exit)
                }
            }
        }
    }

    /// Acquires memory, holds it, releases it.
    struct MemUser {
        label: &'static str,
        amount: u64,
        hold: SimTime,
        phase: u8,
    }

    impl Task<Trace> for MemUser {
        fn resume(&mut self, cx: &mut Context<'_, Trace>) -> Result<Step, SimulationError> {
            self.phase += 1;
            match self.phase {
                1 => Ok(Step::AcquireMemory(self.amount)),
                2 => {
                    let now = cx.now();
                    cx.state.push((now, format!("{} got {}", self.label, self.amount)));
                    Ok(Step::Sleep(self.hold))
                }
                _ => {
                    cx.release_memory(self.amount)?;
                    Ok(Step::Exit)
                }
            }
        }
    }

    fn labels(trace: &Trace) -> Vec<&str> {
        trace.iter().map(|(_, label)| label.as_str()).collect()
    }

    #[test]
    fn advances_clock_to_each_event() {
        let mut engine = Engine::new(10, 1).unwrap();
        let mut trace = Trace::new();
        engine
            .spawn(Box::new(Sleeper {
                label: "a",
                delays: vec![2.5, 1.0],
            }))
            .unwrap();
        let stats = engine.run(&mut trace).unwrap();
        let times: Vec<_> = trace.iter().map(|(t, _)| *t).collect();
        assert_eq!(times, vec![0.0, 1.0, 3.5]);
        assert_eq!(stats.final_time, 3.5);
        assert_eq!(stats.resumptions, 3);
    }

    #[test]
    fn equal_times_resume_in_scheduling_order() {
        let mut engine = Engine::new(10, 1).unwrap();
        let mut trace = Trace::new();
        for label in ["a", "b", "c"] {
            engine
                .spawn(Box::new(Sleeper {
                    label,
                    delays: vec![1.0],
                }))
                .unwrap();
        }
        engine.run(&mut trace).unwrap();
        assert_eq!(labels(&trace), vec!["a", "b", "c", "a", "b", "c"]);
    }

    #[test]
    fn zero_delay_resolves_at_current_time() {
        let mut engine = Engine::new(10, 1).unwrap();
        let mut trace = Trace::new();
        engine
            .spawn(Box::new(Sleeper {
                label: "z",
                delays: vec![0.0, 0.0],
            }))
            .unwrap();
        engine.run(&mut trace).unwrap();
        assert!(trace.iter().all(|(t, _)| *t == 0.0));
        assert_eq!(trace.len(), 3);
    }

    #[test]
    fn negative_delay_fails_fast() {
        let mut engine = Engine::new(10, 1).unwrap();
        let mut trace = Trace::new();
        engine
            .spawn(Box::new(Sleeper {
                label: "neg",
                delays: vec![-1.0],
            }))
            .unwrap();
        let err = engine.run(&mut trace).unwrap_err();
        assert!(matches!(
            err,
            SimulationError::NegativeDelay { task: TaskId(0), delay, .. } if delay == -1.0
        ));
    }

    #[test]
    fn processor_is_exclusive_and_fifo() {
        let mut engine = Engine::new(10, 1).unwrap();
        let mut trace = Trace::new();
        for label in ["first", "second", "third"] {
            engine
                .spawn(Box::new(CpuUser {
                    label,
                    hold: 2.0,
                    phase: 0,
                }))
                .unwrap();
        }
        let stats = engine.run(&mut trace).unwrap();
        assert_eq!(
            trace,
            vec![
                (0.0, "first got cpu".to_string()),
                (2.0, "second got cpu".to_string()),
                (4.0, "third got cpu".to_string()),
            ]
        );
        assert_eq!(stats.processor.grants(), 3);
        assert_eq!(stats.processor.releases(), 3);
        assert!(engine.processor().is_free());
    }

    #[test]
    fn memory_waiter_resumes_when_headroom_returns() {
        let mut engine = Engine::new(100, 1).unwrap();
        let mut trace = Trace::new();
        engine
            .spawn(Box::new(MemUser {
                label: "big",
                amount: 97,
                hold: 4.0,
                phase: 0,
            }))
            .unwrap();
        engine
            .spawn(Box::new(MemUser {
                label: "small",
                amount: 5,
                hold: 1.0,
                phase: 0,
            }))
            .unwrap();
        let stats = engine.run(&mut trace).unwrap();
        assert_eq!(
            trace,
            vec![(0.0, "big got 97".to_string()), (4.0, "small got 5".to_string())]
        );
        assert!(stats.memory.is_balanced());
        assert_eq!(stats.memory.min_level(), Some(3));
        assert_eq!(engine.memory().level(), 100);
    }

    #[traced_test]
    #[test]
    fn stall_is_reported_with_blocked_tasks() {
        let mut engine = Engine::new(10, 1).unwrap();
        let mut trace = Trace::new();
        // Never releases what it takes.
        struct Hoarder;
        impl Task<Trace> for Hoarder {
            fn resume(&mut self, cx: &mut Context<'_, Trace>) -> Result<Step, SimulationError> {
                Ok(if cx.memory_level() == cx.memory_capacity() {
                    Step::AcquireMemory(8)
                } else {
                    Step::Exit
                })
            }
        }
        engine.spawn(Box::new(Hoarder)).unwrap();
        engine
            .spawn(Box::new(MemUser {
                label: "starved",
                amount: 5,
                hold: 1.0,
                phase: 0,
            }))
            .unwrap();
        let err = engine.run(&mut trace).unwrap_err();
        match err {
            SimulationError::Stalled { blocked, .. } => {
                assert_eq!(blocked, vec![(TaskId(1), BlockedOn::Memory { amount: 5 })]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(logs_contain("event queue drained with blocked tasks"));
    }

    #[test]
    fn step_limit_stops_runaway_runs() {
        struct Forever;
        impl Task<Trace> for Forever {
            fn resume(&mut self, _cx: &mut Context<'_, Trace>) -> Result<Step, SimulationError> {
                Ok(Step::Sleep(1.0))
            }
        }
        let mut engine = Engine::new(10, 1).unwrap().with_step_limit(50);
        engine.spawn(Box::new(Forever)).unwrap();
        let err = engine.run(&mut Trace::new()).unwrap_err();
        assert!(matches!(err, SimulationError::StepLimitExceeded { limit: 50, .. }));
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(
            Engine::<Trace>::new(0, 1),
            Err(SimulationError::Config(_))
        ));
    }
}

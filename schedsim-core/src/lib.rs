//! # schedsim-core
//!
//! Discrete-event foundation for the scheduler model: a virtual clock, a
//! FIFO-tie-broken event queue, the two shared resources (an exclusive
//! processor and a counting memory pool) and the cooperative task engine that
//! interleaves many logical processes on one timeline.
//!
//! ### Guarantees:
//! - Virtual time never moves backwards
//! - Events due at the same instant resume in scheduling order
//! - Resource queues are strictly FIFO, with head-of-line blocking on memory
//! - Invariant breaches abort the run with the clock, resource and task involved
//!
//! ### Key Submodules:
//! - `time`: `VirtualClock` owned by the engine
//! - `events`: `EventQueue` of pending resumptions
//! - `resources`: `Processor`, `MemoryPool` and their ledgers
//! - `engine`: `Engine`, `Task`, `Context` and the `Step` a task yields

pub mod engine;
pub mod error;
pub mod events;
pub mod resources;
pub mod time;

pub mod prelude {
    pub use crate::engine::*;
    pub use crate::error::*;
    pub use crate::events::*;
    pub use crate::resources::*;
    pub use crate::time::*;
}

pub use engine::{Context, Engine, RunStats, Step, Task, TaskId};
pub use error::SimulationError;
pub use time::{SimTime, VirtualClock};

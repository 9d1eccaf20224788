//! ## schedsim-core::resources
//! **Shared resources contended for by process tasks**
//!
//! ### Key Submodules:
//! - `processor`: exclusive resource, one holder, FIFO admission
//! - `memory`: counting resource with a fixed capacity, FIFO admission with
//!   head-of-line blocking
//! - `stats`: ledgers used to check conservation and bounds after a run
//!
//! Both resources are plain state machines. They never wake tasks themselves;
//! they report which requesters were granted and the engine schedules their
//! resumption, so a grant and its bookkeeping happen in one uninterrupted step.

pub mod memory;
pub mod processor;
pub mod stats;

pub use memory::MemoryPool;
pub use processor::Processor;
pub use stats::{PoolStats, ProcessorStats};

/// Outcome of a request against a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The requester holds the resource now.
    Granted,
    /// The requester joined the back of the wait queue.
    Queued,
}

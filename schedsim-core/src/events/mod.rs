//! ## schedsim-core::events
//! **Pending resumptions ordered by due time**
//!
//! Each entry names the task to resume and when. Equal due times resolve in
//! the order they were scheduled.

pub mod queue;

pub use queue::{EventQueue, ScheduledEvent};

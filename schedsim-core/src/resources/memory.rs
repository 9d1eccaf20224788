//! ## schedsim-core::resources::memory
//! **Counting resource (the memory pool)**
//!
//! A bounded, fungible quantity. `acquire(n)` is granted only when the level
//! covers `n` and nobody is queued ahead; otherwise the request waits in FIFO
//! order. A large request at the head blocks smaller ones behind it.
//!
//! Invariant: `0 <= level <= capacity` after every operation.

use std::collections::VecDeque;

use tracing::trace;

use super::stats::PoolStats;
use super::Admission;
use crate::engine::TaskId;
use crate::error::SimulationError;
use crate::time::SimTime;

#[derive(Debug)]
pub struct MemoryPool {
    capacity: u64,
    level: u64,
    waiting: VecDeque<(TaskId, u64)>,
    stats: PoolStats,
}

impl MemoryPool {
    /// Creates a full pool.
    ///
    /// # Panics
    /// If `capacity` is zero.
    pub fn new(capacity: u64) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");

        Self {
            capacity,
            level: capacity,
            waiting: VecDeque::new(),
            stats: PoolStats::default(),
        }
    }

    /// Requests `amount` units for `task`.
    ///
    /// An amount of zero or above capacity could never be satisfied and is
    /// rejected outright.
    pub fn acquire(
        &mut self,
        task: TaskId,
        amount: u64,
        now: SimTime,
    ) -> Result<Admission, SimulationError> {
        if amount == 0 || amount > self.capacity {
            return Err(SimulationError::InvalidAmount {
                clock: now,
                task,
                amount,
                capacity: self.capacity,
            });
        }

        if self.waiting.is_empty() && self.level >= amount {
            self.level -= amount;
            self.stats.record_acquire(amount, self.level);
            trace!(%task, amount, level = self.level, "memory granted");
            Ok(Admission::Granted)
        } else {
            self.waiting.push_back((task, amount));
            self.stats.record_queued(self.waiting.len());
            trace!(%task, amount, level = self.level, "memory request queued");
            Ok(Admission::Queued)
        }
    }

    /// Returns `amount` units and admits queued requesters from the head for
    /// as long as the head fits. Returns the tasks granted by this release.
    ///
    /// Releases are not matched against outstanding grants; overflowing the
    /// capacity is the only thing checked.
    pub fn release(
        &mut self,
        task: TaskId,
        amount: u64,
        now: SimTime,
    ) -> Result<Vec<TaskId>, SimulationError> {
        let level = self
            .level
            .checked_add(amount)
            .filter(|level| *level <= self.capacity)
            .ok_or_else(|| SimulationError::CapacityExceeded {
                clock: now,
                task,
                amount,
                level: self.level,
                capacity: self.capacity,
            })?;
        self.level = level;
        self.stats.record_release(amount, self.level);
        trace!(%task, amount, level = self.level, "memory released");

        let mut granted = Vec::new();
        while let Some(&(next, wanted)) = self.waiting.front() {
            if self.level < wanted {
                break;
            }
            self.waiting.pop_front();
            self.level -= wanted;
            self.stats.record_acquire(wanted, self.level);
            trace!(task = %next, amount = wanted, level = self.level, "queued memory request granted");
            granted.push(next);
        }
        Ok(granted)
    }

    pub fn level(&self) -> u64 {
        self.level
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Blocked requesters and their amounts, in admission order.
    pub fn waiting(&self) -> impl Iterator<Item = (TaskId, u64)> + '_ {
        self.waiting.iter().copied()
    }

    pub fn queue_len(&self) -> usize {
        self.waiting.len()
    }

    pub fn stats(&self) -> &PoolStats {
        &self.stats
    }
}

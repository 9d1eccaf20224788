//! Exclusive resource (the processor).

use std::collections::VecDeque;

use tracing::trace;

use super::stats::ProcessorStats;
use super::Admission;
use crate::engine::TaskId;
use crate::error::SimulationError;
use crate::time::SimTime;

/// Capacity-one resource with a FIFO queue of blocked requesters.
#[derive(Debug, Default)]
pub struct Processor {
    holder: Option<TaskId>,
    waiting: VecDeque<TaskId>,
    stats: ProcessorStats,
}

impl Processor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants the processor to `task` if it is free and nobody is queued,
    /// otherwise queues `task` behind earlier requesters.
    pub fn request(&mut self, task: TaskId, now: SimTime) -> Result<Admission, SimulationError> {
        if self.holder == Some(task) || self.waiting.contains(&task) {
            return Err(SimulationError::ProcessorBusy { clock: now, task });
        }

        if self.holder.is_none() && self.waiting.is_empty() {
            self.holder = Some(task);
            self.stats.record_grant();
            trace!(%task, "processor granted");
            Ok(Admission::Granted)
        } else {
            self.waiting.push_back(task);
            self.stats.record_queued(self.waiting.len());
            trace!(%task, queued = self.waiting.len(), "processor busy");
            Ok(Admission::Queued)
        }
    }

    /// Releases the processor held by `task` and hands it to the head of the
    /// queue. Returns the new holder, if any.
    pub fn release(&mut self, task: TaskId, now: SimTime) -> Result<Option<TaskId>, SimulationError> {
        if self.holder != Some(task) {
            return Err(SimulationError::ProcessorNotHeld {
                clock: now,
                task,
                holder: self.holder,
            });
        }
        self.stats.record_release();

        self.holder = self.waiting.pop_front();
        if let Some(next) = self.holder {
            self.stats.record_grant();
            trace!(from = %task, to = %next, "processor handed over");
        }
        Ok(self.holder)
    }

    pub fn holder(&self) -> Option<TaskId> {
        self.holder
    }

    pub fn is_free(&self) -> bool {
        self.holder.is_none()
    }

    /// Blocked requesters in admission order.
    pub fn waiting(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.waiting.iter().copied()
    }

    pub fn queue_len(&self) -> usize {
        self.waiting.len()
    }

    pub fn stats(&self) -> &ProcessorStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn grants_when_free() {
        let mut cpu = Processor::new();
        assert_eq!(cpu.request(TaskId(1), 0.0).unwrap(), Admission::Granted);
        assert_eq!(cpu.holder(), Some(TaskId(1)));
        assert_eq!(cpu.release(TaskId(1), 1.0).unwrap(), None);
        assert!(cpu.is_free());
    }

    #[test]
    fn release_hands_to_head_of_queue() {
        let mut cpu = Processor::new();
        cpu.request(TaskId(1), 0.0).unwrap();
        assert_eq!(cpu.request(TaskId(2), 0.0).unwrap(), Admission::Queued);
        assert_eq!(cpu.request(TaskId(3), 0.0).unwrap(), Admission::Queued);
        assert_eq!(cpu.release(TaskId(1), 1.0).unwrap(), Some(TaskId(2)));
        assert_eq!(cpu.holder(), Some(TaskId(2)));
        assert_eq!(cpu.waiting().collect::<Vec<_>>(), vec![TaskId(3)]);
        assert_eq!(cpu.stats().max_queue_len(), 2);
    }

    #[test]
    fn new_request_cannot_jump_the_queue() {
        let mut cpu = Processor::new();
        cpu.request(TaskId(1), 0.0).unwrap();
        cpu.request(TaskId(2), 0.0).unwrap();
        // Holder releases and the queued task takes over immediately, so a
        // fresh requester queues even though it arrived at the same instant.
        cpu.release(TaskId(1), 1.0).unwrap();
        assert_eq!(cpu.request(TaskId(3), 1.0).unwrap(), Admission::Queued);
    }

    #[test]
    fn release_by_non_holder_is_fatal() {
        let mut cpu = Processor::new();
        cpu.request(TaskId(1), 0.0).unwrap();
        let err = cpu.release(TaskId(2), 4.0).unwrap_err();
        assert!(matches!(
            err,
            SimulationError::ProcessorNotHeld { clock, task: TaskId(2), holder: Some(TaskId(1)) } if clock == 4.0
        ));
    }

    #[test]
    fn double_request_is_fatal() {
        let mut cpu = Processor::new();
        cpu.request(TaskId(1), 0.0).unwrap();
        assert!(matches!(
            cpu.request(TaskId(1), 0.0),
            Err(SimulationError::ProcessorBusy { task: TaskId(1), .. })
        ));
    }

    proptest! {
        // Every blocked requester is served in the order it asked.
        #[test]
        fn grants_follow_request_order(n in 1usize..40) {
            let mut cpu = Processor::new();
            for id in 0..n {
                cpu.request(TaskId(id), 0.0).unwrap();
            }
            let mut served = vec![TaskId(0)];
            let mut current = TaskId(0);
            while let Some(next) = cpu.release(current, 0.0).unwrap() {
                served.push(next);
                current = next;
            }
            prop_assert_eq!(served, (0..n).map(TaskId).collect::<Vec<_>>());
            prop_assert_eq!(cpu.stats().grants(), n as u64);
            prop_assert_eq!(cpu.stats().releases(), n as u64);
        }
    }
}

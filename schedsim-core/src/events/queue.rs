//! Binary-heap event queue with a FIFO tie-break.
//!
//! The heap is a max-heap, so the ordering on `ScheduledEvent` is reversed:
//! the earliest due time wins, and among equal due times the lowest sequence
//! number (the earliest scheduled) wins.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::engine::TaskId;
use crate::time::SimTime;

/// A (due-time, resumption-target) pair.
#[derive(Debug, Clone, Copy)]
pub struct ScheduledEvent {
    pub due: SimTime,
    pub seq: u64,
    pub task: TaskId,
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .total_cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScheduledEvent {}

#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<ScheduledEvent>,
    next_seq: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resumption of `task` at `due`.
    pub fn push(&mut self, due: SimTime, task: TaskId) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(ScheduledEvent { due, seq, task });
    }

    /// Removes the earliest-due event.
    pub fn pop(&mut self) -> Option<ScheduledEvent> {
        self.heap.pop()
    }

    pub fn peek_due(&self) -> Option<SimTime> {
        self.heap.peek().map(|event| event.due)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

//! ## schedsim-core::resources::stats
//! **Resource ledgers**
//!
//! Counters kept by each resource so a finished run can be checked for
//! conservation (everything acquired was released) and bounds.

/// Ledger of the memory pool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    acquisitions: u64,
    releases: u64,
    acquired_total: u64,
    released_total: u64,
    min_level: Option<u64>,
    max_queue_len: usize,
}

impl PoolStats {
    #[inline]
    pub(crate) fn record_acquire(&mut self, amount: u64, level_after: u64) {
        self.acquisitions += 1;
        self.acquired_total += amount;
        self.observe_level(level_after);
    }

    #[inline]
    pub(crate) fn record_release(&mut self, amount: u64, level_after: u64) {
        self.releases += 1;
        self.released_total += amount;
        self.observe_level(level_after);
    }

    #[inline]
    pub(crate) fn record_queued(&mut self, queue_len: usize) {
        self.max_queue_len = self.max_queue_len.max(queue_len);
    }

    fn observe_level(&mut self, level: u64) {
        self.min_level = Some(self.min_level.map_or(level, |min| min.min(level)));
    }

    /// Number of granted `acquire` calls.
    pub fn acquisitions(&self) -> u64 {
        self.acquisitions
    }

    /// Number of `release` calls.
    pub fn releases(&self) -> u64 {
        self.releases
    }

    /// Sum of all granted amounts.
    pub fn acquired_total(&self) -> u64 {
        self.acquired_total
    }

    /// Sum of all released amounts.
    pub fn released_total(&self) -> u64 {
        self.released_total
    }

    /// Lowest level seen after any grant or release.
    pub fn min_level(&self) -> Option<u64> {
        self.min_level
    }

    pub fn max_queue_len(&self) -> usize {
        self.max_queue_len
    }

    /// True when every acquired unit has been returned.
    pub fn is_balanced(&self) -> bool {
        self.acquired_total == self.released_total
    }
}

/// Ledger of the processor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessorStats {
    grants: u64,
    releases: u64,
    max_queue_len: usize,
}

impl ProcessorStats {
    #[inline]
    pub(crate) fn record_grant(&mut self) {
        self.grants += 1;
    }

    #[inline]
    pub(crate) fn record_release(&mut self) {
        self.releases += 1;
    }

    #[inline]
    pub(crate) fn record_queued(&mut self, queue_len: usize) {
        self.max_queue_len = self.max_queue_len.max(queue_len);
    }

    pub fn grants(&self) -> u64 {
        self.grants
    }

    pub fn releases(&self) -> u64 {
        self.releases
    }

    pub fn max_queue_len(&self) -> usize {
        self.max_queue_len
    }
}

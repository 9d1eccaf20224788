//! BLAKE3 fingerprint of a run, used to check that a seed reproduces the
//! same run bit for bit.

use crate::sink::ProcessReport;

/// Hashes the ordered completion records together with the final clock.
///
/// Floats are hashed by bit pattern, so any drift in timing changes the digest.
pub fn state_digest(reports: &[ProcessReport], final_time: f64) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(reports.len() as u64).to_le_bytes());
    for report in reports {
        hasher.update(&report.pid.to_le_bytes());
        hasher.update(&report.total_time.to_bits().to_le_bytes());
        hasher.update(&report.waiting_time.to_bits().to_le_bytes());
        hasher.update(&report.restarts.to_le_bytes());
        hasher.update(&report.io_waits.to_le_bytes());
        hasher.update(&report.slices.to_le_bytes());
        hasher.update(&report.completed_at.to_bits().to_le_bytes());
    }
    hasher.update(&final_time.to_bits().to_le_bytes());
    hex::encode(hasher.finalize().as_bytes())
}

/// Compares a digest with an expected hex string, ignoring case.
pub fn matches(digest: &str, expected: &str) -> bool {
    digest.eq_ignore_ascii_case(expected.trim())
}

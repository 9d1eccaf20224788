//! Cross-field validation.
//!
//! The derive handles per-field ranges; the checks here need more than one
//! field at a time or reject values the derive lets through (infinities).

use std::borrow::Cow;

use validator::ValidationError;

use crate::simulator::{InclusiveRange, SimulatorConfig};
use crate::sweep::SweepConfig;
use crate::ConfigError;

fn error(code: &'static str, message: String) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Owned(message))
}

/// Validate that a value is a finite number.
pub fn validate_finite(value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(error("not_finite", format!("{value} is not a finite number")))
    }
}

/// Validate that a range is not empty.
pub fn validate_range_order(range: &InclusiveRange) -> Result<(), ValidationError> {
    if range.min <= range.max {
        Ok(())
    } else {
        Err(error(
            "empty_range",
            format!("min {} is greater than max {}", range.min, range.max),
        ))
    }
}

/// Validate that the largest memory request fits in the pool. A larger
/// request could never be granted and the run would stall.
pub fn validate_fits_capacity(range: &InclusiveRange, capacity: u64) -> Result<(), ValidationError> {
    if range.max <= capacity {
        Ok(())
    } else {
        Err(error(
            "exceeds_capacity",
            format!(
                "requests up to {} units but the pool only holds {}",
                range.max, capacity
            ),
        ))
    }
}

/// Validate that every mean interarrival time is finite and positive.
pub fn validate_intervals(intervals: &[f64]) -> Result<(), ValidationError> {
    match intervals.iter().find(|t| !(t.is_finite() && **t > 0.0)) {
        Some(bad) => Err(error(
            "invalid_interval",
            format!("interval {bad} must be finite and positive"),
        )),
        None => Ok(()),
    }
}

/// Validate that every process count is positive.
pub fn validate_process_counts(counts: &[usize]) -> Result<(), ValidationError> {
    if counts.contains(&0) {
        Err(error(
            "invalid_process_count",
            "process counts must be positive".into(),
        ))
    } else {
        Ok(())
    }
}

/// Checks a simulator configuration beyond its field ranges.
pub fn check_simulator(config: &SimulatorConfig) -> Result<(), ConfigError> {
    for (field, value) in [
        ("mean_interarrival", config.mean_interarrival),
        ("cpu_speed", config.cpu_speed),
        ("allocation_delay", config.allocation_delay),
        ("io_wait", config.io_wait),
    ] {
        validate_finite(value).map_err(|e| ConfigError::inconsistent(field, e))?;
    }
    validate_range_order(&config.work_range)
        .map_err(|e| ConfigError::inconsistent("work_range", e))?;
    validate_range_order(&config.memory_range)
        .map_err(|e| ConfigError::inconsistent("memory_range", e))?;
    validate_fits_capacity(&config.memory_range, config.memory_capacity)
        .map_err(|e| ConfigError::inconsistent("memory_range", e))?;
    Ok(())
}

/// Checks a sweep configuration beyond its field ranges.
pub fn check_sweep(config: &SweepConfig) -> Result<(), ConfigError> {
    validate_intervals(&config.intervals)
        .map_err(|e| ConfigError::inconsistent("intervals", e))?;
    validate_process_counts(&config.process_counts)
        .map_err(|e| ConfigError::inconsistent("process_counts", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_memory_range_above_capacity() {
        let range = InclusiveRange { min: 1, max: 10 };
        assert!(validate_fits_capacity(&range, 10).is_ok());
        let err = validate_fits_capacity(&range, 9).unwrap_err();
        assert_eq!(err.code, "exceeds_capacity");
    }

    #[test]
    fn rejects_empty_ranges() {
        assert!(validate_range_order(&InclusiveRange { min: 3, max: 3 }).is_ok());
        assert!(validate_range_order(&InclusiveRange { min: 4, max: 3 }).is_err());
    }

    #[test]
    fn rejects_bad_intervals() {
        assert!(validate_intervals(&[10.0, 5.0, 1.0]).is_ok());
        assert!(validate_intervals(&[10.0, 0.0]).is_err());
        assert!(validate_intervals(&[f64::INFINITY]).is_err());
        assert!(validate_intervals(&[f64::NAN]).is_err());
    }

    #[test]
    fn rejects_zero_process_count() {
        assert!(validate_process_counts(&[25, 50]).is_ok());
        assert!(validate_process_counts(&[25, 0]).is_err());
    }

    #[test]
    fn non_finite_interarrival_is_inconsistent() {
        let config = SimulatorConfig {
            mean_interarrival: f64::INFINITY,
            ..SimulatorConfig::default()
        };
        assert!(matches!(
            check_simulator(&config),
            Err(ConfigError::Inconsistent {
                field: "mean_interarrival",
                ..
            })
        ));
    }
}

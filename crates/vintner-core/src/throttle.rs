//! Cadence gate for expensive, non-critical background work.
//!
//! The gate admits a task at most once per `interval_weeks` absolute weeks.
//! It records the admission before the task runs, so a slow run cannot be
//! admitted twice.

/// Admits a task at most once per interval of absolute weeks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottleGate {
    /// Minimum distance between two admissions.
    interval_weeks: u64,
    /// Absolute week of the last admission, `None` before the first.
    last_run: Option<u64>,
}

impl ThrottleGate {
    /// Create a gate that has never admitted anything.
    pub const fn new(interval_weeks: u64) -> Self {
        Self {
            interval_weeks,
            last_run: None,
        }
    }

    /// Decide whether the task may run at `absolute_week`.
    ///
    /// Not idempotent: returning `true` records `absolute_week` as the new
    /// last run. A week earlier than the last run is rejected.
    pub const fn should_run(&mut self, absolute_week: u64) -> bool {
        let admit = match self.last_run {
            None => true,
            Some(last) => absolute_week.saturating_sub(last) >= self.interval_weeks,
        };
        if admit {
            self.last_run = Some(absolute_week);
        }
        admit
    }

    /// Absolute week of the last admission.
    pub const fn last_run(&self) -> Option<u64> {
        self.last_run
    }

    /// Configured interval.
    pub const fn interval_weeks(&self) -> u64 {
        self.interval_weeks
    }
}

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::domain::models::slot::Slot;
use crate::error::AppError;

/// A half-open `[start, end)` time window on a single court and date.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, AppError> {
        if start >= end {
            return Err(AppError::Validation(format!(
                "Window start {} must be before end {}",
                start.format("%H:%M"),
                end.format("%H:%M")
            )));
        }
        Ok(Self { start, end })
    }

    /// Half-open overlap: `[s1,e1)` and `[s2,e2)` conflict iff
    /// `s1 < e2 && s2 < e1`. Touching windows (`e1 == s2`) do not conflict.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

impl From<&Slot> for TimeWindow {
    fn from(slot: &Slot) -> Self {
        TimeWindow { start: slot.start_time, end: slot.end_time }
    }
}

/// Returns the first occupied window conflicting with `requested`, if any.
/// All windows must belong to the same court and date; the caller owns that.
pub fn find_conflict(requested: &TimeWindow, occupied: &[TimeWindow]) -> Option<TimeWindow> {
    occupied.iter().find(|w| requested.overlaps(w)).copied()
}

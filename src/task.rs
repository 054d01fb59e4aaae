//! Task data structure and the duration model.
//!
//! A task belongs to exactly one project and at most one parent task. Its
//! schedule is an inclusive date range; `task_duration` is derived from it and
//! kept in sync on every date write.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::fields::TaskState;

/// A schedulable work item on a construction project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: u64,
    pub title: String,
    pub project: u64,
    pub parent: Option<u64>,
    pub planned_date_begin: Option<NaiveDate>,
    pub date_deadline: Option<NaiveDate>,
    /// Inclusive day count, 0 while either date is missing.
    #[serde(default)]
    pub task_duration: i64,
    #[serde(default)]
    pub state: TaskState,
    #[serde(default)]
    pub time_spent_hours: f64,
    pub created_at_utc: i64,
    pub updated_at_utc: i64,
}

impl Task {
    pub fn new(id: u64, title: impl Into<String>, project: u64, now_utc: i64) -> Self {
        Task {
            id,
            title: title.into(),
            project,
            parent: None,
            planned_date_begin: None,
            date_deadline: None,
            task_duration: 0,
            state: TaskState::default(),
            time_spent_hours: 0.0,
            created_at_utc: now_utc,
            updated_at_utc: now_utc,
        }
    }

    /// Both dates are set, so the task can take part in propagation.
    pub fn is_schedulable(&self) -> bool {
        self.planned_date_begin.is_some() && self.date_deadline.is_some()
    }

    /// Set both dates and recompute the stored duration.
    pub fn set_dates(&mut self, start: Option<NaiveDate>, deadline: Option<NaiveDate>) {
        self.planned_date_begin = start;
        self.date_deadline = deadline;
        self.refresh_duration();
    }

    pub fn refresh_duration(&mut self) {
        self.task_duration = compute_duration(self.planned_date_begin, self.date_deadline);
    }
}

/// Inclusive number of days between `start` and `end`; 0 if either is missing.
pub fn compute_duration(start: Option<NaiveDate>, end: Option<NaiveDate>) -> i64 {
    match (start, end) {
        (Some(s), Some(e)) => (e - s).num_days() + 1,
        _ => 0,
    }
}

/// `date` moved by `days`, or `None` past either end of the calendar.
pub fn add_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    Duration::try_days(days).and_then(|by| date.checked_add_signed(by))
}

/// Like [`add_days`], failing with [`AppError::DateOutOfRange`].
pub fn offset_date(date: NaiveDate, days: i64) -> Result<NaiveDate> {
    add_days(date, days).ok_or(AppError::DateOutOfRange { date, days })
}

/// End date for a task starting on `start` that lasts `duration` days.
pub fn apply_duration(start: NaiveDate, duration: i64) -> Result<NaiveDate> {
    offset_date(start, duration.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[rstest]
    #[case(Some(d(2025, 3, 1)), Some(d(2025, 3, 1)), 1)]
    #[case(Some(d(2025, 3, 1)), Some(d(2025, 3, 10)), 10)]
    #[case(Some(d(2025, 2, 27)), Some(d(2025, 3, 2)), 4)]
    #[case(None, Some(d(2025, 3, 10)), 0)]
    #[case(Some(d(2025, 3, 1)), None, 0)]
    #[case(None, None, 0)]
    fn duration_is_inclusive(
        #[case] start: Option<NaiveDate>,
        #[case] end: Option<NaiveDate>,
        #[case] expected: i64,
    ) {
        assert_eq!(compute_duration(start, end), expected);
    }

    #[test]
    fn end_before_start_yields_negative_duration() {
        assert_eq!(compute_duration(Some(d(2025, 3, 10)), Some(d(2025, 3, 8))), -1);
    }

    #[rstest]
    #[case(1, d(2025, 5, 4))]
    #[case(5, d(2025, 5, 8))]
    #[case(30, d(2025, 6, 2))]
    fn apply_duration_keeps_start(#[case] duration: i64, #[case] expected_end: NaiveDate) {
        let start = d(2025, 5, 4);
        let end = apply_duration(start, duration).unwrap();
        assert_eq!(end, expected_end);
        assert_eq!(compute_duration(Some(start), Some(end)), duration);
    }

    #[rstest]
    #[case(100_000_000)]
    #[case(i64::MAX)]
    fn apply_duration_past_the_calendar_is_an_error(#[case] duration: i64) {
        let start = d(2025, 5, 4);
        assert!(matches!(
            apply_duration(start, duration),
            Err(AppError::DateOutOfRange { date, .. }) if date == start
        ));
    }

    #[rstest]
    #[case(d(2025, 5, 4), -3, Some(d(2025, 5, 1)))]
    #[case(d(2025, 12, 31), 1, Some(d(2026, 1, 1)))]
    #[case(NaiveDate::MAX, 1, None)]
    #[case(NaiveDate::MIN, -1, None)]
    #[case(d(2025, 5, 4), i64::MIN, None)]
    fn add_days_is_checked(#[case] date: NaiveDate, #[case] days: i64, #[case] expected: Option<NaiveDate>) {
        assert_eq!(add_days(date, days), expected);
    }

    #[test]
    fn set_dates_refreshes_duration() {
        let mut t = Task::new(1, "Excavation", 1, 0);
        assert!(!t.is_schedulable());
        t.set_dates(Some(d(2025, 1, 6)), Some(d(2025, 1, 17)));
        assert_eq!(t.task_duration, 12);
        assert!(t.is_schedulable());
    }
}

//! Time windowing for filtered analysis.
//!
//! Resolves a [`TimeFilter`] against a reference instant and decides whether
//! a parsed entry belongs to the resulting window.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};

use super::types::*;

impl TimeFilter {
    /// Resolve the filter into a window ending at `now`.
    ///
    /// `AllTime` is unbounded and yields `None`.
    pub fn resolve(self, now: NaiveDateTime) -> Option<TimeWindow> {
        let today = now.date();
        let start_day = match self {
            TimeFilter::AllTime => return None,
            TimeFilter::Today => today,
            TimeFilter::ThisWeek => week_start(today),
            TimeFilter::ThisMonth => today.with_day(1)?,
        };
        Some(TimeWindow::new(start_day.and_time(NaiveTime::MIN), now))
    }

    /// Human-readable label, e.g. "This week (since 16.10.2023)".
    pub fn describe(self, today: NaiveDate) -> String {
        match self {
            TimeFilter::AllTime => "All time".to_string(),
            TimeFilter::Today => format!("Today ({})", today.format("%d.%m.%Y")),
            TimeFilter::ThisWeek => {
                format!("This week (since {})", week_start(today).format("%d.%m.%Y"))
            }
            TimeFilter::ThisMonth => format!("This month ({})", today.format("%B %Y")),
        }
    }

    /// Whether an hour-of-day breakdown is meaningful for this filter
    pub fn shows_hourly(self) -> bool {
        matches!(self, TimeFilter::Today | TimeFilter::ThisWeek)
    }

    /// Number of days shown in the daily breakdown
    pub fn daily_days(self) -> usize {
        if self == TimeFilter::Today {
            1
        } else {
            7
        }
    }
}

/// Monday on or before `day`
pub fn week_start(day: NaiveDate) -> NaiveDate {
    day - Duration::days(day.weekday().num_days_from_monday() as i64)
}

/// Decide whether an entry with the given parsed timestamp is admitted.
///
/// An unbounded window admits everything, parsed or not. A bounded window
/// rejects entries whose timestamp could not be parsed, because their
/// recency cannot be verified.
pub fn admit(window: Option<&TimeWindow>, timestamp: Option<NaiveDateTime>) -> Result<(), Rejection> {
    let Some(window) = window else {
        return Ok(());
    };
    match timestamp {
        None => Err(Rejection::UnverifiableTimestamp),
        Some(t) if window.contains(t) => Ok(()),
        Some(_) => Err(Rejection::OutOfWindow),
    }
}

//! The date window a sync run operates on.
//!
//! [`SyncWindow`] is an inclusive range of calendar days. Both the
//! CampusOffice export and the CalDAV cleanup query are derived from it, so
//! the two sides of a run always cover exactly the same days.

use chrono::{DateTime, Days, Local, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

/// Errors raised while building a [`SyncWindow`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    /// Only one of the two bounds was supplied.
    #[error("time period needs both a start and an end, only `{present}` was given")]
    MissingBound {
        /// Name of the bound that was present.
        present: &'static str,
    },

    /// The start lies after the end.
    #[error("start of time period ({start}) is after its end ({end})")]
    Inverted {
        /// Requested start date.
        start: NaiveDate,
        /// Requested end date.
        end: NaiveDate,
    },

    /// A bound could not be parsed as `YYYY-MM-DD`.
    #[error("invalid date `{value}`, expected YYYY-MM-DD")]
    InvalidDate {
        /// The offending input.
        value: String,
    },
}

/// An inclusive range of days, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl SyncWindow {
    /// Days before today covered by the default window.
    pub const DEFAULT_LOOKBEHIND_DAYS: u64 = 7;

    /// Days after today covered by the default window.
    pub const DEFAULT_LOOKAHEAD_DAYS: u64 = 27 * 7;

    /// Creates a window, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, WindowError> {
        if start > end {
            return Err(WindowError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// The default window: one week back to 27 weeks ahead of `today`.
    pub fn around(today: NaiveDate) -> Self {
        let start = today
            .checked_sub_days(Days::new(Self::DEFAULT_LOOKBEHIND_DAYS))
            .unwrap_or(NaiveDate::MIN);
        let end = today
            .checked_add_days(Days::new(Self::DEFAULT_LOOKAHEAD_DAYS))
            .unwrap_or(NaiveDate::MAX);
        Self { start, end }
    }

    /// Builds a window from optional bounds.
    ///
    /// Both or neither must be given. With neither, the default window
    /// around `today` is used.
    pub fn from_bounds(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<Self, WindowError> {
        match (start, end) {
            (Some(start), Some(end)) => Self::new(start, end),
            (None, None) => Ok(Self::around(today)),
            (Some(_), None) => Err(WindowError::MissingBound { present: "start" }),
            (None, Some(_)) => Err(WindowError::MissingBound { present: "end" }),
        }
    }

    /// Parses a `YYYY-MM-DD` date.
    pub fn parse_date(value: &str) -> Result<NaiveDate, WindowError> {
        NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
            WindowError::InvalidDate {
                value: value.to_string(),
            }
        })
    }

    /// Returns a copy with a new start, keeping the ordering invariant.
    pub fn with_start(self, start: NaiveDate) -> Result<Self, WindowError> {
        Self::new(start, self.end)
    }

    /// Returns a copy with a new end, keeping the ordering invariant.
    pub fn with_end(self, end: NaiveDate) -> Result<Self, WindowError> {
        Self::new(self.start, end)
    }

    /// First day of the window.
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day of the window (inclusive).
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Returns true if `date` lies within the window.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// The instant range covered by the window, in UTC.
    ///
    /// Runs from local midnight of the first day to local midnight after the
    /// last day.
    pub fn utc_bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let after_end = self
            .end
            .checked_add_days(Days::new(1))
            .unwrap_or(NaiveDate::MAX);
        (local_midnight(self.start), local_midnight(after_end))
    }
}

fn local_midnight(date: NaiveDate) -> DateTime<Utc> {
    let naive: NaiveDateTime = date.and_time(chrono::NaiveTime::MIN);
    naive
        .and_local_timezone(Local)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn new_accepts_ordered_and_equal_bounds() {
        assert!(SyncWindow::new(date(2024, 1, 1), date(2024, 1, 7)).is_ok());
        assert!(SyncWindow::new(date(2024, 1, 1), date(2024, 1, 1)).is_ok());
    }

    #[test]
    fn new_rejects_inverted_bounds() {
        let err = SyncWindow::new(date(2024, 1, 8), date(2024, 1, 7)).unwrap_err();
        assert_eq!(
            err,
            WindowError::Inverted {
                start: date(2024, 1, 8),
                end: date(2024, 1, 7),
            }
        );
    }

    #[test]
    fn one_sided_bounds_are_rejected() {
        let today = date(2024, 5, 1);
        assert_eq!(
            SyncWindow::from_bounds(Some(date(2024, 1, 1)), None, today),
            Err(WindowError::MissingBound { present: "start" })
        );
        assert_eq!(
            SyncWindow::from_bounds(None, Some(date(2024, 1, 1)), today),
            Err(WindowError::MissingBound { present: "end" })
        );
    }

    #[test]
    fn both_or_neither_bounds_are_accepted() {
        let today = date(2024, 5, 1);
        let explicit =
            SyncWindow::from_bounds(Some(date(2024, 1, 1)), Some(date(2024, 1, 7)), today)
                .unwrap();
        assert_eq!(explicit.start(), date(2024, 1, 1));
        assert_eq!(explicit.end(), date(2024, 1, 7));

        let default = SyncWindow::from_bounds(None, None, today).unwrap();
        assert_eq!(default, SyncWindow::around(today));
    }

    #[test]
    fn default_window_spans_one_week_back_and_27_weeks_ahead() {
        let window = SyncWindow::around(date(2024, 5, 1));
        assert_eq!(window.start(), date(2024, 4, 24));
        assert_eq!(window.end(), date(2024, 11, 6));
        assert!(window.start() <= window.end());
    }

    #[test]
    fn single_bound_changes_keep_the_ordering() {
        let window = SyncWindow::new(date(2024, 1, 1), date(2024, 1, 7)).unwrap();

        let moved = window.with_start(date(2024, 1, 3)).unwrap();
        assert_eq!(moved.start(), date(2024, 1, 3));
        assert_eq!(moved.end(), date(2024, 1, 7));

        let moved = window.with_end(date(2024, 1, 1)).unwrap();
        assert!(moved.start() <= moved.end());

        assert!(matches!(
            window.with_start(date(2024, 1, 8)),
            Err(WindowError::Inverted { .. })
        ));
        assert!(matches!(
            window.with_end(date(2023, 12, 31)),
            Err(WindowError::Inverted { .. })
        ));
    }

    #[test]
    fn parse_date_accepts_iso_dates_only() {
        assert_eq!(SyncWindow::parse_date("2024-01-07").unwrap(), date(2024, 1, 7));
        assert_eq!(SyncWindow::parse_date(" 2024-01-07 ").unwrap(), date(2024, 1, 7));
        assert!(matches!(
            SyncWindow::parse_date("07.01.2024"),
            Err(WindowError::InvalidDate { .. })
        ));
    }

    #[test]
    fn contains_is_inclusive() {
        let window = SyncWindow::new(date(2024, 1, 1), date(2024, 1, 7)).unwrap();
        assert!(window.contains(date(2024, 1, 1)));
        assert!(window.contains(date(2024, 1, 7)));
        assert!(!window.contains(date(2024, 1, 8)));
        assert!(!window.contains(date(2023, 12, 31)));
    }

    #[test]
    fn utc_bounds_cover_whole_days() {
        let window = SyncWindow::new(date(2024, 1, 1), date(2024, 1, 7)).unwrap();
        let (start, end) = window.utc_bounds();
        assert!(start < end);
        // Seven days apart, give or take a DST shift.
        let span = end - start;
        assert!(span >= chrono::Duration::hours(7 * 24 - 1));
        assert!(span <= chrono::Duration::hours(7 * 24 + 1));
    }
}

//! Date-window partitioning of a collection range
//!
//! The research API caps the span of a single query, so `[d_start, d_end)`
//! is walked in fixed increments. Windows are half-open and never extend
//! past `d_end`; the last one may be shorter than the increment.

use chrono::{Days, NaiveDate};

use super::{FilterExpression, SubQuery};

/// Wire format for `start_date` / `end_date`
const DATE_PARAM_FORMAT: &str = "%Y%m%d";

/// Half-open date range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateWindow {
    /// Create a window; `None` unless `start < end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    /// First day of the window
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Exclusive end of the window
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Span in days
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// `start_date` request parameter (`YYYYMMDD`)
    pub fn start_date_param(&self) -> String {
        self.start.format(DATE_PARAM_FORMAT).to_string()
    }

    /// `end_date` request parameter (`YYYYMMDD`)
    pub fn end_date_param(&self) -> String {
        self.end.format(DATE_PARAM_FORMAT).to_string()
    }
}

impl std::fmt::Display for DateWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Iterator over consecutive windows of a date range
#[derive(Debug, Clone)]
pub struct WindowIter {
    cursor: NaiveDate,
    end: NaiveDate,
    increment: Days,
}

impl WindowIter {
    /// Walk `[d_start, d_end)` in steps of `increment_days`.
    ///
    /// An empty range or a zero increment yields no windows.
    pub fn new(d_start: NaiveDate, d_end: NaiveDate, increment_days: u32) -> Self {
        let end = if increment_days == 0 { d_start } else { d_end };
        Self {
            cursor: d_start,
            end,
            increment: Days::new(u64::from(increment_days)),
        }
    }
}

impl Iterator for WindowIter {
    type Item = DateWindow;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.end {
            return None;
        }

        let window_end = self
            .cursor
            .checked_add_days(self.increment)
            .map_or(self.end, |next| next.min(self.end));

        let window = DateWindow {
            start: self.cursor,
            end: window_end,
        };
        self.cursor = window_end;
        Some(window)
    }
}

/// Number of windows covering `[d_start, d_end)`: `ceil(days / increment)`
pub fn window_count(d_start: NaiveDate, d_end: NaiveDate, increment_days: u32) -> usize {
    let days = (d_end - d_start).num_days();
    if days <= 0 || increment_days == 0 {
        return 0;
    }
    let increment = i64::from(increment_days);
    ((days + increment - 1) / increment) as usize
}

/// Pair every base query with every window of `[d_start, d_end)`.
///
/// Windows for one base query are exhausted before moving to the next. The
/// sequence is lazy and can be recreated from the same inputs.
pub fn iterate_windows(
    base_queries: &[FilterExpression],
    d_start: NaiveDate,
    d_end: NaiveDate,
    increment_days: u32,
) -> impl Iterator<Item = SubQuery> + '_ {
    base_queries
        .iter()
        .enumerate()
        .flat_map(move |(query_index, expression)| {
            WindowIter::new(d_start, d_end, increment_days)
                .enumerate()
                .map(move |(window_index, window)| SubQuery {
                    query_index,
                    window_index,
                    expression: expression.clone(),
                    window,
                })
        })
}

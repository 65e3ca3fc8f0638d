//! Calendar-aware elapsed time in years, months and days.
//!
//! The month count is the largest number of whole months that can be added
//! to `from` without passing `to`, with the day clamped to the end of shorter
//! months. The days are what remains after that anchor.

use chrono::{Datelike, Months, NaiveDate};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarSpan {
    pub years: i32,
    pub months: i32,
    pub days: i32,
}

impl CalendarSpan {
    /// Span from `from` to `to`; zero when `from` is after `to`.
    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        if from >= to {
            return Self {
                years: 0,
                months: 0,
                days: 0,
            };
        }

        let mut total_months = (to.year() - from.year()) * 12 + to.month() as i32
            - from.month() as i32;
        let mut anchor = add_months(from, total_months);
        if anchor > to {
            total_months -= 1;
            anchor = add_months(from, total_months);
        }

        Self {
            years: total_months / 12,
            months: total_months % 12,
            days: (to - anchor).num_days() as i32,
        }
    }
}

/// `date` moved forward by `months`, the day clamped to the target month.
fn add_months(date: NaiveDate, months: i32) -> NaiveDate {
    date.checked_add_months(Months::new(months.max(0) as u32))
        .unwrap_or(date)
}

impl fmt::Display for CalendarSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} year{}, {} month{}, {} day{}",
            self.years,
            plural(self.years),
            self.months,
            plural(self.months),
            self.days,
            plural(self.days)
        )
    }
}

fn plural(n: i32) -> &'static str {
    if n == 1 { "" } else { "s" }
}

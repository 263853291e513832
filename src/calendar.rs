//! School-day accounting for the current academic year.
//!
//! The closure windows are approximations: Easter is a fixed April range and
//! is not derived from the liturgical calendar.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;

/// National holidays as (month, day).
static HOLIDAYS: &[(u32, u32)] = &[
    (11, 1),
    (12, 8),
    (12, 25),
    (12, 26),
    (1, 1),
    (1, 6),
    (4, 25),
    (5, 1),
    (6, 2),
];

/// Christmas break, wrapping over new year.
const CHRISTMAS: ClosureRange = ClosureRange {
    from: (12, 23),
    to: (1, 6),
};

/// Placeholder Easter break.
const EASTER: ClosureRange = ClosureRange {
    from: (4, 10),
    to: (4, 17),
};

/// An inclusive (month, day) range that may wrap over the year boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClosureRange {
    pub from: (u32, u32),
    pub to: (u32, u32),
}

impl ClosureRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        let md = (date.month(), date.day());
        if self.from <= self.to {
            self.from <= md && md <= self.to
        } else {
            md >= self.from || md <= self.to
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcademicYearWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub holidays: Vec<(u32, u32)>,
    pub closures: Vec<ClosureRange>,
}

impl AcademicYearWindow {
    /// The year runs Sep 1 – Jun 30; from September on, today belongs to the year starting now.
    pub fn containing(today: NaiveDate) -> Self {
        let start_year = if today.month() >= 9 {
            today.year()
        } else {
            today.year() - 1
        };

        AcademicYearWindow {
            start: ymd(start_year, 9, 1),
            end: ymd(start_year + 1, 6, 30),
            holidays: HOLIDAYS.to_vec(),
            closures: vec![CHRISTMAS, EASTER],
        }
    }

    pub fn is_school_day(&self, date: NaiveDate) -> bool {
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            return false;
        }
        if self.holidays.contains(&(date.month(), date.day())) {
            return false;
        }
        !self.closures.iter().any(|c| c.contains(date))
    }

    pub fn school_days(&self, today: NaiveDate) -> SchoolDays {
        let mut total = 0;
        let mut elapsed = 0;

        for date in self.start.iter_days().take_while(|d| *d <= self.end) {
            if !self.is_school_day(date) {
                continue;
            }
            total += 1;
            if date <= today {
                elapsed += 1;
            }
        }

        SchoolDays {
            total,
            elapsed,
            remaining: total - elapsed,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchoolDays {
    pub total: u32,
    pub elapsed: u32,
    pub remaining: u32,
}

impl SchoolDays {
    /// Share of the year already behind us, in percent.
    pub fn progress_pct(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.elapsed as f64 / self.total as f64 * 100.0
        }
    }
}

/// School days of the academic year containing `today`.
pub fn school_days(today: NaiveDate) -> SchoolDays {
    AcademicYearWindow::containing(today).school_days(today)
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    // Sep 1 and Jun 30 exist in every year.
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

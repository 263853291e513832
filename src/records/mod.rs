//! Normalization of raw portal records.
//!
//! The portal has renamed its fields more than once, so every canonical field
//! is looked up through an alias table ([`aliases`]). Normalization never
//! fails: malformed fields degrade to defaults and the record is kept.

pub mod absence;
pub mod aliases;
pub mod grade;
pub mod value;

pub use absence::{AbsenceKind, AbsenceRecord};
pub use aliases::RawRecord;
pub use grade::GradeRecord;
pub use value::parse_grade_value;

use chrono::NaiveDate;

/// Date format used by the portal.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses a portal date. Timestamps like `2024-10-15T08:00:00` keep the date part.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, DATE_FORMAT).ok()
}

pub fn normalize_grades(raw: &[RawRecord]) -> Vec<GradeRecord> {
    raw.iter().map(GradeRecord::from_raw).collect()
}

pub fn normalize_absences(raw: &[RawRecord]) -> Vec<AbsenceRecord> {
    raw.iter().map(AbsenceRecord::from_raw).collect()
}

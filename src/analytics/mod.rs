//! Grade and attendance analytics.
//!
//! Everything here is a pure function of normalized records (plus today's
//! date for the calendar-dependent parts). "No data" is always `None` or an
//! empty collection, never a zero.

pub mod aggregate;
pub mod attendance;
pub mod types;
pub mod utility;

pub use aggregate::{PASSING_GRADE, aggregate_grades, rank_subjects};
pub use attendance::{absence_budget, absence_report, count_absences, recent_absences};
pub use types::{
    AbsenceBudget, AbsenceCounts, AbsenceReport, AnalyticsSnapshot, BudgetStatus, GradeHistogram,
    SubjectAverages, TermAverages,
};

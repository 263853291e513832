//! Result types produced by the analytics engine.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::calendar::SchoolDays;
use crate::records::{AbsenceKind, AbsenceRecord};

/// Averages for the two terms and the whole year. `None` means no data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TermAverages {
    pub first: Option<f64>,
    pub second: Option<f64>,
    pub overall: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectAverages {
    pub subject: String,
    pub averages: TermAverages,
    pub grade_count: usize,
}

/// Rounded grade (1–10) → occurrences. Empty buckets are not stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GradeHistogram(pub(crate) BTreeMap<u8, usize>);

impl GradeHistogram {
    pub fn count(&self, bucket: u8) -> usize {
        self.0.get(&bucket).copied().unwrap_or(0)
    }

    pub fn max_count(&self) -> Option<usize> {
        self.0.values().copied().max()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, usize)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }
}

/// Everything derived from one grade list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalyticsSnapshot {
    /// Per-subject averages in first-seen order.
    pub subjects: Vec<SubjectAverages>,
    /// Mean of the per-subject means.
    pub overall: TermAverages,
    /// Plain mean of individual grades per term, as a secondary figure.
    pub grade_means: TermAverages,
    pub histogram: GradeHistogram,
    /// Subject names by overall average, best first.
    pub ranking: Vec<String>,
    /// Subjects whose overall average is below the passing grade.
    pub below_passing: Vec<String>,
    pub grade_count: usize,
}

impl AnalyticsSnapshot {
    /// True when no grade qualified for any figure.
    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty() && self.histogram.is_empty()
    }

    pub fn subject(&self, name: &str) -> Option<&SubjectAverages> {
        self.subjects.iter().find(|s| s.subject == name)
    }
}

/// How much of the absence allowance is used up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BudgetStatus {
    Comfortable,
    Warning,
    Critical,
    OverLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AbsenceBudget {
    pub limit: u32,
    /// Negative when the limit has been exceeded.
    pub available: i64,
    /// Absences as a share of the limit; `None` when the limit is zero.
    pub used_pct: Option<f64>,
    /// Absences as a share of the school days elapsed so far.
    pub elapsed_pct: Option<f64>,
    pub status: BudgetStatus,
}

impl AbsenceBudget {
    pub fn is_over_limit(&self) -> bool {
        self.status == BudgetStatus::OverLimit
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AbsenceCounts {
    pub absences: u32,
    pub late_arrivals: u32,
    pub early_departures: u32,
    pub other: u32,
    pub justified: u32,
    pub unjustified: u32,
}

impl AbsenceCounts {
    pub fn of_kind(&self, kind: AbsenceKind) -> u32 {
        match kind {
            AbsenceKind::Absence => self.absences,
            AbsenceKind::LateArrival => self.late_arrivals,
            AbsenceKind::EarlyDeparture => self.early_departures,
            AbsenceKind::Other => self.other,
        }
    }
}

/// Attendance figures for one absence list against one calendar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AbsenceReport {
    pub counts: AbsenceCounts,
    pub school_days: SchoolDays,
    pub budget: AbsenceBudget,
    /// Most recent events, newest first.
    pub recent: Vec<AbsenceRecord>,
}

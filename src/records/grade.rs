use chrono::NaiveDate;
use serde::Serialize;

use super::aliases::{self, Field, RawRecord};
use super::parse_date;
use super::value::parse_grade_value;
use crate::term::{Term, classify_opt};

/// Colour marker the portal puts on informational grades.
pub const NON_AVERAGING_COLOR: &str = "blue";

/// A grade in canonical form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeRecord {
    pub subject: String,
    pub display_value: String,
    pub numeric_value: Option<f64>,
    pub date: Option<NaiveDate>,
    pub raw_date: String,
    pub component_type: String,
    pub note: Option<String>,
    pub counts_toward_average: bool,
    pub term: Option<Term>,
}

impl GradeRecord {
    pub fn from_raw(raw: &RawRecord) -> Self {
        let display_value = aliases::text_or_default(raw, Field::DisplayValue);
        let raw_date = aliases::text_or_default(raw, Field::Date);
        let date = parse_date(&raw_date);

        let non_averaging = aliases::text(raw, Field::Color)
            .is_some_and(|c| c.eq_ignore_ascii_case(NON_AVERAGING_COLOR))
            || aliases::flag(raw, Field::NoAverage);

        GradeRecord {
            subject: aliases::text_or_default(raw, Field::Subject),
            numeric_value: parse_grade_value(&display_value),
            display_value,
            date,
            raw_date,
            component_type: aliases::text_or_default(raw, Field::ComponentType),
            note: aliases::text(raw, Field::Note).filter(|n| !n.trim().is_empty()),
            counts_toward_average: !non_averaging,
            term: classify_opt(date),
        }
    }

    /// Value usable in histograms: counts toward the average and is positive.
    pub fn scored_value(&self) -> Option<f64> {
        if !self.counts_toward_average {
            return None;
        }
        self.numeric_value.filter(|v| *v > 0.0)
    }

    /// Value and term usable in averages. Summer or undated grades have no term.
    pub fn averaging_value(&self) -> Option<(f64, Term)> {
        Some((self.scored_value()?, self.term?))
    }
}

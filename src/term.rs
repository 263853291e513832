//! Academic term (quadrimestre) classification.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

/// One of the two grading periods of the academic year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Term {
    First,
    Second,
}

impl Term {
    pub fn number(self) -> u8 {
        match self {
            Term::First => 1,
            Term::Second => 2,
        }
    }
}

/// Maps a month to its term.
///
/// | Month           | Term   |
/// |-----------------|--------|
/// | Sep – Dec, Jan  | First  |
/// | Feb – Jun       | Second |
/// | Jul, Aug        | none   |
///
/// The first term deliberately spills into January.
pub fn classify_month(month: u32) -> Option<Term> {
    match month {
        9..=12 | 1 => Some(Term::First),
        2..=6 => Some(Term::Second),
        _ => None,
    }
}

pub fn classify(date: NaiveDate) -> Option<Term> {
    classify_month(date.month())
}

/// Classifies an optional date; records with a malformed date have no term.
pub fn classify_opt(date: Option<NaiveDate>) -> Option<Term> {
    date.and_then(classify)
}

use chrono::NaiveDate;
use serde::Serialize;

use super::aliases::{self, Field, RawRecord};
use super::parse_date;

/// Event codes published by the portal and what they mean.
static EVENT_CODES: &[(&str, AbsenceKind)] = &[
    ("ABA0", AbsenceKind::Absence),
    ("ABR0", AbsenceKind::LateArrival),
    ("ABU0", AbsenceKind::EarlyDeparture),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AbsenceKind {
    Absence,
    LateArrival,
    EarlyDeparture,
    Other,
}

impl AbsenceKind {
    pub fn from_code(code: &str) -> Self {
        EVENT_CODES
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, kind)| *kind)
            .unwrap_or(AbsenceKind::Other)
    }
}

/// An attendance event in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AbsenceRecord {
    pub kind: AbsenceKind,
    pub code: String,
    pub date: Option<NaiveDate>,
    pub raw_date: String,
    pub justified: bool,
}

impl AbsenceRecord {
    pub fn from_raw(raw: &RawRecord) -> Self {
        let code = aliases::text(raw, Field::EventCode).unwrap_or_default();
        let raw_date = aliases::text_or_default(raw, Field::Date);

        AbsenceRecord {
            kind: AbsenceKind::from_code(code.trim()),
            date: parse_date(&raw_date),
            raw_date,
            justified: aliases::flag(raw, Field::Justified),
            code,
        }
    }
}

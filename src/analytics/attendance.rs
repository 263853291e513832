use chrono::NaiveDate;

use crate::analytics::types::{AbsenceBudget, AbsenceCounts, AbsenceReport, BudgetStatus};
use crate::analytics::utility::pct;
use crate::calendar::{SchoolDays, school_days};
use crate::records::{AbsenceKind, AbsenceRecord};

/// Share of the school days a student may miss.
pub const ABSENCE_LIMIT_RATIO: f64 = 0.25;

/// How many events [`AbsenceReport::recent`] keeps.
pub const RECENT_EVENTS: usize = 20;

/// Usage thresholds (percent of the limit) for the budget bands.
const WARNING_PCT: f64 = 70.0;
const CRITICAL_PCT: f64 = 90.0;

pub fn count_absences(records: &[AbsenceRecord]) -> AbsenceCounts {
    let mut counts = AbsenceCounts::default();

    for record in records {
        match record.kind {
            AbsenceKind::Absence => counts.absences += 1,
            AbsenceKind::LateArrival => counts.late_arrivals += 1,
            AbsenceKind::EarlyDeparture => counts.early_departures += 1,
            AbsenceKind::Other => counts.other += 1,
        }
        if record.justified {
            counts.justified += 1;
        } else {
            counts.unjustified += 1;
        }
    }

    counts
}

/// Absence allowance for a year of `days`, given the full-day absences so far.
///
/// The limit is the floor of 25% of the total school days. Going past it makes
/// `available` negative and the status [`BudgetStatus::OverLimit`].
pub fn absence_budget(days: SchoolDays, absences: u32) -> AbsenceBudget {
    let limit = (days.total as f64 * ABSENCE_LIMIT_RATIO).floor() as u32;
    let available = i64::from(limit) - i64::from(absences);
    let used_pct = pct(absences as f64, limit as f64);

    let status = match used_pct {
        _ if available < 0 => BudgetStatus::OverLimit,
        Some(p) if p > CRITICAL_PCT => BudgetStatus::Critical,
        Some(p) if p > WARNING_PCT => BudgetStatus::Warning,
        _ => BudgetStatus::Comfortable,
    };

    AbsenceBudget {
        limit,
        available,
        used_pct,
        elapsed_pct: pct(absences as f64, days.elapsed as f64),
        status,
    }
}

/// Newest events first; undated events sort last.
pub fn recent_absences(records: &[AbsenceRecord], limit: usize) -> Vec<AbsenceRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| b.date.cmp(&a.date));
    sorted.truncate(limit);
    sorted
}

/// Builds the attendance report against an explicit calendar.
pub fn report_with_days(records: &[AbsenceRecord], days: SchoolDays) -> AbsenceReport {
    let counts = count_absences(records);

    AbsenceReport {
        budget: absence_budget(days, counts.absences),
        counts,
        school_days: days,
        recent: recent_absences(records, RECENT_EVENTS),
    }
}

/// Builds the attendance report for the academic year containing `today`.
pub fn absence_report(records: &[AbsenceRecord], today: NaiveDate) -> AbsenceReport {
    report_with_days(records, school_days(today))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn days(total: u32, elapsed: u32) -> SchoolDays {
        SchoolDays {
            total,
            elapsed,
            remaining: total - elapsed,
        }
    }

    fn event(code: &str, date: &str, justified: bool) -> AbsenceRecord {
        AbsenceRecord {
            kind: AbsenceKind::from_code(code),
            code: code.to_string(),
            date: crate::records::parse_date(date),
            raw_date: date.to_string(),
            justified,
        }
    }

    #[test]
    fn test_budget_over_limit() {
        let budget = absence_budget(days(100, 60), 30);

        assert_eq!(budget.limit, 25);
        assert_eq!(budget.available, -5);
        assert_eq!(budget.used_pct, Some(120.0));
        assert_eq!(budget.elapsed_pct, Some(50.0));
        assert!(budget.is_over_limit());
    }

    #[test]
    fn test_budget_bands() {
        assert_eq!(absence_budget(days(100, 50), 10).status, BudgetStatus::Comfortable);
        assert_eq!(absence_budget(days(100, 50), 20).status, BudgetStatus::Warning);
        assert_eq!(absence_budget(days(100, 50), 23).status, BudgetStatus::Critical);
        // Exactly at the limit is not over it.
        let at_limit = absence_budget(days(100, 50), 25);
        assert_eq!(at_limit.available, 0);
        assert_eq!(at_limit.status, BudgetStatus::Critical);
    }

    #[test]
    fn test_budget_limit_floors() {
        assert_eq!(absence_budget(days(171, 0), 0).limit, 42);
    }

    #[test]
    fn test_budget_without_days() {
        let budget = absence_budget(days(0, 0), 0);

        assert_eq!(budget.limit, 0);
        assert_eq!(budget.used_pct, None);
        assert_eq!(budget.elapsed_pct, None);
        assert_eq!(budget.status, BudgetStatus::Comfortable);
    }

    #[test]
    fn test_counts_by_kind() {
        let records = vec![
            event("ABA0", "2024-10-01", true),
            event("ABA0", "2024-10-02", false),
            event("ABR0", "2024-10-03", true),
            event("ABU0", "2024-10-04", false),
            event("XYZ9", "2024-10-05", false),
        ];
        let counts = count_absences(&records);

        assert_eq!(counts.of_kind(AbsenceKind::Absence), 2);
        assert_eq!(counts.late_arrivals, 1);
        assert_eq!(counts.early_departures, 1);
        assert_eq!(counts.other, 1);
        assert_eq!(counts.justified, 2);
        assert_eq!(counts.unjustified, 3);
    }

    #[test]
    fn test_only_full_absences_use_budget() {
        let records = vec![event("ABR0", "2024-10-03", false), event("ABU0", "2024-10-04", false)];
        let report = report_with_days(&records, days(100, 10));

        assert_eq!(report.budget.available, 25);
    }

    #[test]
    fn test_recent_sorted_newest_first() {
        let records = vec![
            event("ABA0", "2024-10-01", true),
            event("ABA0", "N/A", true),
            event("ABA0", "2024-12-01", true),
            event("ABA0", "2024-11-01", true),
        ];
        let recent = recent_absences(&records, 3);
        let dates: Vec<_> = recent.iter().map(|r| r.raw_date.as_str()).collect();

        assert_eq!(dates, vec!["2024-12-01", "2024-11-01", "2024-10-01"]);
    }

    #[test]
    fn test_empty_report() {
        let report = report_with_days(&[], days(100, 10));

        assert_eq!(report.counts, AbsenceCounts::default());
        assert!(report.recent.is_empty());
        assert_eq!(report.budget.available, 25);
    }
}

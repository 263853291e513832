use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use crate::analytics::types::{AnalyticsSnapshot, GradeHistogram, SubjectAverages, TermAverages};
use crate::analytics::utility::{mean, mean_of_defined};
use crate::records::GradeRecord;
use crate::term::Term;

/// Lowest average considered a pass.
pub const PASSING_GRADE: f64 = 6.0;

#[derive(Default)]
struct SubjectSeries {
    first: Vec<f64>,
    second: Vec<f64>,
    all: Vec<f64>,
}

impl SubjectSeries {
    fn push(&mut self, value: f64, term: Term) {
        match term {
            Term::First => self.first.push(value),
            Term::Second => self.second.push(value),
        }
        self.all.push(value);
    }

    fn averages(&self) -> TermAverages {
        TermAverages {
            first: mean(&self.first),
            second: mean(&self.second),
            overall: mean(&self.all),
        }
    }
}

/// Builds an [`AnalyticsSnapshot`] from a normalized grade list.
///
/// Only grades that count toward the average, have a positive value and fall
/// into a term take part in averages. The overall figures are a mean of the
/// per-subject means, so a subject with many grades weighs as much as one with
/// a single grade.
pub fn aggregate_grades(grades: &[GradeRecord]) -> AnalyticsSnapshot {
    let mut order: Vec<&str> = Vec::new();
    let mut series: HashMap<&str, SubjectSeries> = HashMap::new();
    let mut first_values = Vec::new();
    let mut second_values = Vec::new();
    let mut buckets: BTreeMap<u8, usize> = BTreeMap::new();

    for grade in grades {
        if let Some(bucket) = grade.scored_value().and_then(histogram_bucket) {
            *buckets.entry(bucket).or_default() += 1;
        }

        let Some((value, term)) = grade.averaging_value() else {
            continue;
        };

        series
            .entry(grade.subject.as_str())
            .or_insert_with(|| {
                order.push(grade.subject.as_str());
                SubjectSeries::default()
            })
            .push(value, term);

        match term {
            Term::First => first_values.push(value),
            Term::Second => second_values.push(value),
        }
    }

    let subjects: Vec<SubjectAverages> = order
        .iter()
        .filter_map(|name| {
            let s = series.get(name)?;
            Some(SubjectAverages {
                subject: name.to_string(),
                averages: s.averages(),
                grade_count: s.all.len(),
            })
        })
        .collect();

    let overall = TermAverages {
        first: mean_of_defined(subjects.iter().map(|s| s.averages.first)),
        second: mean_of_defined(subjects.iter().map(|s| s.averages.second)),
        overall: mean_of_defined(subjects.iter().map(|s| s.averages.overall)),
    };

    let grade_means = TermAverages {
        first: mean(&first_values),
        second: mean(&second_values),
        overall: mean(&[first_values, second_values].concat()),
    };

    let below_passing = subjects
        .iter()
        .filter(|s| s.averages.overall.is_some_and(|avg| avg < PASSING_GRADE))
        .map(|s| s.subject.clone())
        .collect();

    AnalyticsSnapshot {
        ranking: rank_subjects(&subjects),
        grade_count: subjects.iter().map(|s| s.grade_count).sum(),
        subjects,
        overall,
        grade_means,
        histogram: GradeHistogram(buckets),
        below_passing,
    }
}

/// Subject names by overall average, best first. Ties keep first-seen order.
pub fn rank_subjects(subjects: &[SubjectAverages]) -> Vec<String> {
    let mut ranked: Vec<&SubjectAverages> = subjects.iter().collect();
    // `sort_by` is stable.
    ranked.sort_by(|a, b| {
        b.averages
            .overall
            .partial_cmp(&a.averages.overall)
            .unwrap_or(Ordering::Equal)
    });
    ranked.into_iter().map(|s| s.subject.clone()).collect()
}

/// Nearest whole grade, ties to even. Values outside 1–10 have no bucket.
fn histogram_bucket(value: f64) -> Option<u8> {
    let rounded = value.round_ties_even();
    (1.0..=10.0).contains(&rounded).then_some(rounded as u8)
}

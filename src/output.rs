//! Output of sync results for the command line.
//!
//! Supports debug logging, JSON serialization, and appending subject averages
//! to a CSV history file.

use anyhow::Result;
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::OpenOptions;
use std::path::Path;
use tracing::debug;

use crate::analytics::AnalyticsSnapshot;

/// One CSV row: a subject's averages at sync time. Empty cells mean no data.
#[derive(Debug, Serialize)]
pub struct SubjectRow<'a> {
    pub synced_at: DateTime<Utc>,
    pub subject: &'a str,
    pub grade_count: usize,
    pub first_term: Option<f64>,
    pub second_term: Option<f64>,
    pub overall: Option<f64>,
}

/// Logs any result using Rust's debug pretty-print format.
pub fn print_pretty(value: &impl std::fmt::Debug) {
    debug!("{:#?}", value);
}

/// Pretty-printed JSON.
pub fn to_json(value: &impl Serialize) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Appends one row per subject to a CSV file.
///
/// Creates the file with headers if it does not already exist, so repeated
/// syncs build up a history of averages.
pub fn append_subject_averages(
    path: &str,
    snapshot: &AnalyticsSnapshot,
    synced_at: DateTime<Utc>,
) -> Result<usize> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, "Appending subject averages");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    for subject in &snapshot.subjects {
        writer.serialize(SubjectRow {
            synced_at,
            subject: &subject.subject,
            grade_count: subject.grade_count,
            first_term: subject.averages.first,
            second_term: subject.averages.second,
            overall: subject.averages.overall,
        })?;
    }
    writer.flush()?;

    Ok(snapshot.subjects.len())
}

//! Session ownership, fetch-with-retry and delivery of results.
//!
//! The orchestrator owns the session. Each collection is fetched with a fixed
//! retry budget and, once done, handed over as one immutable bundle: the
//! normalized records plus everything derived from them.

pub mod events;
pub mod orchestrator;
pub mod retry;

pub use events::{Generation, SyncEvent, SyncInbox};
pub use orchestrator::{AuthenticatedUser, SyncOrchestrator, SyncState};
pub use retry::{RetryPolicy, fetch_with_retry};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::analytics::{AbsenceReport, AnalyticsSnapshot, absence_report, aggregate_grades};
use crate::records::{AbsenceRecord, GradeRecord, normalize_absences, normalize_grades};
use crate::services::PortalSession;

/// Outcome of fetching one collection.
///
/// `NoData` means the fetch gave up. It is not the same as an empty result:
/// a student with no absences gets `Ready` with an empty list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Collection<T> {
    Ready(T),
    NoData,
}

impl<T> Collection<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Collection::Ready(_))
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Collection::Ready(value) => Some(value),
            Collection::NoData => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Collection<U> {
        match self {
            Collection::Ready(value) => Collection::Ready(f(value)),
            Collection::NoData => Collection::NoData,
        }
    }
}

impl<T> From<Option<T>> for Collection<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Collection::NoData, Collection::Ready)
    }
}

/// Grades and their analytics, computed from the same list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeBundle {
    pub records: Vec<GradeRecord>,
    pub analytics: AnalyticsSnapshot,
}

impl GradeBundle {
    pub fn from_records(records: Vec<GradeRecord>) -> Self {
        let analytics = aggregate_grades(&records);
        Self { records, analytics }
    }
}

/// Absences and their calendar-dependent report, computed from the same list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AbsenceBundle {
    pub records: Vec<AbsenceRecord>,
    pub report: AbsenceReport,
}

impl AbsenceBundle {
    pub fn from_records(records: Vec<AbsenceRecord>, today: NaiveDate) -> Self {
        let report = absence_report(&records, today);
        Self { records, report }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncReport {
    pub grades: Collection<GradeBundle>,
    pub absences: Collection<AbsenceBundle>,
}

/// Fetches and normalizes grades. An empty grade list never counts as success.
pub async fn fetch_grades<S: PortalSession + ?Sized>(
    session: &S,
    policy: &RetryPolicy,
) -> Collection<Vec<GradeRecord>> {
    fetch_with_retry(policy, "grades", |raw: &Vec<_>| !raw.is_empty(), || session.fetch_grades())
        .await
        .map(|raw| normalize_grades(&raw))
        .into()
}

/// Fetches and normalizes absences. Any successful response counts, empty included.
pub async fn fetch_absences<S: PortalSession + ?Sized>(
    session: &S,
    policy: &RetryPolicy,
) -> Collection<Vec<AbsenceRecord>> {
    fetch_with_retry(policy, "absences", |_| true, || session.fetch_absences())
        .await
        .map(|raw| normalize_absences(&raw))
        .into()
}

pub async fn grade_bundle<S: PortalSession + ?Sized>(
    session: &S,
    policy: &RetryPolicy,
) -> Collection<GradeBundle> {
    fetch_grades(session, policy).await.map(GradeBundle::from_records)
}

pub async fn absence_bundle<S: PortalSession + ?Sized>(
    session: &S,
    policy: &RetryPolicy,
    today: NaiveDate,
) -> Collection<AbsenceBundle> {
    fetch_absences(session, policy)
        .await
        .map(|records| AbsenceBundle::from_records(records, today))
}

/// Fetches both collections. One failing never stops the other.
#[tracing::instrument(skip_all, fields(today = %today))]
pub async fn sync_all<S: PortalSession + ?Sized>(
    session: &S,
    policy: &RetryPolicy,
    today: NaiveDate,
) -> SyncReport {
    let grades = grade_bundle(session, policy).await;
    let absences = absence_bundle(session, policy, today).await;

    info!(
        grades_ready = grades.is_ready(),
        absences_ready = absences.is_ready(),
        "Sync cycle complete"
    );

    SyncReport { grades, absences }
}

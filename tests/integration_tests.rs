use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use chrono::NaiveDate;
use classeviva_sync::analytics::{BudgetStatus, absence_budget};
use classeviva_sync::calendar::SchoolDays;
use classeviva_sync::error::{PortalError, SyncError};
use classeviva_sync::records::RawRecord;
use classeviva_sync::services::{PortalApi, PortalSession, Profile};
use classeviva_sync::sync::{
    Collection, RetryPolicy, SyncEvent, SyncInbox, SyncOrchestrator, SyncState, sync_all,
};
use serde_json::Value;

fn fixture(text: &str, key: &str) -> Vec<RawRecord> {
    let value: Value = serde_json::from_str(text).unwrap();
    value[key]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_object().unwrap().clone())
        .collect()
}

fn grades_fixture() -> Vec<RawRecord> {
    fixture(include_str!("fixtures/grades.json"), "grades")
}

fn absences_fixture() -> Vec<RawRecord> {
    fixture(include_str!("fixtures/absences.json"), "events")
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 12, 10).unwrap()
}

/// Scripted portal behaviour shared by the fake portal and its sessions.
#[derive(Default)]
struct Script {
    reject_login: bool,
    login_delay: Duration,
    profile_name: Option<String>,
    grade_failures: u32,
    absence_failures: u32,
    grades_rejected: bool,
    panic_on_grades: bool,
    grades: Vec<RawRecord>,
    absences: Vec<RawRecord>,
    login_calls: AtomicU32,
    grade_calls: AtomicU32,
    absence_calls: AtomicU32,
}

impl Script {
    fn happy() -> Self {
        Script {
            profile_name: Some("Mario Rossi".into()),
            grades: grades_fixture(),
            absences: absences_fixture(),
            ..Default::default()
        }
    }
}

fn unavailable() -> PortalError {
    PortalError::Status {
        status: 503,
        body: "maintenance".into(),
    }
}

struct FakePortal(Arc<Script>);

struct FakeSession(Arc<Script>);

#[async_trait::async_trait]
impl PortalApi for FakePortal {
    type Session = FakeSession;

    async fn authenticate(
        &self,
        _username: &str,
        _password: &str,
    ) -> Result<FakeSession, PortalError> {
        self.0.login_calls.fetch_add(1, Ordering::SeqCst);
        if !self.0.login_delay.is_zero() {
            tokio::time::sleep(self.0.login_delay).await;
        }
        if self.0.reject_login {
            return Err(PortalError::Authentication("invalid credentials".into()));
        }
        Ok(FakeSession(Arc::clone(&self.0)))
    }
}

#[async_trait::async_trait]
impl PortalSession for FakeSession {
    async fn fetch_grades(&self) -> Result<Vec<RawRecord>, PortalError> {
        let call = self.0.grade_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.0.panic_on_grades {
            panic!("grade decoder crashed");
        }
        if self.0.grades_rejected {
            return Err(PortalError::Authentication("session expired".into()));
        }
        if call <= self.0.grade_failures {
            return Err(unavailable());
        }
        Ok(self.0.grades.clone())
    }

    async fn fetch_absences(&self) -> Result<Vec<RawRecord>, PortalError> {
        let call = self.0.absence_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.0.absence_failures {
            return Err(unavailable());
        }
        Ok(self.0.absences.clone())
    }

    async fn fetch_profile(&self) -> Result<Profile, PortalError> {
        self.0
            .profile_name
            .clone()
            .map(|display_name| Profile { display_name })
            .ok_or_else(unavailable)
    }
}

fn orchestrator(script: &Arc<Script>) -> SyncOrchestrator<FakePortal> {
    SyncOrchestrator::new(FakePortal(Arc::clone(script)), RetryPolicy::no_backoff(3))
}

#[tokio::test]
async fn test_full_sync_from_fixtures() {
    let script = Arc::new(Script::happy());
    let mut orch = orchestrator(&script);

    let user = orch.authenticate("S1234567", "secret").await.unwrap();
    assert_eq!(user.display_name, "Mario Rossi");
    assert_eq!(orch.state(), SyncState::Authenticated);

    let report = orch.sync(today()).await.unwrap();
    assert_eq!(orch.state(), SyncState::Ready);

    let grades = report.grades.ready().unwrap();
    assert_eq!(grades.records.len(), 7);

    // MATEMATICA {8, 8}, STORIA {4}: mean of subject means is 6, not 6.67.
    let snap = &grades.analytics;
    assert_eq!(snap.overall.overall, Some(6.0));
    assert_eq!(snap.overall.first, Some(6.0));
    assert_eq!(snap.overall.second, None);
    assert_eq!(snap.subject("MATEMATICA").unwrap().grade_count, 2);
    assert_eq!(snap.ranking, vec!["MATEMATICA", "STORIA"]);
    assert_eq!(snap.below_passing, vec!["STORIA"]);

    // Summer grade lands in the histogram; blue, noAverage and unparsable ones do not.
    assert_eq!(snap.histogram.count(8), 2);
    assert_eq!(snap.histogram.count(4), 1);
    assert_eq!(snap.histogram.count(7), 1);
    assert_eq!(snap.histogram.count(10), 0);
    assert_eq!(snap.histogram.count(9), 0);

    let absences = report.absences.ready().unwrap();
    assert_eq!(absences.report.counts.absences, 3);
    assert_eq!(absences.report.counts.late_arrivals, 1);
    assert_eq!(absences.report.counts.early_departures, 1);
    assert_eq!(absences.report.counts.unjustified, 3);
    assert_eq!(absences.report.recent[0].raw_date, "2024-12-09");
    assert!(absences.report.budget.limit > 3);
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let script = Arc::new(Script {
        grade_failures: 2,
        ..Script::happy()
    });
    let mut orch = orchestrator(&script);
    orch.authenticate("S1234567", "secret").await.unwrap();

    let grades = orch.fetch_grades().await.unwrap();

    assert!(grades.is_ready());
    assert_eq!(script.grade_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_three_failures_give_no_data() {
    let script = Arc::new(Script {
        grade_failures: 5,
        ..Script::happy()
    });
    let mut orch = orchestrator(&script);
    orch.authenticate("S1234567", "secret").await.unwrap();

    let report = orch.sync(today()).await.unwrap();

    assert_eq!(report.grades, Collection::NoData);
    assert!(report.absences.is_ready());
    assert_eq!(script.grade_calls.load(Ordering::SeqCst), 3);
    // One collection is enough for a usable cycle.
    assert_eq!(orch.state(), SyncState::Ready);
}

#[tokio::test]
async fn test_empty_grades_are_no_data_but_empty_absences_are_ready() {
    let script = Arc::new(Script {
        profile_name: Some("Mario Rossi".into()),
        ..Default::default()
    });
    let mut orch = orchestrator(&script);
    orch.authenticate("S1234567", "secret").await.unwrap();

    let report = orch.sync(today()).await.unwrap();

    assert_eq!(report.grades, Collection::NoData);
    assert_eq!(script.grade_calls.load(Ordering::SeqCst), 3);

    let absences = report.absences.ready().unwrap();
    assert!(absences.records.is_empty());
    assert_eq!(absences.report.budget.status, BudgetStatus::Comfortable);
    assert_eq!(script.absence_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_both_collections_failing_fails_the_cycle() {
    let script = Arc::new(Script {
        grade_failures: 3,
        absence_failures: 3,
        ..Script::happy()
    });
    let mut orch = orchestrator(&script);
    orch.authenticate("S1234567", "secret").await.unwrap();

    let report = orch.sync(today()).await.unwrap();

    assert!(!report.grades.is_ready());
    assert!(!report.absences.is_ready());
    assert_eq!(orch.state(), SyncState::Failed);
}

#[tokio::test]
async fn test_rejected_session_is_not_retried() {
    let script = Arc::new(Script {
        grades_rejected: true,
        ..Script::happy()
    });
    let mut orch = orchestrator(&script);
    orch.authenticate("S1234567", "secret").await.unwrap();

    assert_eq!(orch.fetch_grades().await.unwrap(), Collection::NoData);
    assert_eq!(script.grade_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_login_failure_is_not_retried() {
    let script = Arc::new(Script {
        reject_login: true,
        ..Script::happy()
    });
    let mut orch = orchestrator(&script);

    let err = orch.authenticate("S1234567", "wrong").await.unwrap_err();

    assert!(matches!(err, SyncError::Authentication(ref e) if e.is_auth()));
    assert_eq!(orch.state(), SyncState::Failed);
    assert!(orch.session().is_none());
    assert_eq!(script.login_calls.load(Ordering::SeqCst), 1);
    assert!(matches!(orch.fetch_grades().await, Err(SyncError::NotAuthenticated)));
}

#[tokio::test]
async fn test_profile_failure_falls_back_to_username() {
    let script = Arc::new(Script {
        profile_name: None,
        ..Script::happy()
    });
    let mut orch = orchestrator(&script);

    let user = orch.authenticate("S1234567", "secret").await.unwrap();

    assert_eq!(user.display_name, "S1234567");
    assert_eq!(orch.state(), SyncState::Authenticated);
}

#[tokio::test]
async fn test_logout_drops_session() {
    let script = Arc::new(Script::happy());
    let mut orch = orchestrator(&script);
    orch.authenticate("S1234567", "secret").await.unwrap();

    orch.logout();

    assert_eq!(orch.state(), SyncState::Unauthenticated);
    assert!(matches!(orch.fetch_absences(today()).await, Err(SyncError::NotAuthenticated)));
}

#[tokio::test]
async fn test_sync_all_keeps_going_when_one_collection_fails() {
    let script = Arc::new(Script {
        absence_failures: 3,
        ..Script::happy()
    });
    let session = FakeSession(Arc::clone(&script));

    let report = sync_all(&session, &RetryPolicy::no_backoff(3), today()).await;

    assert!(report.grades.is_ready());
    assert_eq!(report.absences, Collection::NoData);
    assert_eq!(script.absence_calls.load(Ordering::SeqCst), 3);
}

async fn drain(inbox: &mut SyncInbox) -> Vec<SyncEvent> {
    let mut events = Vec::new();
    while let Some(event) = inbox.recv().await {
        let terminal = event.is_terminal();
        events.push(event);
        if terminal {
            break;
        }
    }
    events
}

#[tokio::test]
async fn test_inbox_delivers_one_event_per_step() {
    let script = Arc::new(Script::happy());
    let mut inbox = SyncInbox::new(8);

    let handle = inbox.start(orchestrator(&script), "S1234567".into(), "secret".into(), today());
    let events = drain(&mut inbox).await;

    assert_eq!(events.len(), 4);
    assert!(matches!(events[0], SyncEvent::Authenticated { .. }));
    assert!(matches!(events[1], SyncEvent::Grades { ref grades, .. } if grades.is_ready()));
    assert!(matches!(events[2], SyncEvent::Absences { ref absences, .. } if absences.is_ready()));
    assert!(matches!(events[3], SyncEvent::Finished { state: SyncState::Ready, .. }));

    let orch = handle.await.unwrap();
    assert!(orch.session().is_some());
}

#[tokio::test]
async fn test_inbox_reports_login_failure() {
    let script = Arc::new(Script {
        reject_login: true,
        ..Script::happy()
    });
    let mut inbox = SyncInbox::new(8);

    let handle = inbox.start(orchestrator(&script), "S1234567".into(), "wrong".into(), today());
    let events = drain(&mut inbox).await;

    assert_eq!(events.len(), 1);
    assert!(matches!(
        events[0],
        SyncEvent::AuthenticationFailed { ref message, .. } if message.contains("invalid")
    ));
    assert_eq!(handle.await.unwrap().state(), SyncState::Failed);
    assert_eq!(script.grade_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_inbox_drops_events_from_superseded_sequence() {
    let slow = Arc::new(Script {
        login_delay: Duration::from_millis(50),
        profile_name: Some("Old Session".into()),
        ..Script::happy()
    });
    let fast = Arc::new(Script {
        profile_name: Some("New Session".into()),
        ..Script::happy()
    });
    let mut inbox = SyncInbox::new(16);

    let stale = inbox.start(orchestrator(&slow), "old".into(), "secret".into(), today());
    let current = inbox.start(orchestrator(&fast), "new".into(), "secret".into(), today());
    let generation = inbox.current_generation();

    let events = drain(&mut inbox).await;

    assert!(events.iter().all(|e| e.generation() == generation));
    assert!(matches!(
        events[0],
        SyncEvent::Authenticated { ref user, .. } if user.display_name == "New Session"
    ));
    assert!(matches!(events.last(), Some(SyncEvent::Finished { .. })));

    // The superseded sequence still runs to completion; its results go nowhere.
    stale.await.unwrap();
    current.await.unwrap();
    assert_eq!(slow.grade_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_inbox_closes_when_sequence_dies() {
    let script = Arc::new(Script {
        panic_on_grades: true,
        ..Script::happy()
    });
    let mut inbox = SyncInbox::new(8);

    let handle = inbox.start(orchestrator(&script), "S1234567".into(), "secret".into(), today());

    assert!(matches!(inbox.recv().await, Some(SyncEvent::Authenticated { .. })));
    let next = tokio::time::timeout(Duration::from_secs(2), inbox.recv())
        .await
        .expect("inbox should close once the task is gone");
    assert!(next.is_none());
    assert!(handle.await.is_err_and(|e| e.is_panic()));
}

#[tokio::test]
async fn test_inbox_without_sequence_is_empty() {
    let mut inbox = SyncInbox::new(4);
    assert!(inbox.recv().await.is_none());
}

#[test]
fn test_absence_budget_bands() {
    let days = SchoolDays {
        total: 200,
        elapsed: 100,
        remaining: 100,
    };

    let warning = absence_budget(days, 40);
    assert_eq!(warning.limit, 50);
    assert_eq!(warning.available, 10);
    assert_eq!(warning.used_pct, Some(80.0));
    assert_eq!(warning.status, BudgetStatus::Warning);

    let over = absence_budget(days, 53);
    assert_eq!(over.available, -3);
    assert!(over.is_over_limit());

    let hundred = SchoolDays {
        total: 100,
        elapsed: 60,
        remaining: 40,
    };
    let exceeded = absence_budget(hundred, 30);
    assert_eq!(exceeded.limit, 25);
    assert_eq!(exceeded.available, -5);
    assert_eq!(exceeded.status, BudgetStatus::OverLimit);

    let none = absence_budget(SchoolDays::default(), 0);
    assert_eq!(none.limit, 0);
    assert_eq!(none.used_pct, None);
}

//! Handoff from the background sync task to the consuming side.
//!
//! Every login starts a new generation. Events carry the generation of the
//! task that produced them, and [`SyncInbox::recv`] drops any event from a
//! generation that has since been superseded, so an abandoned sequence can
//! never overwrite newer results.

use chrono::NaiveDate;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span};

use super::{AbsenceBundle, AuthenticatedUser, Collection, GradeBundle, SyncOrchestrator, SyncState};
use crate::services::PortalApi;

pub type Generation = u64;

#[derive(Debug)]
pub enum SyncEvent {
    Authenticated {
        generation: Generation,
        user: AuthenticatedUser,
    },
    AuthenticationFailed {
        generation: Generation,
        message: String,
    },
    Grades {
        generation: Generation,
        grades: Collection<GradeBundle>,
    },
    Absences {
        generation: Generation,
        absences: Collection<AbsenceBundle>,
    },
    /// Last event of a sequence.
    Finished {
        generation: Generation,
        state: SyncState,
    },
}

impl SyncEvent {
    pub fn generation(&self) -> Generation {
        match self {
            SyncEvent::Authenticated { generation, .. }
            | SyncEvent::AuthenticationFailed { generation, .. }
            | SyncEvent::Grades { generation, .. }
            | SyncEvent::Absences { generation, .. }
            | SyncEvent::Finished { generation, .. } => *generation,
        }
    }

    /// True for the event after which a sequence sends nothing more.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SyncEvent::AuthenticationFailed { .. } | SyncEvent::Finished { .. }
        )
    }
}

/// Receiving end owned by the consumer.
///
/// Each [`start`](SyncInbox::start) opens a fresh channel whose only sender
/// lives in the background task, so the channel closes when that task ends,
/// whether it finished, panicked or was aborted.
pub struct SyncInbox {
    capacity: usize,
    rx: Option<mpsc::Receiver<SyncEvent>>,
    current: Arc<AtomicU64>,
}

impl SyncInbox {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            rx: None,
            current: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn current_generation(&self) -> Generation {
        self.current.load(Ordering::SeqCst)
    }

    /// Marks everything in flight as stale, e.g. on logout.
    pub fn invalidate(&self) -> Generation {
        self.current.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Starts a login-and-sync sequence in the background.
    ///
    /// The task authenticates, then fetches grades, then absences, sending one
    /// event per step. It hands the orchestrator back when done so the caller
    /// can keep using the session.
    pub fn start<P>(
        &mut self,
        orchestrator: SyncOrchestrator<P>,
        username: String,
        password: String,
        today: NaiveDate,
    ) -> JoinHandle<SyncOrchestrator<P>>
    where
        P: PortalApi + 'static,
    {
        let generation = self.invalidate();
        let (tx, rx) = mpsc::channel(self.capacity);
        self.rx = Some(rx);
        let span = info_span!("sync_sequence", generation, username = %username);

        tokio::spawn(
            run_sequence(orchestrator, tx, generation, username, password, today).instrument(span),
        )
    }

    /// Next event of the current generation. Stale events are dropped.
    ///
    /// `None` once the running sequence has ended and its events are drained,
    /// or when nothing was started.
    pub async fn recv(&mut self) -> Option<SyncEvent> {
        let rx = self.rx.as_mut()?;
        loop {
            let event = rx.recv().await?;
            let current = self.current.load(Ordering::SeqCst);
            if event.generation() == current {
                return Some(event);
            }
            debug!(
                event_generation = event.generation(),
                current, "Dropping stale sync event"
            );
        }
    }
}

async fn run_sequence<P: PortalApi>(
    mut orchestrator: SyncOrchestrator<P>,
    tx: mpsc::Sender<SyncEvent>,
    generation: Generation,
    username: String,
    password: String,
    today: NaiveDate,
) -> SyncOrchestrator<P> {
    let user = match orchestrator.authenticate(&username, &password).await {
        Ok(user) => user,
        Err(e) => {
            send(&tx, SyncEvent::AuthenticationFailed {
                generation,
                message: e.to_string(),
            })
            .await;
            return orchestrator;
        }
    };
    send(&tx, SyncEvent::Authenticated { generation, user }).await;

    // The session is present right after a successful login.
    let grades = orchestrator
        .fetch_grades()
        .await
        .unwrap_or(Collection::NoData);
    let grades_ready = grades.is_ready();
    send(&tx, SyncEvent::Grades { generation, grades }).await;

    let absences = orchestrator
        .fetch_absences(today)
        .await
        .unwrap_or(Collection::NoData);
    let absences_ready = absences.is_ready();
    send(&tx, SyncEvent::Absences { generation, absences }).await;

    let state = orchestrator.settle(grades_ready, absences_ready);
    info!(?state, "Sync sequence finished");
    send(&tx, SyncEvent::Finished { generation, state }).await;

    orchestrator
}

async fn send(tx: &mpsc::Sender<SyncEvent>, event: SyncEvent) {
    if tx.send(event).await.is_err() {
        debug!("Inbox dropped, event discarded");
    }
}

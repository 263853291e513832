use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use super::{
    AbsenceBundle, Collection, GradeBundle, RetryPolicy, SyncReport, absence_bundle, grade_bundle,
};
use crate::error::SyncError;
use crate::services::{PortalApi, PortalSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SyncState {
    Unauthenticated,
    Authenticating,
    Authenticated,
    Fetching,
    Ready,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    pub username: String,
    /// Name from the student profile, or the username when the profile is unavailable.
    pub display_name: String,
}

/// Owns one portal session and drives it through login and fetches.
///
/// ```text
/// Unauthenticated -> Authenticating -> Authenticated -> Fetching -> Ready
///                          |                               |
///                          +------------> Failed <---------+
/// ```
pub struct SyncOrchestrator<P: PortalApi> {
    portal: P,
    session: Option<P::Session>,
    state: SyncState,
    policy: RetryPolicy,
}

impl<P: PortalApi> SyncOrchestrator<P> {
    pub fn new(portal: P, policy: RetryPolicy) -> Self {
        Self {
            portal,
            session: None,
            state: SyncState::Unauthenticated,
            policy,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn session(&self) -> Option<&P::Session> {
        self.session.as_ref()
    }

    /// Logs in exactly once; a failure is never retried.
    ///
    /// On success the previous session, if any, is replaced. The caller may
    /// persist the credentials for auto-login.
    #[tracing::instrument(skip_all, fields(username = %username))]
    pub async fn authenticate(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<AuthenticatedUser, SyncError> {
        self.state = SyncState::Authenticating;
        self.session = None;

        let session = match self.portal.authenticate(username, password).await {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Login failed");
                self.state = SyncState::Failed;
                return Err(SyncError::Authentication(e));
            }
        };

        let display_name = match session.fetch_profile().await {
            Ok(profile) if !profile.display_name.trim().is_empty() => profile.display_name,
            Ok(_) => username.to_string(),
            Err(e) => {
                warn!(error = %e, "Profile unavailable, using username");
                username.to_string()
            }
        };

        self.session = Some(session);
        self.state = SyncState::Authenticated;
        info!(display_name = %display_name, "Logged in");

        Ok(AuthenticatedUser {
            username: username.to_string(),
            display_name,
        })
    }

    pub async fn fetch_grades(&mut self) -> Result<Collection<GradeBundle>, SyncError> {
        let session = self.session.as_ref().ok_or(SyncError::NotAuthenticated)?;
        self.state = SyncState::Fetching;
        Ok(grade_bundle(session, &self.policy).await)
    }

    pub async fn fetch_absences(
        &mut self,
        today: NaiveDate,
    ) -> Result<Collection<AbsenceBundle>, SyncError> {
        let session = self.session.as_ref().ok_or(SyncError::NotAuthenticated)?;
        self.state = SyncState::Fetching;
        Ok(absence_bundle(session, &self.policy, today).await)
    }

    /// Settles the state after both collections have been attempted.
    /// The cycle fails only when neither produced data.
    pub fn settle(&mut self, grades_ready: bool, absences_ready: bool) -> SyncState {
        self.state = if grades_ready || absences_ready {
            SyncState::Ready
        } else {
            SyncState::Failed
        };
        self.state
    }

    /// Grades then absences, as one cycle.
    pub async fn sync(&mut self, today: NaiveDate) -> Result<SyncReport, SyncError> {
        let grades = self.fetch_grades().await?;
        let absences = self.fetch_absences(today).await?;
        self.settle(grades.is_ready(), absences.is_ready());
        Ok(SyncReport { grades, absences })
    }

    /// Drops the session.
    pub fn logout(&mut self) {
        self.session = None;
        self.state = SyncState::Unauthenticated;
    }
}

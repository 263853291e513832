//! Traits for talking to a school-records portal.

use crate::error::PortalError;
use crate::records::RawRecord;

/// What the portal knows about the logged-in student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub display_name: String,
}

/// Entry point to a portal: turns credentials into a [`PortalSession`].
#[async_trait::async_trait]
pub trait PortalApi: Send + Sync {
    type Session: PortalSession + 'static;

    /// Logs in once. Implementations must not retry on their own.
    async fn authenticate(&self, username: &str, password: &str)
    -> Result<Self::Session, PortalError>;
}

/// An authenticated session. Records come back raw; normalization is the caller's job.
#[async_trait::async_trait]
pub trait PortalSession: Send + Sync {
    async fn fetch_grades(&self) -> Result<Vec<RawRecord>, PortalError>;

    /// An empty list means the student has no absences.
    async fn fetch_absences(&self) -> Result<Vec<RawRecord>, PortalError>;

    async fn fetch_profile(&self) -> Result<Profile, PortalError>;
}

//! Error types at the library seams.

/// Failure talking to the portal.
#[derive(thiserror::Error, Debug)]
pub enum PortalError {
    /// Bad credentials, or the portal rejected the session.
    #[error("authentication rejected: {0}")]
    Authentication(String),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("portal returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl PortalError {
    /// Authentication failures are never retried.
    pub fn is_auth(&self) -> bool {
        matches!(self, PortalError::Authentication(_))
    }
}

/// Failure surfaced by the sync orchestrator.
#[derive(thiserror::Error, Debug)]
pub enum SyncError {
    #[error("login failed: {0}")]
    Authentication(#[source] PortalError),
    #[error("no authenticated session")]
    NotAuthenticated,
}

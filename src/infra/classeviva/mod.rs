//! HTTP adapter for the Classeviva REST API.
//!
//! Implements [`PortalApi`](crate::services::PortalApi). Login failures with
//! 401/403/422 are reported as authentication errors; everything else is
//! transient from the orchestrator's point of view.

mod client;

pub use client::{ClassevivaPortal, ClassevivaSession};

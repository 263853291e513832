pub mod portal_api;

pub use portal_api::{PortalApi, PortalSession, Profile};

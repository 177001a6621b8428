//! Client for the upstream job-search GraphQL API.
//!
//! One POST per target location. Failures come back as [`ClientError`], which
//! the engine classifies into auth-class (cool-down trigger) and
//! location-local failures via [`ClientError::is_auth_failure`].

pub mod client;
pub mod error;
mod source;
pub mod types;

pub use client::{ClientSettings, JobSearchClient};
pub use error::ClientError;
pub use source::JobSource;

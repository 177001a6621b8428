use std::future::Future;

use jobscout_core::{JobCard, TargetLocation};

use crate::error::ClientError;

/// Anything that can list job cards for one target location.
///
/// Implemented by [`crate::JobSearchClient`] for the real upstream and by
/// in-memory fakes in tests.
pub trait JobSource: Send + Sync {
    fn search(
        &self,
        credential: &str,
        location: &TargetLocation,
    ) -> impl Future<Output = Result<Vec<JobCard>, ClientError>> + Send;
}

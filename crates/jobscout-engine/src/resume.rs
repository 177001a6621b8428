//! Periodic resume check, run independently of the sweep loop.

use chrono::Utc;

use crate::cooldown::ResumeReason;
use crate::credential::Rotation;
use crate::state::EngineState;

/// Picks up a rotated credential from the credential file (when one is
/// configured) and ends the cool-down episode if it is eligible.
pub async fn run_resume_check(state: &EngineState) -> Option<ResumeReason> {
    if let Some(path) = state.settings().credential_file.as_deref() {
        match state.credential().refresh_from_file(path).await {
            Ok(Rotation::Rotated(fingerprint)) => {
                tracing::info!(%fingerprint, path = %path.display(), "credential: picked up from file");
            }
            Ok(Rotation::Unchanged) => {}
            Err(e) => tracing::warn!(error = %e, "credential: failed to read credential file"),
        }
    }
    state.check_resume(Utc::now()).await
}

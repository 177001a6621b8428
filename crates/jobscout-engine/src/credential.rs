//! Holder for the single externally supplied bearer credential.
//!
//! The engine never mints credentials. It only notices that a new one has
//! arrived, by comparing SHA-256 fingerprints, and attaches the current one
//! to outbound requests.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use crate::error::EngineError;

/// An opaque bearer credential. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(Arc<str>);

impl Credential {
    /// The raw secret, for attaching to an outbound request only.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.0)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Credential").field(&"[redacted]").finish()
    }
}

/// One-way SHA-256 digest of a credential, hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    #[must_use]
    pub fn of(secret: &str) -> Self {
        Self(format!("{:x}", Sha256::digest(secret.as_bytes())))
    }

    /// Leading 12 hex characters; enough to tell credentials apart in logs.
    #[must_use]
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.short())
    }
}

#[derive(Debug, Clone)]
struct CredentialState {
    credential: Credential,
    fingerprint: Fingerprint,
    last_rotated_at: DateTime<Utc>,
}

/// Result of offering a credential to the holder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rotation {
    /// Same secret as the one already held.
    Unchanged,
    /// The held credential was replaced (or set for the first time).
    Rotated(Fingerprint),
}

/// Read-only view of the holder for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialSummary {
    pub present: bool,
    pub fingerprint: Option<String>,
    pub last_rotated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub struct CredentialHolder {
    inner: RwLock<Option<CredentialState>>,
}

impl CredentialHolder {
    /// Creates a holder, seeded with `initial` when it is non-blank.
    #[must_use]
    pub fn new(initial: Option<&str>) -> Self {
        let state = initial
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|secret| build_state(secret, Utc::now()));
        Self {
            inner: RwLock::new(state),
        }
    }

    /// The credential to attach to outbound requests.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MissingCredential`] if none has been supplied.
    pub async fn current(&self) -> Result<Credential, EngineError> {
        self.inner
            .read()
            .await
            .as_ref()
            .map(|s| s.credential.clone())
            .ok_or(EngineError::MissingCredential)
    }

    pub async fn fingerprint(&self) -> Option<Fingerprint> {
        self.inner.read().await.as_ref().map(|s| s.fingerprint.clone())
    }

    /// Returns `true` when a credential is held and it differs from the one
    /// whose fingerprint was `since`. An empty holder never counts as changed.
    pub async fn has_changed_since(&self, since: Option<&Fingerprint>) -> bool {
        self.inner
            .read()
            .await
            .as_ref()
            .is_some_and(|s| Some(&s.fingerprint) != since)
    }

    /// Offers a new secret. Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidCredential`] if the secret is blank.
    pub async fn replace(&self, secret: &str) -> Result<Rotation, EngineError> {
        let secret = secret.trim();
        if secret.is_empty() {
            return Err(EngineError::InvalidCredential(
                "credential must be non-empty".to_string(),
            ));
        }

        let fingerprint = Fingerprint::of(secret);
        let mut guard = self.inner.write().await;
        if guard.as_ref().is_some_and(|s| s.fingerprint == fingerprint) {
            return Ok(Rotation::Unchanged);
        }

        tracing::info!(fingerprint = %fingerprint, "credential: rotated");
        *guard = Some(build_state(secret, Utc::now()));
        Ok(Rotation::Rotated(fingerprint))
    }

    /// Re-reads the credential file and rotates if its content changed.
    ///
    /// A missing or blank file leaves the held credential untouched.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Persistence`] if the file exists but cannot be read.
    pub async fn refresh_from_file(&self, path: &Path) -> Result<Rotation, EngineError> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Rotation::Unchanged),
            Err(e) => {
                return Err(EngineError::Persistence {
                    path: path.display().to_string(),
                    source: e,
                })
            }
        };

        if content.trim().is_empty() {
            return Ok(Rotation::Unchanged);
        }
        self.replace(&content).await
    }

    pub async fn summary(&self) -> CredentialSummary {
        let guard = self.inner.read().await;
        CredentialSummary {
            present: guard.is_some(),
            fingerprint: guard.as_ref().map(|s| s.fingerprint.short().to_owned()),
            last_rotated_at: guard.as_ref().map(|s| s.last_rotated_at),
        }
    }
}

fn build_state(secret: &str, now: DateTime<Utc>) -> CredentialState {
    let credential = Credential(Arc::from(secret));
    CredentialState {
        fingerprint: credential.fingerprint(),
        credential,
        last_rotated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[tokio::test]
    async fn empty_holder_reports_missing_credential() {
        let holder = CredentialHolder::new(None);
        assert!(matches!(
            holder.current().await,
            Err(EngineError::MissingCredential)
        ));
        assert!(holder.fingerprint().await.is_none());
    }

    #[tokio::test]
    async fn blank_initial_value_is_ignored() {
        let holder = CredentialHolder::new(Some("   "));
        assert!(holder.current().await.is_err());
    }

    #[tokio::test]
    async fn fingerprint_is_stable_and_not_the_secret() {
        let holder = CredentialHolder::new(Some("Status|unauthenticated|Session|abc"));
        let fp = holder.fingerprint().await.unwrap();
        assert_eq!(fp, Fingerprint::of("Status|unauthenticated|Session|abc"));
        assert_eq!(fp.as_str().len(), 64);
        assert!(!fp.as_str().contains("Session"));
        assert_eq!(fp.short().len(), 12);
    }

    #[tokio::test]
    async fn replace_detects_change() {
        let holder = CredentialHolder::new(Some("first"));
        let before = holder.fingerprint().await;

        assert_eq!(holder.replace("first").await.unwrap(), Rotation::Unchanged);
        assert!(!holder.has_changed_since(before.as_ref()).await);

        let rotation = holder.replace("second").await.unwrap();
        assert_eq!(rotation, Rotation::Rotated(Fingerprint::of("second")));
        assert!(holder.has_changed_since(before.as_ref()).await);
        assert_eq!(holder.current().await.unwrap().expose(), "second");
    }

    #[tokio::test]
    async fn first_credential_counts_as_change_from_none() {
        let holder = CredentialHolder::new(None);
        assert!(!holder.has_changed_since(None).await);
        holder.replace("fresh").await.unwrap();
        assert!(holder.has_changed_since(None).await);
    }

    #[tokio::test]
    async fn empty_holder_is_not_a_change_from_a_captured_fingerprint() {
        let holder = CredentialHolder::new(None);
        assert!(!holder.has_changed_since(Some(&Fingerprint::of("old"))).await);
    }

    #[tokio::test]
    async fn replace_rejects_blank_secret() {
        let holder = CredentialHolder::new(Some("kept"));
        assert!(matches!(
            holder.replace("  \n").await,
            Err(EngineError::InvalidCredential(_))
        ));
        assert_eq!(holder.current().await.unwrap().expose(), "kept");
    }

    #[tokio::test]
    async fn refresh_from_file_rotates_on_new_content() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "from-file-token").unwrap();

        let holder = CredentialHolder::new(Some("env-token"));
        let rotation = holder.refresh_from_file(file.path()).await.unwrap();
        assert_eq!(rotation, Rotation::Rotated(Fingerprint::of("from-file-token")));
        assert_eq!(
            holder.refresh_from_file(file.path()).await.unwrap(),
            Rotation::Unchanged
        );
    }

    #[tokio::test]
    async fn refresh_from_missing_file_keeps_credential() {
        let holder = CredentialHolder::new(Some("env-token"));
        let rotation = holder
            .refresh_from_file(Path::new("/nonexistent/jobscout-token"))
            .await
            .unwrap();
        assert_eq!(rotation, Rotation::Unchanged);
        assert_eq!(holder.current().await.unwrap().expose(), "env-token");
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let credential = Credential(Arc::from("very-secret"));
        assert!(!format!("{credential:?}").contains("very-secret"));
    }
}

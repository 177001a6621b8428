//! Whole-document JSON persistence under the data directory.
//!
//! Every save writes a sibling temp file, syncs it and renames it over the
//! target, so a concurrent reader sees either the old or the new document.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::EngineError;

/// The state documents the engine owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Document {
    Jobs,
    NewJobsLog,
    RequestLog,
    RunClock,
    Cooldown,
}

impl Document {
    #[must_use]
    pub fn file_name(self) -> &'static str {
        match self {
            Document::Jobs => "jobs_store.json",
            Document::NewJobsLog => "new_jobs_log.json",
            Document::RequestLog => "request_log.json",
            Document::RunClock => "run_clock.json",
            Document::Cooldown => "cooldown.json",
        }
    }
}

#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn path_of(&self, doc: Document) -> PathBuf {
        self.dir.join(doc.file_name())
    }

    /// Reads a document. A missing file yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Persistence`] on I/O failure and
    /// [`EngineError::Serialize`] if the content is not the expected JSON.
    pub async fn load<T: DeserializeOwned>(&self, doc: Document) -> Result<Option<T>, EngineError> {
        let path = self.path_of(doc);
        let bytes = match fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&path, e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| EngineError::Serialize {
                path: path.display().to_string(),
                source,
            })
    }

    /// Atomically replaces a document.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Persistence`] if the directory, temp file or
    /// rename fails, and [`EngineError::Serialize`] if `value` cannot be encoded.
    pub async fn save<T: Serialize + ?Sized>(
        &self,
        doc: Document,
        value: &T,
    ) -> Result<(), EngineError> {
        let path = self.path_of(doc);
        let content =
            serde_json::to_vec_pretty(value).map_err(|source| EngineError::Serialize {
                path: path.display().to_string(),
                source,
            })?;

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_error(&self.dir, e))?;

        let temp_path = path.with_extension("json.tmp");
        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| io_error(&temp_path, e))?;
        file.write_all(&content)
            .await
            .map_err(|e| io_error(&temp_path, e))?;
        file.sync_all()
            .await
            .map_err(|e| io_error(&temp_path, e))?;
        drop(file);

        fs::rename(&temp_path, &path)
            .await
            .map_err(|e| io_error(&path, e))?;
        Ok(())
    }
}

fn io_error(path: &Path, source: std::io::Error) -> EngineError {
    EngineError::Persistence {
        path: path.display().to_string(),
        source,
    }
}

use thiserror::Error;

/// Errors surfaced by the discovery engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No credential has been supplied yet.
    #[error("no credential configured")]
    MissingCredential,

    /// A supplied credential was rejected before use (e.g. blank).
    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    /// A state document could not be read or durably written.
    #[error("persistence error for {path}: {source}")]
    Persistence {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A state document could not be encoded or decoded.
    #[error("state document {path} is not valid JSON: {source}")]
    Serialize {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

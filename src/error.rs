use std::path::PathBuf;

use thiserror::Error;

/// Main error type for indexing runs
#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required setting: {0}")]
    MissingSetting(&'static str),

    #[error("Unknown {kind} plugin: {name}")]
    UnknownPlugin { kind: &'static str, name: String },

    #[error("Unknown analyzer: {0}")]
    UnknownAnalyzer(String),

    #[error("Failed to create index directory {path}: {source}")]
    IndexDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Index engine error: {0}")]
    Engine(#[from] tantivy::TantivyError),

    #[error("Writer session is closed")]
    SessionClosed,

    #[error("Document rejected: {0}")]
    Document(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("Record buffer closed: all consumers have stopped")]
    BufferClosed,

    #[error("Settings parse error: {0}")]
    SettingsParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for indexer operations
pub type Result<T> = std::result::Result<T, IndexerError>;

impl IndexerError {
    /// Whether this error aborts the whole run.
    ///
    /// Only per-document rejections are absorbed by consumers; everything
    /// else ends the run before (or instead of) the next lifecycle step.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, IndexerError::Document(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IndexerError::UnknownPlugin {
            kind: "producer",
            name: "csv".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown producer plugin: csv");

        let err = IndexerError::MissingSetting("indexer.indexdir");
        assert_eq!(err.to_string(), "Missing required setting: indexer.indexdir");
    }

    #[test]
    fn test_fatal_errors() {
        assert!(!IndexerError::Document("bad".to_string()).is_fatal());
        assert!(IndexerError::SessionClosed.is_fatal());
        assert!(IndexerError::Config("x".to_string()).is_fatal());
        assert!(IndexerError::BufferClosed.is_fatal());
    }
}

use std::path::PathBuf;
use thiserror::Error;

/// Fatal error for npmgraph operations.
///
/// Only setup failures, unreadable snapshots and sink failures are fatal.
/// Problems with individual records are reported as [`crate::graph::Issue`]s
/// and never surface here.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to open snapshot at {path}: {source}")]
    SnapshotOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Snapshot is not valid JSON{}: {source}", after_context(.after.as_deref()))]
    SnapshotParse {
        /// Id of the last document read successfully before the failure.
        after: Option<String>,
        #[source]
        source: serde_json::Error,
    },

    #[error("Snapshot has an unexpected shape{}: {source}", after_context(.after.as_deref()))]
    SnapshotShape {
        /// Id of the last document read successfully before the failure.
        after: Option<String>,
        #[source]
        source: serde_json::Error,
    },

    #[error("Snapshot already exists at {path} (pass --force to replace it)")]
    SnapshotExists { path: PathBuf },

    #[error("Output already exists at {path}; remove previous output before running again")]
    OutputExists { path: PathBuf },

    #[error("Failed to write {stream} records: {source}")]
    SinkWrite {
        stream: &'static str,
        #[source]
        source: csv::Error,
    },

    #[error("Snapshot download failed: {0}")]
    Download(String),

    #[error("{0}")]
    Other(String),
}

fn after_context(after: Option<&str>) -> String {
    after.map_or_else(String::new, |id| format!(" after package '{id}'"))
}

impl Error {
    #[must_use]
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Download(format!("Request timed out: {e}"))
        } else if e.is_connect() {
            Self::Download(format!("Connection failed: {e}"))
        } else {
            Self::Download(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_names_last_package() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = Error::SnapshotParse {
            after: Some("left-pad".to_string()),
            source,
        };
        let msg = err.to_string();
        assert!(msg.contains("after package 'left-pad'"), "{msg}");
    }

    #[test]
    fn test_parse_error_without_context() {
        let source = serde_json::from_str::<serde_json::Value>("[").unwrap_err();
        let err = Error::SnapshotParse {
            after: None,
            source,
        };
        assert!(err.to_string().starts_with("Snapshot is not valid JSON: "));
    }

    #[test]
    fn test_shape_error_names_last_package() {
        let source = serde_json::from_str::<u64>("\"x\"").unwrap_err();
        let err = Error::SnapshotShape {
            after: Some("is-odd".to_string()),
            source,
        };
        let msg = err.to_string();
        assert!(msg.starts_with("Snapshot has an unexpected shape after package 'is-odd': "), "{msg}");
    }

    #[test]
    fn test_output_exists_mentions_path() {
        let err = Error::OutputExists {
            path: PathBuf::from("data/nodes/package.csv"),
        };
        assert!(err.to_string().contains("data/nodes/package.csv"));
    }
}

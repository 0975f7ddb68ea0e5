use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default CouchDB replication endpoint for the full npm registry.
pub const DEFAULT_REPLICATE_URL: &str = "https://replicate.npmjs.com/_all_docs?include_docs=true";

/// Environment variable to override the replication endpoint.
pub const REPLICATE_URL_ENV: &str = "NPMGRAPH_REPLICATE_URL";

/// File name of the snapshot inside the data directory.
pub const SNAPSHOT_FILE_NAME: &str = "all_docs.json";

/// Default number of documents buffered between the parser thread and the builder.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Runtime configuration for npmgraph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Current working directory.
    pub cwd: PathBuf,

    /// Directory holding the snapshot and, by default, the output.
    pub data_dir: PathBuf,

    /// Explicit snapshot path (defaults to `<data_dir>/all_docs.json`).
    pub snapshot: Option<PathBuf>,

    /// Explicit output directory (defaults to `<data_dir>`).
    pub output_dir: Option<PathBuf>,

    /// Replication endpoint the snapshot is downloaded from.
    pub replicate_url: String,

    /// Documents buffered between parsing and graph building.
    pub channel_capacity: usize,

    /// Whether to emit JSON logs.
    pub json_logs: bool,

    /// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
    pub verbosity: u8,
}

impl Default for Config {
    fn default() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::new(cwd)
    }
}

impl Config {
    /// Create a new config rooted at the given working directory.
    #[must_use]
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            data_dir: cwd.join("data"),
            cwd,
            snapshot: None,
            output_dir: None,
            replicate_url: std::env::var(REPLICATE_URL_ENV)
                .unwrap_or_else(|_| DEFAULT_REPLICATE_URL.to_string()),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            json_logs: false,
            verbosity: 0,
        }
    }

    /// Set the data directory. Relative paths resolve against `cwd`.
    #[must_use]
    pub fn with_data_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.data_dir = self.cwd.join(dir);
        self
    }

    /// Set an explicit snapshot path. Relative paths resolve against `cwd`.
    #[must_use]
    pub fn with_snapshot(mut self, path: impl AsRef<Path>) -> Self {
        self.snapshot = Some(self.cwd.join(path));
        self
    }

    /// Set an explicit output directory. Relative paths resolve against `cwd`.
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.output_dir = Some(self.cwd.join(dir));
        self
    }

    /// Set the replication endpoint.
    #[must_use]
    pub fn with_replicate_url(mut self, url: impl Into<String>) -> Self {
        self.replicate_url = url.into();
        self
    }

    /// Set the parser channel capacity (at least 1).
    #[must_use]
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Set verbosity level.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set JSON log output.
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }

    /// Path of the registry snapshot.
    #[must_use]
    pub fn snapshot_path(&self) -> PathBuf {
        self.snapshot
            .clone()
            .unwrap_or_else(|| self.data_dir.join(SNAPSHOT_FILE_NAME))
    }

    /// Root of the CSV output (`nodes/` and `relationships/` live below it).
    #[must_use]
    pub fn output_path(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let config = Config::new(PathBuf::from("/work"));
        assert_eq!(config.data_dir, PathBuf::from("/work/data"));
        assert_eq!(
            config.snapshot_path(),
            PathBuf::from("/work/data/all_docs.json")
        );
        assert_eq!(config.output_path(), PathBuf::from("/work/data"));
        assert_eq!(config.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
    }

    #[test]
    fn test_relative_overrides_resolve_against_cwd() {
        let config = Config::new(PathBuf::from("/work"))
            .with_data_dir("snap")
            .with_output_dir("out");
        assert_eq!(
            config.snapshot_path(),
            PathBuf::from("/work/snap/all_docs.json")
        );
        assert_eq!(config.output_path(), PathBuf::from("/work/out"));
    }

    #[test]
    fn test_absolute_snapshot_override() {
        let config = Config::new(PathBuf::from("/work")).with_snapshot("/tmp/docs.json.gz");
        assert_eq!(config.snapshot_path(), PathBuf::from("/tmp/docs.json.gz"));
    }

    #[test]
    fn test_channel_capacity_never_zero() {
        let config = Config::new(PathBuf::from("/work")).with_channel_capacity(0);
        assert_eq!(config.channel_capacity, 1);
    }
}

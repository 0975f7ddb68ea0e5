//! Snapshot download from the registry's replication endpoint.

use crate::config::Config;
use crate::error::Error;
use crate::pipeline::{Phase, Progress};
use futures::StreamExt;
use npmgraph_util::fs::{commit_partial, ensure_parent_dir, partial_path};
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use url::Url;

/// Downloads full registry snapshots.
#[derive(Debug, Clone)]
pub struct SnapshotClient {
    url: Url,
    http: Client,
}

impl SnapshotClient {
    /// Create a client for the given replication endpoint.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be created.
    pub fn new(url: &str) -> Result<Self, Error> {
        let url = Url::parse(url)
            .map_err(|e| Error::Download(format!("Invalid replicate URL '{url}': {e}")))?;

        // No overall timeout: a full snapshot takes a long time to stream.
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("npmgraph/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Download(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { url, http })
    }

    /// Create a client for the endpoint in `config`.
    ///
    /// # Errors
    /// Returns an error if the client cannot be created.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        Self::new(&config.replicate_url)
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Stream the snapshot to `dest`, returning the number of bytes written.
    ///
    /// The body goes to `<dest>.partial` first and is renamed into place only
    /// once complete.
    ///
    /// # Errors
    /// Returns [`Error::SnapshotExists`] if `dest` exists and `force` is false,
    /// or an error if the request or a write fails.
    pub async fn download(
        &self,
        dest: &Path,
        force: bool,
        progress: &dyn Progress,
    ) -> Result<u64, Error> {
        if dest.exists() && !force {
            return Err(Error::SnapshotExists {
                path: dest.to_path_buf(),
            });
        }
        ensure_parent_dir(dest)?;

        tracing::info!(url = %self.url, dest = %dest.display(), "Downloading snapshot");
        let response = self.http.get(self.url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(Error::Download(format!(
                "Replicate endpoint returned status {} for '{}'",
                response.status(),
                self.url
            )));
        }

        progress.start(Phase::Download, response.content_length());

        let partial = partial_path(dest);
        let mut file = tokio::fs::File::create(&partial).await?;
        let mut body = response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
            progress.advance(Phase::Download, chunk.len() as u64);
        }
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        commit_partial(&partial, dest)?;
        progress.finish(Phase::Download);
        tracing::info!(bytes = written, dest = %dest.display(), "Snapshot downloaded");
        Ok(written)
    }
}

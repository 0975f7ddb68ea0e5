use crate::progress::BarProgress;
use miette::{IntoDiagnostic, Result};
use npmgraph_core::{Config, SnapshotClient};
use std::path::PathBuf;

/// Download the registry snapshot into the data directory.
///
/// `url` overrides the configured replicate endpoint.
pub fn run(config: &Config, url: Option<&str>, force: bool, json: bool) -> Result<()> {
    let (dest, bytes) = fetch(config, url, force, json)?;

    if json {
        let report = serde_json::json!({
            "snapshot": dest.display().to_string(),
            "bytes": bytes,
        });
        println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
    } else {
        println!("Downloaded {bytes} bytes to {}", dest.display());
    }
    Ok(())
}

/// Download without printing a report. Returns the snapshot path and size.
pub fn fetch(
    config: &Config,
    url: Option<&str>,
    force: bool,
    json: bool,
) -> Result<(PathBuf, u64)> {
    let client = match url {
        Some(url) => SnapshotClient::new(url),
        None => SnapshotClient::from_config(config),
    }
    .into_diagnostic()?;
    let dest = config.snapshot_path();
    let progress = BarProgress::new(json);

    let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
    let bytes = runtime
        .block_on(client.download(&dest, force, &progress))
        .into_diagnostic()?;
    Ok((dest, bytes))
}

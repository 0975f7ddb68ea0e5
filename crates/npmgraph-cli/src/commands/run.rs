use miette::Result;
use npmgraph_core::Config;

/// Download the snapshot if it is missing, then build.
pub fn run(config: &Config, json: bool) -> Result<()> {
    let snapshot = config.snapshot_path();
    if snapshot.exists() {
        tracing::info!(snapshot = %snapshot.display(), "Using existing snapshot");
    } else {
        let (_, bytes) = super::download::fetch(config, None, false, json)?;
        tracing::info!(bytes, "Snapshot fetched");
    }
    super::build::run(config, json)
}

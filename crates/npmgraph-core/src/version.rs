use std::fmt::Write;

/// The current version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version of the emitted CSV layout (file names and headers).
/// Bump this when changing columns that would break an import script.
pub const OUTPUT_SCHEMA_VERSION: u32 = 1;

/// Returns a formatted version string including build metadata if available.
#[must_use]
pub fn version_string() -> String {
    let mut s = format!("npmgraph {VERSION}");

    if let Some(hash) = option_env!("NPMGRAPH_BUILD_GIT_HASH") {
        let _ = write!(s, " ({hash})");
    }

    s
}

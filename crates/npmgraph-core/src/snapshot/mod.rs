//! Registry snapshots: downloading them, streaming their rows, and reading
//! the package documents inside.

pub mod document;
mod download;
mod stream;

pub use document::{DocumentError, PackageDocument};
pub use download::SnapshotClient;
pub use stream::{DocumentStream, Row};

//! Identifiers and node payloads shared by the builder, resolver and sinks.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of one published version: the package name and the raw version
/// string, joined as `name@version`.
///
/// The split point is stored so scoped names (`@types/node@20.0.0`) can be
/// taken apart again without guessing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VersionId {
    key: Box<str>,
    name_len: usize,
}

impl VersionId {
    #[must_use]
    pub fn new(package: &str, version: &str) -> Self {
        Self {
            key: format!("{package}@{version}").into_boxed_str(),
            name_len: package.len(),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// Package half of the id.
    #[must_use]
    pub fn package(&self) -> &str {
        &self.key[..self.name_len]
    }

    /// Version half of the id.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.key[self.name_len + 1..]
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// Sequential identifier of a deduplicated `(dependency, range)` requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequirementId(pub u64);

impl fmt::Display for RequirementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Which dependency map an edge came from. Stored on the `DependsOn` edge,
/// never on the requirement node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    Normal,
    Dev,
    Peer,
}

impl DependencyKind {
    pub const ALL: [DependencyKind; 3] = [Self::Normal, Self::Dev, Self::Peer];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Dev => "dev",
            Self::Peer => "peer",
        }
    }

    /// Field of a version manifest holding this kind of dependency.
    #[must_use]
    pub fn manifest_field(self) -> &'static str {
        match self {
            Self::Normal => "dependencies",
            Self::Dev => "devDependencies",
            Self::Peer => "peerDependencies",
        }
    }
}

/// Attributes of a Version node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionNode {
    pub id: VersionId,
    /// Version string as published, trimmed.
    pub version: String,
    pub timestamp: Option<DateTime<Utc>>,
    /// Normalized `https://host/owner/repo` URL, or empty when unrecognized.
    pub repository: String,
    pub file_count: Option<u64>,
    pub unpacked_size: Option<u64>,
    pub install_script: Option<String>,
    pub uninstall_script: Option<String>,
}

/// Render a timestamp the way the `datetime` import column expects it.
#[must_use]
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

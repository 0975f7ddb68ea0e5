//! Output side of the pipeline.
//!
//! The builder and resolver emit [`Record`]s; a [`GraphSink`] decides where
//! they go. Writes are synchronous, so a slow sink slows ingestion down.

mod csv;
mod memory;

pub use self::csv::CsvSink;
pub use memory::MemorySink;

use crate::error::Error;
use crate::graph::model::{format_timestamp, DependencyKind, RequirementId, VersionId, VersionNode};
use serde::Serialize;
use std::borrow::Cow;
use std::path::PathBuf;

/// One node or relationship file of the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Stream {
    Package,
    Version,
    VersionRequirement,
    User,
    VersionOf,
    DependsOn,
    RequirementOf,
    ResolvesTo,
    Maintains,
    NextVersion,
    DependsOnResolvesTo,
}

impl Stream {
    pub const ALL: [Stream; 11] = [
        Self::Package,
        Self::Version,
        Self::VersionRequirement,
        Self::User,
        Self::VersionOf,
        Self::DependsOn,
        Self::RequirementOf,
        Self::ResolvesTo,
        Self::Maintains,
        Self::NextVersion,
        Self::DependsOnResolvesTo,
    ];

    /// Position in [`Stream::ALL`].
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// File stem, also used as the stream's name in logs and summaries.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Package => "package",
            Self::Version => "version",
            Self::VersionRequirement => "versionRequirement",
            Self::User => "user",
            Self::VersionOf => "versionOf",
            Self::DependsOn => "dependsOn",
            Self::RequirementOf => "requirementOf",
            Self::ResolvesTo => "resolvesTo",
            Self::Maintains => "maintains",
            Self::NextVersion => "nextVersion",
            Self::DependsOnResolvesTo => "dependsOnResolvesTo",
        }
    }

    #[must_use]
    pub fn is_node(self) -> bool {
        matches!(
            self,
            Self::Package | Self::Version | Self::VersionRequirement | Self::User
        )
    }

    /// Location below the output directory: `nodes/<name>.csv` or
    /// `relationships/<name>.csv`.
    #[must_use]
    pub fn relative_path(self) -> PathBuf {
        let dir = if self.is_node() { "nodes" } else { "relationships" };
        PathBuf::from(dir).join(format!("{}.csv", self.name()))
    }

    /// Column headers in `neo4j-admin import` notation.
    #[must_use]
    pub fn header(self) -> &'static [&'static str] {
        match self {
            Self::Package => &["name:ID(Package)"],
            Self::Version => &[
                "id:ID(Version)",
                "version",
                "timestamp:datetime",
                "repository",
                "file_count:long",
                "unpacked_size:long",
                "install_script",
                "uninstall_script",
            ],
            Self::VersionRequirement => &["id:ID(VersionRequirement)", "requirement"],
            Self::User => &["username:ID(User)"],
            Self::VersionOf => &[":START_ID(Version)", ":END_ID(Package)"],
            Self::DependsOn => &[":START_ID(Version)", "type", ":END_ID(VersionRequirement)"],
            Self::RequirementOf => &[":START_ID(VersionRequirement)", ":END_ID(Package)"],
            Self::ResolvesTo => &[":START_ID(VersionRequirement)", ":END_ID(Version)"],
            Self::Maintains => &[":START_ID(User)", ":END_ID(Version)"],
            Self::NextVersion => &[":START_ID(Version)", "interval:long", ":END_ID(Version)"],
            Self::DependsOnResolvesTo => &[":START_ID(Version)", ":END_ID(Version)"],
        }
    }
}

/// A node or relationship ready to be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Record<'a> {
    Package {
        name: &'a str,
    },
    Version(&'a VersionNode),
    VersionRequirement {
        id: RequirementId,
        range: &'a str,
    },
    User {
        username: &'a str,
    },
    VersionOf {
        version: &'a VersionId,
        package: &'a str,
    },
    DependsOn {
        version: &'a VersionId,
        kind: DependencyKind,
        requirement: RequirementId,
    },
    RequirementOf {
        requirement: RequirementId,
        package: &'a str,
    },
    ResolvesTo {
        requirement: RequirementId,
        version: &'a VersionId,
    },
    Maintains {
        username: &'a str,
        version: &'a VersionId,
    },
    NextVersion {
        previous: &'a VersionId,
        interval_seconds: i64,
        next: &'a VersionId,
    },
    DependsOnResolvesTo {
        dependent: &'a VersionId,
        resolved: &'a VersionId,
    },
}

impl<'a> Record<'a> {
    #[must_use]
    pub fn stream(&self) -> Stream {
        match self {
            Self::Package { .. } => Stream::Package,
            Self::Version(_) => Stream::Version,
            Self::VersionRequirement { .. } => Stream::VersionRequirement,
            Self::User { .. } => Stream::User,
            Self::VersionOf { .. } => Stream::VersionOf,
            Self::DependsOn { .. } => Stream::DependsOn,
            Self::RequirementOf { .. } => Stream::RequirementOf,
            Self::ResolvesTo { .. } => Stream::ResolvesTo,
            Self::Maintains { .. } => Stream::Maintains,
            Self::NextVersion { .. } => Stream::NextVersion,
            Self::DependsOnResolvesTo { .. } => Stream::DependsOnResolvesTo,
        }
    }

    /// Column values in [`Stream::header`] order. Unset values are empty.
    #[must_use]
    pub fn fields(&self) -> Vec<Cow<'a, str>> {
        fn opt<T: ToString>(value: Option<T>) -> Cow<'static, str> {
            value.map_or(Cow::Borrowed(""), |v| Cow::Owned(v.to_string()))
        }

        match *self {
            Self::Package { name } => vec![name.into()],
            Self::Version(node) => vec![
                node.id.as_str().into(),
                node.version.as_str().into(),
                opt(node.timestamp.as_ref().map(format_timestamp)),
                node.repository.as_str().into(),
                opt(node.file_count),
                opt(node.unpacked_size),
                node.install_script.as_deref().unwrap_or_default().into(),
                node.uninstall_script.as_deref().unwrap_or_default().into(),
            ],
            Self::VersionRequirement { id, range } => vec![id.to_string().into(), range.into()],
            Self::User { username } => vec![username.into()],
            Self::VersionOf { version, package } => vec![version.as_str().into(), package.into()],
            Self::DependsOn {
                version,
                kind,
                requirement,
            } => vec![
                version.as_str().into(),
                kind.as_str().into(),
                requirement.to_string().into(),
            ],
            Self::RequirementOf {
                requirement,
                package,
            } => vec![requirement.to_string().into(), package.into()],
            Self::ResolvesTo {
                requirement,
                version,
            } => vec![requirement.to_string().into(), version.as_str().into()],
            Self::Maintains { username, version } => {
                vec![username.into(), version.as_str().into()]
            }
            Self::NextVersion {
                previous,
                interval_seconds,
                next,
            } => vec![
                previous.as_str().into(),
                interval_seconds.to_string().into(),
                next.as_str().into(),
            ],
            Self::DependsOnResolvesTo {
                dependent,
                resolved,
            } => vec![dependent.as_str().into(), resolved.as_str().into()],
        }
    }
}

/// Destination for graph records.
pub trait GraphSink {
    /// Write one record.
    fn write(&mut self, record: Record<'_>) -> Result<(), Error>;

    /// Flush and close every stream. Called once, after the last write.
    fn finish(&mut self) -> Result<(), Error>;
}

impl<S: GraphSink + ?Sized> GraphSink for &mut S {
    fn write(&mut self, record: Record<'_>) -> Result<(), Error> {
        (**self).write(record)
    }

    fn finish(&mut self) -> Result<(), Error> {
        (**self).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_every_stream_has_unique_path() {
        let mut paths: Vec<_> = Stream::ALL.iter().map(|s| s.relative_path()).collect();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), Stream::ALL.len());
        assert_eq!(
            Stream::VersionRequirement.relative_path(),
            PathBuf::from("nodes/versionRequirement.csv")
        );
        assert_eq!(
            Stream::NextVersion.relative_path(),
            PathBuf::from("relationships/nextVersion.csv")
        );
    }

    #[test]
    fn test_version_fields_match_header() {
        let node = VersionNode {
            id: VersionId::new("a", "1.0.0"),
            version: "1.0.0".to_string(),
            timestamp: Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()),
            repository: String::new(),
            file_count: Some(3),
            unpacked_size: None,
            install_script: Some("node-gyp rebuild".to_string()),
            uninstall_script: None,
        };
        let record = Record::Version(&node);
        let fields = record.fields();

        assert_eq!(fields.len(), Stream::Version.header().len());
        assert_eq!(
            fields,
            [
                "a@1.0.0",
                "1.0.0",
                "2020-01-01T00:00:00.000Z",
                "",
                "3",
                "",
                "node-gyp rebuild",
                ""
            ]
        );
    }

    #[test]
    fn test_edge_fields_match_header() {
        let from = VersionId::new("a", "1.0.0");
        let to = VersionId::new("a", "1.1.0");
        let records = [
            Record::DependsOn {
                version: &from,
                kind: DependencyKind::Dev,
                requirement: RequirementId(7),
            },
            Record::NextVersion {
                previous: &from,
                interval_seconds: 60,
                next: &to,
            },
            Record::DependsOnResolvesTo {
                dependent: &from,
                resolved: &to,
            },
        ];
        for record in records {
            assert_eq!(record.fields().len(), record.stream().header().len());
        }
        assert_eq!(records[0].fields(), ["a@1.0.0", "dev", "7"]);
        assert_eq!(records[1].fields(), ["a@1.0.0", "60", "a@1.1.0"]);
    }
}

//! Phase one: turn package documents into nodes and edges.
//!
//! The builder owns the name indexes, the version catalog and the requirement
//! registry while documents stream in. [`GraphBuilder::finish`] hands them
//! over as an immutable [`GraphSnapshot`] for the resolver.

use super::catalog::{CatalogSnapshot, CatalogVersion, VersionCatalog};
use super::index::NameIndex;
use super::issue::{codes, Issue, IssueLog};
use super::model::{DependencyKind, VersionId, VersionNode};
use super::repository::normalize_repository;
use super::requirements::{RequirementRegistry, Upsert};
use super::timeline::next_versions;
use crate::error::Error;
use crate::sink::{GraphSink, Record};
use crate::snapshot::document::{
    parse_timestamp, DependencyField, PackageDocument, RepositoryField, VersionManifest,
};
use serde::Serialize;
use serde_json::{Map, Value};

const INSTALL_HOOKS: [&str; 3] = ["preinstall", "install", "postinstall"];
const UNINSTALL_HOOKS: [&str; 3] = ["preuninstall", "uninstall", "postuninstall"];

/// Placeholder package name for documents without a usable `_id`.
const UNKNOWN_PACKAGE: &str = "<unknown>";

/// Counts collected while building.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    /// Documents handed to the builder, including skipped ones.
    pub documents: u64,
    pub packages: u64,
    pub versions: u64,
    pub users: u64,
    pub requirements: u64,
}

/// Streaming graph builder.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    packages: NameIndex,
    users: NameIndex,
    catalog: VersionCatalog,
    requirements: RequirementRegistry,
    issues: IssueLog,
    documents: u64,
    versions: u64,
}

impl GraphBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an issue found outside the builder (e.g. while reading rows).
    pub fn report(&mut self, issue: Issue) {
        self.issues.report(issue);
    }

    #[must_use]
    pub fn issues(&self) -> &IssueLog {
        &self.issues
    }

    #[must_use]
    pub fn stats(&self) -> BuildStats {
        BuildStats {
            documents: self.documents,
            packages: self.packages.len() as u64,
            versions: self.versions,
            users: self.users.len() as u64,
            requirements: self.requirements.len() as u64,
        }
    }

    /// Ingest one package document, writing its records to `sink`.
    ///
    /// Problems with the document are reported as issues.
    ///
    /// # Errors
    /// Only sink failures are returned.
    pub fn add_document<S>(&mut self, sink: &mut S, doc: Value) -> Result<(), Error>
    where
        S: GraphSink + ?Sized,
    {
        self.documents += 1;

        let doc = match PackageDocument::from_value(doc) {
            Ok(doc) => doc,
            Err(e) => {
                self.issues
                    .report(Issue::new(codes::DOCUMENT_INVALID, UNKNOWN_PACKAGE, e.to_string()));
                return Ok(());
            }
        };
        let name = doc.name();

        if doc.is_design_document() {
            self.issues.report(Issue::new(
                codes::DESIGN_DOCUMENT,
                name,
                "design document skipped",
            ));
            return Ok(());
        }
        if self.catalog.get(name).is_some() {
            self.issues.report(Issue::new(
                codes::DOCUMENT_DUPLICATE,
                name,
                "package already ingested; later document skipped",
            ));
            return Ok(());
        }

        self.ensure_package(sink, name)?;

        let Some(versions) = doc.versions() else {
            self.catalog.record_versions(name, Vec::new());
            return Ok(());
        };

        self.catalog.record_tags(name, doc.dist_tags());

        // Only versions with a node are catalogued, so every edge endpoint exists
        let package_repository = doc.repository();
        let mut catalog_versions = Vec::with_capacity(versions.len());
        for (version, details) in versions {
            let Some(manifest) = VersionManifest::from_value(details) else {
                self.issues.report(
                    Issue::new(
                        codes::VERSION_DETAILS_INVALID,
                        name,
                        "version details are not an object",
                    )
                    .with_version(version),
                );
                continue;
            };
            let recorded = CatalogVersion {
                raw: version.as_str().into(),
                published: self.publish_time(&doc, version),
            };
            self.add_version(sink, name, version, &recorded, manifest, package_repository)?;
            catalog_versions.push(recorded);
        }

        let chain = next_versions(
            catalog_versions
                .iter()
                .map(|v| (&*v.raw, v.published)),
        );
        for link in chain {
            let previous = VersionId::new(name, link.previous);
            let next = VersionId::new(name, link.next);
            sink.write(Record::NextVersion {
                previous: &previous,
                interval_seconds: link.interval_seconds,
                next: &next,
            })?;
        }

        self.catalog.record_versions(name, catalog_versions);
        Ok(())
    }

    /// Hand the indexes over for resolution.
    #[must_use]
    pub fn finish(self) -> GraphSnapshot {
        let stats = self.stats();
        tracing::debug!(
            packages = stats.packages,
            catalogued = self.catalog.len(),
            requirements = stats.requirements,
            "Freezing version catalog"
        );
        GraphSnapshot {
            catalog: self.catalog.freeze(),
            requirements: self.requirements,
            issues: self.issues,
            stats,
        }
    }

    fn publish_time(&mut self, doc: &PackageDocument, version: &str) -> Option<chrono::DateTime<chrono::Utc>> {
        let raw = doc.time(version)?;
        let parsed = parse_timestamp(raw);
        if parsed.is_none() {
            self.issues.report(
                Issue::new(
                    codes::TIMESTAMP_INVALID,
                    doc.name(),
                    format!("unparsable publish time '{raw}'"),
                )
                .with_version(version),
            );
        }
        parsed
    }

    fn add_version<S>(
        &mut self,
        sink: &mut S,
        name: &str,
        version: &str,
        recorded: &CatalogVersion,
        manifest: VersionManifest<'_>,
        package_repository: Option<RepositoryField<'_>>,
    ) -> Result<(), Error>
    where
        S: GraphSink + ?Sized,
    {
        let id = VersionId::new(name, version);
        let (file_count, unpacked_size) = manifest.dist_counts();
        let repository = manifest.repository().or(package_repository);

        let node = VersionNode {
            repository: self.repository_url(name, version, repository),
            id,
            version: version.trim().to_string(),
            timestamp: recorded.published,
            file_count,
            unpacked_size,
            install_script: lifecycle_scripts(manifest, &INSTALL_HOOKS),
            uninstall_script: lifecycle_scripts(manifest, &UNINSTALL_HOOKS),
        };
        sink.write(Record::Version(&node))?;
        sink.write(Record::VersionOf {
            version: &node.id,
            package: name,
        })?;
        self.versions += 1;

        for kind in DependencyKind::ALL {
            match manifest.dependencies(kind.manifest_field()) {
                DependencyField::Absent => {}
                DependencyField::Invalid(_) => self.issues.report(
                    Issue::new(
                        codes::DEPENDENCIES_INVALID,
                        name,
                        format!("{} is not an object", kind.manifest_field()),
                    )
                    .with_version(version),
                ),
                DependencyField::Map(deps) => self.add_dependencies(sink, &node.id, deps, kind)?,
            }
        }

        if let Some(maintainers) = manifest.maintainers() {
            for person in maintainers.people() {
                match person.username() {
                    Some(username) => {
                        self.ensure_user(sink, username)?;
                        sink.write(Record::Maintains {
                            username,
                            version: &node.id,
                        })?;
                    }
                    None => self.issues.report(
                        Issue::new(
                            codes::MAINTAINER_UNIDENTIFIED,
                            name,
                            "maintainer entry has no username",
                        )
                        .with_version(version),
                    ),
                }
            }
        }

        Ok(())
    }

    fn repository_url(
        &mut self,
        name: &str,
        version: &str,
        repository: Option<RepositoryField<'_>>,
    ) -> String {
        let Some(field) = repository else {
            return String::new();
        };
        if let Some(url) = field.url().and_then(normalize_repository) {
            return url;
        }
        self.issues.report(
            Issue::new(
                codes::REPOSITORY_UNRECOGNIZED,
                name,
                format!("unrecognized repository {field:?}"),
            )
            .with_version(version),
        );
        String::new()
    }

    fn add_dependencies<S>(
        &mut self,
        sink: &mut S,
        dependent: &VersionId,
        deps: &Map<String, Value>,
        kind: DependencyKind,
    ) -> Result<(), Error>
    where
        S: GraphSink + ?Sized,
    {
        for (dependency, range) in deps {
            let dependency = dependency.trim();
            let range = range.as_str().map(str::trim).unwrap_or_default();
            if dependency.is_empty() || range.is_empty() {
                self.issues.report(
                    Issue::new(
                        codes::DEPENDENCY_RANGE_INVALID,
                        dependent.package(),
                        format!("{} entry '{dependency}' has no usable range", kind.as_str()),
                    )
                    .with_version(dependent.version()),
                );
                continue;
            }
            self.require(sink, dependent, dependency, range, kind)?;
        }
        Ok(())
    }

    fn require<S>(
        &mut self,
        sink: &mut S,
        dependent: &VersionId,
        dependency: &str,
        range: &str,
        kind: DependencyKind,
    ) -> Result<(), Error>
    where
        S: GraphSink + ?Sized,
    {
        let requirement = match self.requirements.upsert(dependency, range, dependent) {
            Upsert::Created(id) => {
                self.ensure_package(sink, dependency)?;
                sink.write(Record::VersionRequirement { id, range })?;
                sink.write(Record::RequirementOf {
                    requirement: id,
                    package: dependency,
                })?;
                id
            }
            Upsert::Existing(id) => id,
        };
        sink.write(Record::DependsOn {
            version: dependent,
            kind,
            requirement,
        })
    }

    fn ensure_package<S>(&mut self, sink: &mut S, name: &str) -> Result<(), Error>
    where
        S: GraphSink + ?Sized,
    {
        if self.packages.insert(name) {
            sink.write(Record::Package { name })?;
        }
        Ok(())
    }

    fn ensure_user<S>(&mut self, sink: &mut S, username: &str) -> Result<(), Error>
    where
        S: GraphSink + ?Sized,
    {
        if self.users.insert(username) {
            sink.write(Record::User { username })?;
        }
        Ok(())
    }
}

/// Script bodies for `hooks`, in lifecycle order, joined with `; `.
fn lifecycle_scripts(manifest: VersionManifest<'_>, hooks: &[&str]) -> Option<String> {
    let bodies: Vec<&str> = hooks.iter().filter_map(|hook| manifest.script(hook)).collect();
    (!bodies.is_empty()).then(|| bodies.join("; "))
}

/// Everything phase one produced, frozen for resolution.
#[derive(Debug)]
pub struct GraphSnapshot {
    catalog: CatalogSnapshot,
    requirements: RequirementRegistry,
    issues: IssueLog,
    stats: BuildStats,
}

impl GraphSnapshot {
    #[must_use]
    pub fn catalog(&self) -> &CatalogSnapshot {
        &self.catalog
    }

    #[must_use]
    pub fn requirements(&self) -> &RequirementRegistry {
        &self.requirements
    }

    /// Issues reported while building.
    #[must_use]
    pub fn issues(&self) -> &IssueLog {
        &self.issues
    }

    #[must_use]
    pub fn stats(&self) -> BuildStats {
        self.stats
    }
}

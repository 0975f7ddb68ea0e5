//! Phase two: resolve every requirement to a concrete version.

use super::builder::GraphSnapshot;
use super::catalog::RankedVersions;
use super::issue::{codes, Issue, IssueLog};
use super::model::VersionId;
use super::range::VersionRange;
use super::requirements::Requirement;
use crate::error::Error;
use crate::sink::{GraphSink, Record};
use serde::Serialize;

/// How a requirement was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<'a> {
    /// The range named a dist-tag.
    Tag(&'a str),
    /// Highest version satisfying the range.
    Range(&'a str),
}

impl<'a> Resolution<'a> {
    #[must_use]
    pub fn version(self) -> &'a str {
        match self {
            Self::Tag(v) | Self::Range(v) => v,
        }
    }
}

/// Counts collected while resolving.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolveStats {
    pub requirements: u64,
    pub resolved: u64,
    /// Of `resolved`, how many went through a dist-tag.
    pub via_tag: u64,
    pub unresolved: u64,
}

/// Resolves requirements against a frozen [`GraphSnapshot`].
#[derive(Debug)]
pub struct Resolver<'g> {
    graph: &'g GraphSnapshot,
    issues: IssueLog,
    stats: ResolveStats,
}

impl<'g> Resolver<'g> {
    #[must_use]
    pub fn new(graph: &'g GraphSnapshot) -> Self {
        Self {
            graph,
            issues: IssueLog::new(),
            stats: ResolveStats::default(),
        }
    }

    /// Number of requirements [`Resolver::resolve_all`] will visit.
    #[must_use]
    pub fn total(&self) -> usize {
        self.graph.requirements().len()
    }

    /// Resolve one `(dependency, range)` pair without emitting anything.
    ///
    /// A range that names a dist-tag resolves to the tag's target, provided the
    /// target is a catalogued version; anything else resolves to the
    /// highest-precedence version satisfying the range.
    pub fn resolve(
        &mut self,
        dependency: &str,
        range: &str,
    ) -> Option<Resolution<'g>> {
        let graph = self.graph;
        let range = range.trim();

        let Some(versions) = graph
            .catalog()
            .get(dependency)
            .filter(|entry| entry.recorded > 0 && !range.is_empty())
        else {
            self.issues.report(Issue::new(
                codes::REQUIREMENT_TARGET_UNKNOWN,
                dependency,
                format!("no published versions to resolve '{range}' against"),
            ));
            return None;
        };

        if let Some(target) = versions.tag(range) {
            if versions.contains(target) {
                return Some(Resolution::Tag(target));
            }
            self.issues.report(Issue::new(
                codes::RANGE_UNSATISFIED,
                dependency,
                format!("dist-tag '{range}' points at unpublished version '{target}'"),
            ));
            return None;
        }

        self.highest_matching(dependency, range, versions)
            .map(Resolution::Range)
    }

    fn highest_matching(
        &mut self,
        dependency: &str,
        range: &str,
        versions: &'g RankedVersions,
    ) -> Option<&'g str> {
        let parsed = match VersionRange::parse(range) {
            Ok(parsed) => parsed,
            Err(e) => {
                self.issues
                    .report(Issue::new(codes::RANGE_UNPARSABLE, dependency, e.to_string()));
                return None;
            }
        };

        let found = parsed.highest(versions.ranked());
        if found.is_none() {
            self.issues.report(Issue::new(
                codes::RANGE_UNSATISFIED,
                dependency,
                format!("no published version satisfies '{range}'"),
            ));
        }
        found
    }

    /// Resolve one registered requirement and write its edges.
    ///
    /// # Errors
    /// Only sink failures are returned.
    pub fn resolve_requirement<S>(
        &mut self,
        sink: &mut S,
        requirement: Requirement<'_>,
    ) -> Result<Option<Resolution<'g>>, Error>
    where
        S: GraphSink + ?Sized,
    {
        self.stats.requirements += 1;

        let Some(resolution) = self.resolve(requirement.name, requirement.range) else {
            self.stats.unresolved += 1;
            return Ok(None);
        };

        self.stats.resolved += 1;
        if matches!(resolution, Resolution::Tag(_)) {
            self.stats.via_tag += 1;
        }

        let resolved = VersionId::new(requirement.name, resolution.version());
        sink.write(Record::ResolvesTo {
            requirement: requirement.id,
            version: &resolved,
        })?;
        for dependent in requirement.dependents {
            sink.write(Record::DependsOnResolvesTo {
                dependent,
                resolved: &resolved,
            })?;
        }
        Ok(Some(resolution))
    }

    /// Resolve every registered requirement, calling `on_progress` after each.
    ///
    /// # Errors
    /// Only sink failures are returned.
    pub fn resolve_all<S, F>(&mut self, sink: &mut S, mut on_progress: F) -> Result<ResolveStats, Error>
    where
        S: GraphSink + ?Sized,
        F: FnMut(u64),
    {
        let graph = self.graph;
        for requirement in graph.requirements().iter() {
            self.resolve_requirement(sink, requirement)?;
            on_progress(self.stats.requirements);
        }
        Ok(self.stats)
    }

    #[must_use]
    pub fn stats(&self) -> ResolveStats {
        self.stats
    }

    /// Issues reported while resolving.
    #[must_use]
    pub fn issues(&self) -> &IssueLog {
        &self.issues
    }

    #[must_use]
    pub fn into_issues(self) -> IssueLog {
        self.issues
    }
}

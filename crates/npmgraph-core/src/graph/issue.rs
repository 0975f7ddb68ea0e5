//! Recoverable per-record problems.
//!
//! Issues are logged and counted, then processing moves on. They never abort
//! a run; only [`crate::Error`] does.

use std::collections::BTreeMap;
use std::fmt;

/// Issue codes.
pub mod codes {
    pub const DOCUMENT_INVALID: &str = "DOCUMENT_INVALID";
    pub const ROW_WITHOUT_DOC: &str = "ROW_WITHOUT_DOC";
    pub const DESIGN_DOCUMENT: &str = "DESIGN_DOCUMENT";
    pub const DOCUMENT_DUPLICATE: &str = "DOCUMENT_DUPLICATE";
    pub const VERSION_DETAILS_INVALID: &str = "VERSION_DETAILS_INVALID";
    pub const TIMESTAMP_INVALID: &str = "TIMESTAMP_INVALID";
    pub const REPOSITORY_UNRECOGNIZED: &str = "REPOSITORY_UNRECOGNIZED";
    pub const MAINTAINER_UNIDENTIFIED: &str = "MAINTAINER_UNIDENTIFIED";
    pub const DEPENDENCIES_INVALID: &str = "DEPENDENCIES_INVALID";
    pub const DEPENDENCY_RANGE_INVALID: &str = "DEPENDENCY_RANGE_INVALID";
    pub const REQUIREMENT_TARGET_UNKNOWN: &str = "REQUIREMENT_TARGET_UNKNOWN";
    pub const RANGE_UNPARSABLE: &str = "RANGE_UNPARSABLE";
    pub const RANGE_UNSATISFIED: &str = "RANGE_UNSATISFIED";
}

/// Whether an issue is routine registry noise or worth a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Expected,
    Suspicious,
}

/// A recoverable problem with one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub code: &'static str,
    pub package: String,
    pub version: Option<String>,
    pub message: String,
}

impl Issue {
    #[must_use]
    pub fn new(code: &'static str, package: &str, message: impl Into<String>) -> Self {
        Self {
            code,
            package: package.to_string(),
            version: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn with_version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    /// Severity used when logging this issue.
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self.code {
            codes::DOCUMENT_INVALID
            | codes::DOCUMENT_DUPLICATE
            | codes::ROW_WITHOUT_DOC
            | codes::VERSION_DETAILS_INVALID => {
                Severity::Suspicious
            }
            _ => Severity::Expected,
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(
                f,
                "{}: {}@{}: {}",
                self.code, self.package, version, self.message
            ),
            None => write!(f, "{}: {}: {}", self.code, self.package, self.message),
        }
    }
}

/// Logs issues and keeps a count per code.
#[derive(Debug, Default, Clone)]
pub struct IssueLog {
    counts: BTreeMap<&'static str, u64>,
}

impl IssueLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an issue: log it and bump its counter.
    pub fn report(&mut self, issue: Issue) {
        match issue.severity() {
            Severity::Suspicious => tracing::warn!(
                code = issue.code,
                package = %issue.package,
                version = issue.version.as_deref(),
                "{}",
                issue.message
            ),
            Severity::Expected => tracing::debug!(
                code = issue.code,
                package = %issue.package,
                version = issue.version.as_deref(),
                "{}",
                issue.message
            ),
        }
        *self.counts.entry(issue.code).or_insert(0) += 1;
    }

    /// Number of issues reported with `code`.
    #[must_use]
    pub fn count(&self, code: &str) -> u64 {
        self.counts.get(code).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Counts keyed by code, in code order.
    #[must_use]
    pub fn counts(&self) -> &BTreeMap<&'static str, u64> {
        &self.counts
    }

    /// Fold another log's counts into this one.
    pub fn merge(&mut self, other: &IssueLog) {
        for (&code, n) in &other.counts {
            *self.counts.entry(code).or_insert(0) += n;
        }
    }
}

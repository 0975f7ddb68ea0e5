//! Per-package version catalog.
//!
//! Filled during ingestion, then frozen into a [`CatalogSnapshot`] whose
//! versions are parsed once and ranked by semantic-version precedence, so the
//! resolver never re-parses a version string per requirement.

use super::index::NameMap;
use super::range::parse_version;
use chrono::{DateTime, Utc};
use semver::Version;

/// One published version as recorded in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogVersion {
    pub raw: Box<str>,
    pub published: Option<DateTime<Utc>>,
}

/// Everything known about one package's versions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Versions in document order.
    pub versions: Vec<CatalogVersion>,
    /// Dist-tags (tag → version), sorted by tag.
    pub tags: Vec<(Box<str>, Box<str>)>,
}

/// Mutable catalog used during ingestion.
#[derive(Debug, Default)]
pub struct VersionCatalog {
    entries: NameMap<CatalogEntry>,
}

impl VersionCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the versions of `package`, replacing anything recorded before.
    pub fn record_versions(&mut self, package: &str, versions: Vec<CatalogVersion>) {
        match self.entries.get_mut(package) {
            Some(entry) => entry.versions = versions,
            None => {
                self.entries.insert(
                    package,
                    CatalogEntry {
                        versions,
                        tags: Vec::new(),
                    },
                );
            }
        }
    }

    /// Record the dist-tags of `package`.
    pub fn record_tags<I, T, V>(&mut self, package: &str, tags: I)
    where
        I: IntoIterator<Item = (T, V)>,
        T: Into<Box<str>>,
        V: Into<Box<str>>,
    {
        let mut tags: Vec<(Box<str>, Box<str>)> = tags
            .into_iter()
            .map(|(t, v)| (t.into(), v.into()))
            .collect();
        tags.sort();
        tags.dedup_by(|a, b| a.0 == b.0);

        match self.entries.get_mut(package) {
            Some(entry) => entry.tags = tags,
            None => {
                self.entries.insert(
                    package,
                    CatalogEntry {
                        versions: Vec::new(),
                        tags,
                    },
                );
            }
        }
    }

    #[must_use]
    pub fn get(&self, package: &str) -> Option<&CatalogEntry> {
        self.entries.get(package)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Freeze the catalog for resolution.
    #[must_use]
    pub fn freeze(self) -> CatalogSnapshot {
        let mut packages = NameMap::new();
        for (name, entry) in self.entries.iter() {
            packages.insert(name, RankedVersions::from_entry(entry));
        }
        CatalogSnapshot { packages }
    }
}

/// A package's versions ranked for resolution.
#[derive(Debug, Clone)]
pub struct RankedVersions {
    /// Number of version strings recorded, parsable or not.
    pub recorded: usize,
    /// Every recorded version string, sorted for lookup.
    known: Vec<Box<str>>,
    /// Parsable versions, highest precedence first.
    ranked: Vec<(Version, Box<str>)>,
    tags: Vec<(Box<str>, Box<str>)>,
}

impl RankedVersions {
    fn from_entry(entry: &CatalogEntry) -> Self {
        let mut ranked: Vec<(Version, Box<str>)> = entry
            .versions
            .iter()
            .filter_map(|v| parse_version(&v.raw).map(|parsed| (parsed, v.raw.clone())))
            .collect();
        ranked.sort_by(|a, b| b.0.cmp_precedence(&a.0).then_with(|| b.0.cmp(&a.0)));

        let mut known: Vec<Box<str>> = entry.versions.iter().map(|v| v.raw.clone()).collect();
        known.sort();

        Self {
            recorded: entry.versions.len(),
            known,
            ranked,
            tags: entry.tags.clone(),
        }
    }

    /// Whether `version` was recorded for this package.
    #[must_use]
    pub fn contains(&self, version: &str) -> bool {
        self.known
            .binary_search_by(|known| (**known).cmp(version))
            .is_ok()
    }

    /// Ranked `(version, raw string)` pairs, highest first.
    pub fn ranked(&self) -> impl Iterator<Item = (&Version, &str)> {
        self.ranked.iter().map(|(v, raw)| (v, &**raw))
    }

    /// Target of a dist-tag, if `tag` is one.
    #[must_use]
    pub fn tag(&self, tag: &str) -> Option<&str> {
        self.tags
            .binary_search_by(|(t, _)| (**t).cmp(tag))
            .ok()
            .map(|i| &*self.tags[i].1)
    }
}

/// Immutable, resolution-ready catalog.
#[derive(Debug, Default)]
pub struct CatalogSnapshot {
    packages: NameMap<RankedVersions>,
}

impl CatalogSnapshot {
    #[must_use]
    pub fn get(&self, package: &str) -> Option<&RankedVersions> {
        self.packages.get(package)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn versions(raw: &[&str]) -> Vec<CatalogVersion> {
        raw.iter()
            .map(|v| CatalogVersion {
                raw: (*v).into(),
                published: None,
            })
            .collect()
    }

    #[test]
    fn test_record_and_lookup() {
        let mut catalog = VersionCatalog::new();
        let ts = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        catalog.record_versions(
            "a",
            vec![CatalogVersion {
                raw: "1.0.0".into(),
                published: Some(ts),
            }],
        );
        catalog.record_tags("a", [("latest", "1.0.0"), ("next", "2.0.0-rc.1")]);

        let entry = catalog.get("a").unwrap();
        assert_eq!(entry.versions.len(), 1);
        assert_eq!(entry.versions[0].published, Some(ts));
        assert_eq!(entry.tags.len(), 2);

        let snapshot = catalog.freeze();
        let ranked = snapshot.get("a").unwrap();
        assert_eq!(ranked.tag("next"), Some("2.0.0-rc.1"));
        assert_eq!(ranked.tag("beta"), None);
    }

    #[test]
    fn test_tags_before_versions_are_kept() {
        let mut catalog = VersionCatalog::new();
        catalog.record_tags("a", [("latest", "1.0.0")]);
        catalog.record_versions("a", versions(&["1.0.0"]));

        let entry = catalog.get("a").unwrap();
        assert_eq!(&*entry.tags[0].1, "1.0.0");
        assert_eq!(entry.versions.len(), 1);
    }

    #[test]
    fn test_empty_version_list_is_recorded() {
        let mut catalog = VersionCatalog::new();
        catalog.record_versions("gone", Vec::new());
        let snapshot = catalog.freeze();
        assert_eq!(snapshot.get("gone").unwrap().recorded, 0);
    }

    #[test]
    fn test_freeze_ranks_by_precedence() {
        let mut catalog = VersionCatalog::new();
        catalog.record_versions(
            "a",
            versions(&["1.10.0", "1.2.0", "not-semver", "2.0.0-rc.1", "2.0.0"]),
        );
        let snapshot = catalog.freeze();
        let ranked: Vec<_> = snapshot.get("a").unwrap().ranked().map(|(_, raw)| raw).collect();
        assert_eq!(ranked, ["2.0.0", "2.0.0-rc.1", "1.10.0", "1.2.0"]);
        assert_eq!(snapshot.get("a").unwrap().recorded, 5);
    }

    #[test]
    fn test_contains_only_recorded_versions() {
        let mut catalog = VersionCatalog::new();
        catalog.record_versions("a", versions(&["1.0.0", "not-semver"]));
        catalog.record_tags("a", [("latest", "2.0.0")]);
        let snapshot = catalog.freeze();
        let entry = snapshot.get("a").unwrap();

        assert!(entry.contains("1.0.0"));
        assert!(entry.contains("not-semver"));
        assert!(!entry.contains("2.0.0"));
    }
}

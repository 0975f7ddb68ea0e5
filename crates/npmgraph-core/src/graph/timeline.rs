//! Chronological "next version" chain within one package.

use super::range::parse_version;
use chrono::{DateTime, Utc};
use semver::Version;
use std::cmp::Ordering;

/// One link of a package's release chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextVersion<'a> {
    pub previous: &'a str,
    pub next: &'a str,
    /// `next.published - previous.published`, in whole seconds. Negative when
    /// a lower version was published later (backports).
    pub interval_seconds: i64,
}

/// Link consecutive versions of one package.
///
/// `versions` yields `(raw version string, publish time)`. Unparsable strings
/// are dropped, duplicates (same parsed version) keep their first raw string,
/// and the rest are ordered by semantic-version precedence. A link is produced
/// for each adjacent pair where both publish times are known.
pub fn next_versions<'a, I>(versions: I) -> Vec<NextVersion<'a>>
where
    I: IntoIterator<Item = (&'a str, Option<DateTime<Utc>>)>,
{
    let mut ordered: Vec<(Version, &'a str, Option<DateTime<Utc>>)> = versions
        .into_iter()
        .filter_map(|(raw, published)| parse_version(raw).map(|v| (v, raw, published)))
        .collect();

    // Stable sort keeps document order among equal versions for dedup.
    ordered.sort_by(|a, b| compare(&a.0, &b.0));
    ordered.dedup_by(|later, earlier| later.0 == earlier.0);

    ordered
        .windows(2)
        .filter_map(|pair| {
            let (_, previous, prev_time) = &pair[0];
            let (_, next, next_time) = &pair[1];
            let interval = (*next_time)? - (*prev_time)?;
            Some(NextVersion {
                previous: *previous,
                next: *next,
                interval_seconds: interval.num_seconds(),
            })
        })
        .collect()
}

fn compare(a: &Version, b: &Version) -> Ordering {
    a.cmp_precedence(b).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> Option<DateTime<Utc>> {
        Some(DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc))
    }

    #[test]
    fn test_ordered_by_precedence_not_document_order() {
        let versions = [
            ("1.0.0", ts("2020-01-01T00:00:00Z")),
            ("2.0.0", ts("2020-01-02T00:00:00Z")),
            ("1.5.0", ts("2020-01-01T12:00:00Z")),
        ];
        let chain = next_versions(versions);
        assert_eq!(
            chain,
            [
                NextVersion {
                    previous: "1.0.0",
                    next: "1.5.0",
                    interval_seconds: 43_200,
                },
                NextVersion {
                    previous: "1.5.0",
                    next: "2.0.0",
                    interval_seconds: 43_200,
                },
            ]
        );
    }

    #[test]
    fn test_missing_timestamp_skips_pair_only() {
        let versions = [
            ("1.0.0", ts("2020-01-01T00:00:00Z")),
            ("1.1.0", None),
            ("1.2.0", ts("2020-01-03T00:00:00Z")),
            ("1.3.0", ts("2020-01-04T00:00:00Z")),
        ];
        let chain = next_versions(versions);
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].previous, "1.2.0");
        assert_eq!(chain[0].next, "1.3.0");
        assert_eq!(chain[0].interval_seconds, 86_400);
    }

    #[test]
    fn test_unparsable_versions_dropped() {
        let versions = [
            ("1.0.0", ts("2020-01-01T00:00:00Z")),
            ("banana", ts("2020-01-01T06:00:00Z")),
            ("1.0.1", ts("2020-01-02T00:00:00Z")),
        ];
        let chain = next_versions(versions);
        assert_eq!(chain.len(), 1);
        assert_eq!((chain[0].previous, chain[0].next), ("1.0.0", "1.0.1"));
    }

    #[test]
    fn test_prerelease_sorts_before_release() {
        let versions = [
            ("2.0.0", ts("2020-02-01T00:00:00Z")),
            ("2.0.0-rc.1", ts("2020-01-01T00:00:00Z")),
        ];
        let chain = next_versions(versions);
        assert_eq!((chain[0].previous, chain[0].next), ("2.0.0-rc.1", "2.0.0"));
    }

    #[test]
    fn test_backport_has_negative_interval() {
        let versions = [
            ("1.0.1", ts("2020-03-01T00:00:00Z")),
            ("2.0.0", ts("2020-02-01T00:00:00Z")),
        ];
        let chain = next_versions(versions);
        assert!(chain[0].interval_seconds < 0);
    }

    #[test]
    fn test_duplicate_parsed_versions_collapse() {
        let versions = [
            ("1.0.0", ts("2020-01-01T00:00:00Z")),
            ("v1.0.0", ts("2020-01-01T01:00:00Z")),
            ("1.1.0", ts("2020-01-02T00:00:00Z")),
        ];
        let chain = next_versions(versions);
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].previous, "1.0.0");
    }

    #[test]
    fn test_single_or_no_versions() {
        assert!(next_versions([("1.0.0", ts("2020-01-01T00:00:00Z"))]).is_empty());
        assert!(next_versions(std::iter::empty()).is_empty());
    }
}

//! npm version ranges on top of the `semver` crate.
//!
//! The `semver` crate implements Cargo's requirement syntax, which differs
//! from npm in a few places. Ranges are rewritten before parsing:
//! - bare versions are exact (`1.2.3` means `=1.2.3`, not `^1.2.3`)
//! - bare partial versions are x-ranges (`1.2` means `1.2.x`)
//! - hyphen ranges (`1.0.0 - 2.0.0`)
//! - x-ranges (`1.x`, `1.2.*`, `*`)
//! - space-separated comparators (`>= 2.1.2 < 3.0.0`)
//! - `||` alternatives
//! - a leading `v` on any version (`v1.2.3`, `>=v1.0.0`)

use semver::{Version, VersionReq};
use std::cmp::Ordering;
use thiserror::Error;

/// A range that could not be understood.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid version range '{range}': {reason}")]
pub struct RangeError {
    pub range: String,
    pub reason: String,
}

impl RangeError {
    fn new(range: &str, reason: impl Into<String>) -> Self {
        Self {
            range: range.to_string(),
            reason: reason.into(),
        }
    }
}

/// Parse a published version string leniently (surrounding whitespace and a
/// leading `v` or `=` are ignored, as the registry accepted them historically).
#[must_use]
pub fn parse_version(raw: &str) -> Option<Version> {
    let trimmed = raw.trim();
    let stripped = trimmed
        .strip_prefix('=')
        .unwrap_or(trimmed)
        .trim_start();
    let stripped = stripped
        .strip_prefix('v')
        .or_else(|| stripped.strip_prefix('V'))
        .unwrap_or(stripped);
    Version::parse(stripped).ok()
}

#[derive(Debug, Clone)]
enum Alternative {
    /// Exact version: matches versions of equal precedence (build metadata ignored).
    Exact(Version),
    Req(VersionReq),
}

impl Alternative {
    fn matches(&self, version: &Version) -> bool {
        match self {
            Self::Exact(exact) => exact.cmp_precedence(version) == Ordering::Equal,
            Self::Req(req) => req.matches(version),
        }
    }
}

/// A parsed npm range: one or more alternatives joined by `||`.
#[derive(Debug, Clone)]
pub struct VersionRange {
    alternatives: Vec<Alternative>,
}

impl VersionRange {
    /// Parse an npm range.
    ///
    /// Invalid alternatives inside an `||` list are skipped as long as at least
    /// one alternative parses.
    ///
    /// # Errors
    /// Returns an error if no alternative can be parsed.
    pub fn parse(range: &str) -> Result<Self, RangeError> {
        let range = range.trim();

        if !range.contains("||") {
            let alt = parse_alternative(range)?;
            return Ok(Self {
                alternatives: vec![alt],
            });
        }

        // Handle OR ranges (e.g., "^1.0.0 || ^2.0.0")
        let mut alternatives = Vec::new();
        for alt in range.split("||").map(str::trim) {
            match parse_alternative(alt) {
                Ok(parsed) => alternatives.push(parsed),
                // Skip invalid alternatives, try others
                Err(_) => continue,
            }
        }

        if alternatives.is_empty() {
            return Err(RangeError::new(range, "no valid alternatives"));
        }

        Ok(Self { alternatives })
    }

    /// Whether `version` satisfies any alternative.
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|alt| alt.matches(version))
    }

    /// Pick the highest candidate satisfying this range.
    ///
    /// `candidates` must be sorted by descending precedence; the first match wins.
    pub fn highest<'a, I>(&self, candidates: I) -> Option<&'a str>
    where
        I: IntoIterator<Item = (&'a Version, &'a str)>,
    {
        candidates
            .into_iter()
            .find(|(version, _)| self.matches(version))
            .map(|(_, raw)| raw)
    }
}

/// Parse a single alternative, handling npm-specific syntax.
fn parse_alternative(range: &str) -> Result<Alternative, RangeError> {
    let range = range.trim();

    if is_wildcard(range) {
        return Ok(Alternative::Req(VersionReq::STAR));
    }

    if let Some(exact) = parse_version(range) {
        return Ok(Alternative::Exact(exact));
    }

    // Handle hyphen ranges: "1.0.0 - 2.0.0" -> ">=1.0.0, <=2.0.0"
    if let Some((start, end)) = parse_hyphen_range(range) {
        let converted = format!(
            ">={}, <={}",
            strip_v(&start),
            strip_v(&end)
        );
        return parse_req(range, &converted);
    }

    // Handle x-ranges: "1.x" -> ">=1.0.0, <2.0.0"
    if is_x_range(range) {
        return parse_req(range, &convert_x_range(range));
    }

    // Handle space-separated comparators: ">= 2.1.2 < 3.0.0" -> ">=2.1.2, <3.0.0"
    // npm allows spaces between comparators to mean AND
    let converted = convert_space_separated_comparators(range)
        .split(", ")
        .map(normalize_comparator)
        .collect::<Vec<_>>()
        .join(", ");

    parse_req(range, &converted)
}

fn parse_req(original: &str, converted: &str) -> Result<Alternative, RangeError> {
    VersionReq::parse(converted)
        .map(Alternative::Req)
        .map_err(|e| RangeError::new(original, e.to_string()))
}

fn is_wildcard(range: &str) -> bool {
    matches!(range, "" | "*" | "x" | "X")
}

fn strip_v(version: &str) -> &str {
    let version = version.trim();
    version
        .strip_prefix('v')
        .or_else(|| version.strip_prefix('V'))
        .unwrap_or(version)
}

/// Rewrite one comparator into the `semver` crate's dialect.
///
/// A bare version (no operator) is exact in npm, so it gets an explicit `=`.
/// `=1.2` in the `semver` crate means `>=1.2.0, <1.3.0`, which is also what
/// npm means by a bare `1.2`.
fn normalize_comparator(comparator: &str) -> String {
    let comparator = comparator.trim();
    let split = comparator
        .find(|c: char| !matches!(c, '<' | '>' | '=' | '~' | '^' | ' '))
        .unwrap_or(comparator.len());
    let (op, version) = comparator.split_at(split);
    let op: String = op.chars().filter(|c| !c.is_whitespace()).collect();
    let version = strip_v(version);

    if op.is_empty() && version.starts_with(|c: char| c.is_ascii_digit()) {
        format!("={version}")
    } else {
        format!("{op}{version}")
    }
}

/// Parse a hyphen range like "1.0.0 - 2.0.0".
fn parse_hyphen_range(range: &str) -> Option<(String, String)> {
    // Look for " - " pattern (space-hyphen-space)
    let parts: Vec<&str> = range.split(" - ").collect();
    if parts.len() == 2 {
        let start = parts[0].trim();
        let end = parts[1].trim();
        // Validate both look like versions
        if !start.is_empty() && !end.is_empty() {
            return Some((start.to_string(), end.to_string()));
        }
    }
    None
}

/// Whether `range` is a single x-range token like `1.x` or `1.2.*`.
///
/// Only whole dot-separated components count, so prerelease tags that happen
/// to contain an `x` (`1.0.0-next.1`) are left alone.
fn is_x_range(range: &str) -> bool {
    !range.contains(' ')
        && range
            .split('.')
            .any(|part| matches!(part, "x" | "X" | "*"))
}

/// Convert space-separated comparators to comma-separated.
///
/// npm allows: ">= 2.1.2 < 3.0.0" which means ">=2.1.2 AND <3.0.0"
/// Rust semver requires: ">=2.1.2, <3.0.0"
fn convert_space_separated_comparators(range: &str) -> String {
    let range = range.trim();

    // Split on spaces, but keep operators attached to versions
    // Comparator patterns: >=, <=, >, <, =, ~, ^, or bare version
    let mut result = String::new();
    let mut need_comma = false;

    for token in range.split_whitespace() {
        if token_has_version(token) {
            if need_comma {
                result.push_str(", ");
            }
            result.push_str(token);
            need_comma = true;
        } else {
            // Operator without version, keep accumulating
            if need_comma {
                result.push_str(", ");
                need_comma = false;
            }
            result.push_str(token);
        }
    }

    // If nothing was parsed, return original
    if result.is_empty() {
        return range.to_string();
    }

    result
}

/// Check if a token contains a version number (has digits).
fn token_has_version(token: &str) -> bool {
    token.chars().any(|c| c.is_ascii_digit())
}

/// Convert x-range to semver range.
fn convert_x_range(range: &str) -> String {
    let range = strip_v(range.trim());

    let parts: Vec<&str> = range.split('.').collect();

    match parts.as_slice() {
        [major, "x" | "X" | "*"] | [major, "x" | "X" | "*", "x" | "X" | "*"] => {
            // "1.x" -> ">=1.0.0, <2.0.0"
            if let Ok(m) = major.parse::<u64>() {
                return format!(">={m}.0.0, <{}.0.0", m + 1);
            }
        }
        [major, minor, "x" | "X" | "*"] => {
            // "1.2.x" -> ">=1.2.0, <1.3.0"
            if let (Ok(m), Ok(n)) = (major.parse::<u64>(), minor.parse::<u64>()) {
                return format!(">={m}.{n}.0, <{m}.{}.0", n + 1);
            }
        }
        _ => {}
    }

    // Fallback: just replace x with 0
    range.replace(['x', 'X'], "0")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranked(versions: &[&str]) -> Vec<(Version, String)> {
        let mut parsed: Vec<(Version, String)> = versions
            .iter()
            .filter_map(|v| parse_version(v).map(|p| (p, (*v).to_string())))
            .collect();
        // Sort descending to get highest first
        parsed.sort_by(|a, b| b.0.cmp_precedence(&a.0));
        parsed
    }

    fn resolve(versions: &[&str], range: &str) -> Option<String> {
        let candidates = ranked(versions);
        let range = VersionRange::parse(range).ok()?;
        range
            .highest(candidates.iter().map(|(v, raw)| (v, raw.as_str())))
            .map(String::from)
    }

    #[test]
    fn test_parse_version_lenient() {
        assert_eq!(parse_version("1.2.3"), Some(Version::new(1, 2, 3)));
        assert_eq!(parse_version(" v1.2.3 "), Some(Version::new(1, 2, 3)));
        assert_eq!(parse_version("=1.2.3"), Some(Version::new(1, 2, 3)));
        assert_eq!(parse_version("1.2"), None);
        assert_eq!(parse_version("latest"), None);
    }

    #[test]
    fn test_caret_picks_highest_not_last() {
        assert_eq!(
            resolve(&["1.0.0", "1.2.0", "2.0.0"], "^1.0.0").as_deref(),
            Some("1.2.0")
        );
    }

    #[test]
    fn test_tilde_range() {
        assert_eq!(
            resolve(&["1.0.0", "1.0.5", "1.1.0", "2.0.0"], "~1.0.0").as_deref(),
            Some("1.0.5")
        );
    }

    #[test]
    fn test_bare_version_is_exact() {
        // Cargo would read "1.0.0" as "^1.0.0" and pick 1.5.0
        assert_eq!(
            resolve(&["1.0.0", "1.5.0"], "1.0.0").as_deref(),
            Some("1.0.0")
        );
        assert_eq!(resolve(&["1.5.0"], "1.0.0"), None);
    }

    #[test]
    fn test_exact_returns_raw_string() {
        assert_eq!(resolve(&["v1.0.0"], "1.0.0").as_deref(), Some("v1.0.0"));
    }

    #[test]
    fn test_major_only() {
        assert_eq!(
            resolve(&["1.0.0", "1.5.0", "2.0.0", "2.5.0"], "2").as_deref(),
            Some("2.5.0")
        );
    }

    #[test]
    fn test_major_minor_is_x_range() {
        assert_eq!(
            resolve(&["1.2.0", "1.2.9", "1.3.0"], "1.2").as_deref(),
            Some("1.2.9")
        );
    }

    #[test]
    fn test_no_match() {
        assert_eq!(resolve(&["1.0.0"], ">99.0.0"), None);
        assert_eq!(resolve(&["1.0.0", "2.0.0"], "^3.0.0"), None);
    }

    #[test]
    fn test_prerelease_excluded_by_caret() {
        assert_eq!(
            resolve(&["1.0.0", "2.0.0-alpha.1", "2.0.0-beta.1", "2.0.0"], "^2.0.0").as_deref(),
            Some("2.0.0")
        );
        assert_eq!(
            resolve(&["1.0.0", "2.0.0-beta.1"], "^1.0.0").as_deref(),
            Some("1.0.0")
        );
    }

    #[test]
    fn test_prerelease_tag_with_x_is_not_x_range() {
        assert_eq!(
            resolve(&["1.0.0-next.1", "1.0.0-next.2"], "^1.0.0-next.1").as_deref(),
            Some("1.0.0-next.2")
        );
    }

    #[test]
    fn test_wildcards() {
        assert_eq!(resolve(&["1.0.0", "3.1.0"], "*").as_deref(), Some("3.1.0"));
        assert_eq!(resolve(&["1.0.0", "3.1.0"], "x").as_deref(), Some("3.1.0"));
        assert_eq!(resolve(&["1.0.0", "3.1.0"], "").as_deref(), Some("3.1.0"));
    }

    #[test]
    fn test_invalid_range() {
        assert!(VersionRange::parse("not-a-range!!!").is_err());
        assert!(VersionRange::parse("git+https://github.com/a/b.git").is_err());
        assert!(VersionRange::parse("file:../local").is_err());
    }

    #[test]
    fn test_or_range_picks_highest() {
        assert_eq!(
            resolve(&["1.5.0", "2.5.0"], "^1.0.0 || ^2.0.0").as_deref(),
            Some("2.5.0")
        );
        assert_eq!(
            resolve(&["1.0.0", "1.5.0"], "^1.0.0 || ^2.0.0").as_deref(),
            Some("1.5.0")
        );
        assert_eq!(
            resolve(&["14.0.0", "15.0.0"], "^14.0.0||^15.0.0").as_deref(),
            Some("15.0.0")
        );
    }

    #[test]
    fn test_or_range_skips_invalid_alternative() {
        assert_eq!(
            resolve(&["1.0.0", "1.1.0"], "garbage!! || ^1.0.0").as_deref(),
            Some("1.1.0")
        );
        assert!(VersionRange::parse("garbage!! || also bad!!").is_err());
    }

    #[test]
    fn test_x_range() {
        assert_eq!(
            resolve(&["1.0.0", "1.5.0", "2.0.0"], "1.x").as_deref(),
            Some("1.5.0")
        );
        assert_eq!(
            resolve(&["1.2.0", "1.2.7", "1.3.0"], "1.2.x").as_deref(),
            Some("1.2.7")
        );
    }

    #[test]
    fn test_hyphen_range() {
        assert_eq!(
            resolve(&["1.0.0", "1.5.0", "2.0.0", "3.0.0"], "1.0.0 - 2.0.0").as_deref(),
            Some("2.0.0")
        );
    }

    #[test]
    fn test_space_separated_comparators() {
        let versions = ["2.0.0", "2.1.2", "2.5.0", "3.0.0"];
        assert_eq!(resolve(&versions, ">= 2.1.2 < 3.0.0").as_deref(), Some("2.5.0"));
        assert_eq!(resolve(&versions, ">=2.1.2 <3.0.0").as_deref(), Some("2.5.0"));
        assert_eq!(
            resolve(&["2.1.2", "3.0.0"], ">= 2.1.2 < 3.0.0").as_deref(),
            Some("2.1.2")
        );
    }

    #[test]
    fn test_v_prefixed_comparator() {
        assert_eq!(
            resolve(&["1.0.0", "1.4.0", "2.0.0"], ">=v1.0.0 <v2.0.0").as_deref(),
            Some("1.4.0")
        );
    }

    #[test]
    fn test_normalize_comparator() {
        assert_eq!(normalize_comparator("1.2.3"), "=1.2.3");
        assert_eq!(normalize_comparator(">= v1.2.3"), ">=1.2.3");
        assert_eq!(normalize_comparator("^1.0.0"), "^1.0.0");
    }
}

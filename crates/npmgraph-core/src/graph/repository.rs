//! Source-repository URL normalization.
//!
//! Manifests spell the same repository many ways (`git+https://host/o/r.git`,
//! `git@github.com:owner/repo.git`, `github:owner/repo`, bare `owner/repo`).
//! Only repositories on a known forge are normalized; everything else is
//! reported as unrecognized.

use regex_lite::Regex;
use std::sync::OnceLock;
use url::Url;

/// Forges whose repository URLs can be normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownHost {
    GitHub,
    GitLab,
    Bitbucket,
}

impl KnownHost {
    #[must_use]
    pub fn domain(self) -> &'static str {
        match self {
            Self::GitHub => "github.com",
            Self::GitLab => "gitlab.com",
            Self::Bitbucket => "bitbucket.org",
        }
    }

    fn from_domain(domain: &str) -> Option<Self> {
        match domain.trim_start_matches("www.").to_ascii_lowercase().as_str() {
            "github.com" => Some(Self::GitHub),
            "gitlab.com" => Some(Self::GitLab),
            "bitbucket.org" => Some(Self::Bitbucket),
            _ => None,
        }
    }

    fn from_shorthand_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "github" => Some(Self::GitHub),
            "gitlab" => Some(Self::GitLab),
            "bitbucket" => Some(Self::Bitbucket),
            _ => None,
        }
    }
}

/// A repository on a known forge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRef {
    pub host: KnownHost,
    pub owner: String,
    pub name: String,
}

impl RepositoryRef {
    /// Canonical `https://host/owner/name` form.
    #[must_use]
    pub fn https_url(&self) -> String {
        format!("https://{}/{}/{}", self.host.domain(), self.owner, self.name)
    }
}

/// `[prefix:]owner/repo`, e.g. `github:npm/cli` or `npm/cli`.
fn shorthand_pattern() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:(github|gitlab|bitbucket):)?([A-Za-z0-9_.-]+)/([A-Za-z0-9_.-]+?)(?:\.git)?(?:#.*)?$")
            .ok()
    })
    .as_ref()
}

/// scp-style `git@host:owner/repo.git`, with or without a scheme in front.
fn scp_pattern() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:[a-z+]+://)?[^@/]+@([A-Za-z0-9.-]+):/?([A-Za-z0-9_.-]+)/([A-Za-z0-9_.-]+?)(?:\.git)?/?(?:[#?].*)?$")
            .ok()
    })
    .as_ref()
}

/// Parse a repository reference into a known-forge repository.
#[must_use]
pub fn parse_repository(reference: &str) -> Option<RepositoryRef> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }

    if let Some(caps) = shorthand_pattern().and_then(|re| re.captures(reference)) {
        // Relative paths like `./lib` are not owners
        if caps[2].starts_with('.') {
            return None;
        }
        let host = match caps.get(1) {
            Some(prefix) => KnownHost::from_shorthand_prefix(prefix.as_str())?,
            None => KnownHost::GitHub,
        };
        return Some(RepositoryRef {
            host,
            owner: caps[2].to_string(),
            name: caps[3].to_string(),
        });
    }

    if let Some(caps) = scp_pattern().and_then(|re| re.captures(reference)) {
        return Some(RepositoryRef {
            host: KnownHost::from_domain(&caps[1])?,
            owner: caps[2].to_string(),
            name: caps[3].to_string(),
        });
    }

    parse_url_form(reference)
}

fn parse_url_form(reference: &str) -> Option<RepositoryRef> {
    let without_git_prefix = reference.strip_prefix("git+").unwrap_or(reference);
    let url = Url::parse(without_git_prefix).ok()?;

    if !matches!(url.scheme(), "http" | "https" | "git" | "ssh") {
        return None;
    }

    let host = KnownHost::from_domain(url.host_str()?)?;
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
    let owner = segments.next()?;
    let name = segments.next()?;
    let name = name.strip_suffix(".git").unwrap_or(name);
    if name.is_empty() {
        return None;
    }

    Some(RepositoryRef {
        host,
        owner: owner.to_string(),
        name: name.to_string(),
    })
}

/// Normalize a repository reference to `https://host/owner/repo`.
///
/// Returns `None` when the reference is not on a known forge.
#[must_use]
pub fn normalize_repository(reference: &str) -> Option<String> {
    parse_repository(reference).map(|r| r.https_url())
}

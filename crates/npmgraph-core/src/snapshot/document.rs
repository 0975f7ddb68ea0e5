//! Typed views over registry package documents.
//!
//! Documents are kept as `serde_json::Value` and read through accessors, so a
//! field with an unexpected shape only affects that field. Fields that come in
//! several shapes are exposed as small enums; the graph builder normalizes them.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

/// A document that cannot be treated as a package at all.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("document is not an object")]
    NotAnObject,
    #[error("document has no usable _id")]
    MissingId,
}

/// One package document (`rows[*].doc`).
#[derive(Debug, Clone)]
pub struct PackageDocument {
    name: String,
    doc: Map<String, Value>,
}

impl PackageDocument {
    /// Wrap a raw document.
    ///
    /// # Errors
    /// Returns an error if the value is not an object or has no non-empty `_id`.
    pub fn from_value(value: Value) -> Result<Self, DocumentError> {
        let Value::Object(doc) = value else {
            return Err(DocumentError::NotAnObject);
        };
        let name = doc
            .get("_id")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(DocumentError::MissingId)?
            .to_string();
        Ok(Self { name, doc })
    }

    /// Package name (trimmed `_id`).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this is a CouchDB design document rather than a package.
    #[must_use]
    pub fn is_design_document(&self) -> bool {
        self.name.starts_with("_design/")
    }

    /// The `versions` map, if present and an object.
    #[must_use]
    pub fn versions(&self) -> Option<&Map<String, Value>> {
        self.doc.get("versions").and_then(Value::as_object)
    }

    /// Raw publish time string for `version`, if recorded.
    #[must_use]
    pub fn time(&self, version: &str) -> Option<&str> {
        self.doc
            .get("time")
            .and_then(|t| t.get(version))
            .and_then(Value::as_str)
    }

    /// `dist-tags` entries whose target is a string.
    pub fn dist_tags(&self) -> impl Iterator<Item = (&str, &str)> {
        self.doc
            .get("dist-tags")
            .and_then(Value::as_object)
            .into_iter()
            .flatten()
            .filter_map(|(tag, version)| Some((tag.as_str(), version.as_str()?)))
    }

    /// Document-level `repository`.
    #[must_use]
    pub fn repository(&self) -> Option<RepositoryField<'_>> {
        self.doc.get("repository").map(RepositoryField::from_value)
    }
}

/// Shape of a `repository` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryField<'a> {
    /// `"repository": "github:owner/repo"`
    Url(&'a str),
    /// `"repository": {"type": "git", "url": "..."}`
    Record { url: Option<&'a str> },
    Unknown,
}

impl<'a> RepositoryField<'a> {
    #[must_use]
    pub fn from_value(value: &'a Value) -> Self {
        match value {
            Value::String(url) => Self::Url(url),
            Value::Object(obj) => Self::Record {
                url: obj.get("url").and_then(Value::as_str),
            },
            _ => Self::Unknown,
        }
    }

    /// The URL this field points at, whatever its shape.
    #[must_use]
    pub fn url(self) -> Option<&'a str> {
        match self {
            Self::Url(url) | Self::Record { url: Some(url) } => Some(url),
            Self::Record { url: None } | Self::Unknown => None,
        }
    }
}

/// Shape of one maintainer entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonField<'a> {
    /// `"Barney Rubble <b@rubble.com> (http://barnyrubble.tumblr.com/)"`
    Text(&'a str),
    /// `{"name": "barney", "email": "b@rubble.com"}`
    Record {
        name: Option<&'a str>,
        email: Option<&'a str>,
    },
    Unknown,
}

impl<'a> PersonField<'a> {
    #[must_use]
    pub fn from_value(value: &'a Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text),
            Value::Object(obj) => Self::Record {
                name: obj.get("name").and_then(Value::as_str),
                email: obj.get("email").and_then(Value::as_str),
            },
            _ => Self::Unknown,
        }
    }

    /// Normalized username, if the entry identifies one.
    ///
    /// For the person-string form only the name part (before `<` or `(`) is kept.
    #[must_use]
    pub fn username(self) -> Option<&'a str> {
        let name = match self {
            Self::Text(text) => text
                .split(['<', '('])
                .next()
                .unwrap_or_default(),
            Self::Record { name, .. } => name?,
            Self::Unknown => return None,
        };
        let name = name.trim();
        (!name.is_empty()).then_some(name)
    }
}

/// Keys that mark an object as a single person rather than a keyed list.
const PERSON_KEYS: [&str; 3] = ["name", "email", "url"];

/// Shape of a `maintainers` field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaintainersField<'a> {
    /// A single person (string, or object with any of `name`, `email`, `url`).
    One(&'a Value),
    /// `[person, person, ...]`
    List(&'a [Value]),
    /// `{"0": person, "1": person}`
    Keyed(&'a Map<String, Value>),
}

impl<'a> MaintainersField<'a> {
    #[must_use]
    pub fn from_value(value: &'a Value) -> Self {
        match value {
            Value::Array(items) => Self::List(items),
            Value::Object(obj)
                if !obj.is_empty() && !PERSON_KEYS.iter().any(|key| obj.contains_key(*key)) =>
            {
                Self::Keyed(obj)
            }
            other => Self::One(other),
        }
    }

    /// Every person entry, in document order.
    #[must_use]
    pub fn people(self) -> Vec<PersonField<'a>> {
        match self {
            Self::One(value) => vec![PersonField::from_value(value)],
            Self::List(items) => items.iter().map(PersonField::from_value).collect(),
            Self::Keyed(obj) => obj.values().map(PersonField::from_value).collect(),
        }
    }
}

/// Shape of a dependency map (`dependencies`, `devDependencies`, ...).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DependencyField<'a> {
    Absent,
    Map(&'a Map<String, Value>),
    Invalid(&'a Value),
}

/// View over one version's manifest (`versions[v]`).
#[derive(Debug, Clone, Copy)]
pub struct VersionManifest<'a> {
    fields: &'a Map<String, Value>,
}

impl<'a> VersionManifest<'a> {
    /// `None` when the version entry is not an object.
    #[must_use]
    pub fn from_value(value: &'a Value) -> Option<Self> {
        value.as_object().map(|fields| Self { fields })
    }

    #[must_use]
    pub fn dependencies(self, field: &str) -> DependencyField<'a> {
        match self.fields.get(field) {
            None | Some(Value::Null) => DependencyField::Absent,
            Some(Value::Object(map)) => DependencyField::Map(map),
            Some(other) => DependencyField::Invalid(other),
        }
    }

    #[must_use]
    pub fn maintainers(self) -> Option<MaintainersField<'a>> {
        match self.fields.get("maintainers") {
            None | Some(Value::Null) => None,
            Some(value) => Some(MaintainersField::from_value(value)),
        }
    }

    #[must_use]
    pub fn repository(self) -> Option<RepositoryField<'a>> {
        self.fields.get("repository").map(RepositoryField::from_value)
    }

    /// `(dist.fileCount, dist.unpackedSize)`.
    #[must_use]
    pub fn dist_counts(self) -> (Option<u64>, Option<u64>) {
        let dist = self.fields.get("dist");
        let count = |key: &str| dist.and_then(|d| d.get(key)).and_then(Value::as_u64);
        (count("fileCount"), count("unpackedSize"))
    }

    /// Script body for a lifecycle hook, if it is a non-empty string.
    #[must_use]
    pub fn script(self, hook: &str) -> Option<&'a str> {
        self.fields
            .get("scripts")
            .and_then(|s| s.get(hook))
            .and_then(Value::as_str)
            .filter(|body| !body.trim().is_empty())
    }
}

/// Parse a registry timestamp.
///
/// Registry times are RFC 3339 (`2011-03-30T17:21:34.911Z`); a few old
/// entries lack the offset and are read as UTC.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_requires_id() {
        assert_eq!(
            PackageDocument::from_value(json!("nope")).unwrap_err(),
            DocumentError::NotAnObject
        );
        assert_eq!(
            PackageDocument::from_value(json!({"versions": {}})).unwrap_err(),
            DocumentError::MissingId
        );
        assert_eq!(
            PackageDocument::from_value(json!({"_id": "   "})).unwrap_err(),
            DocumentError::MissingId
        );
    }

    #[test]
    fn test_document_accessors() {
        let doc = PackageDocument::from_value(json!({
            "_id": " left-pad ",
            "dist-tags": {"latest": "1.3.0", "broken": 7},
            "time": {"1.3.0": "2016-03-23T18:22:06.112Z", "modified": "2022-01-01T00:00:00Z"},
            "versions": {"1.3.0": {}},
            "repository": {"type": "git", "url": "git+https://github.com/stevemao/left-pad.git"}
        }))
        .unwrap();

        assert_eq!(doc.name(), "left-pad");
        assert!(!doc.is_design_document());
        assert_eq!(doc.versions().unwrap().len(), 1);
        assert_eq!(doc.time("1.3.0"), Some("2016-03-23T18:22:06.112Z"));
        assert_eq!(doc.time("9.9.9"), None);
        assert_eq!(doc.dist_tags().collect::<Vec<_>>(), [("latest", "1.3.0")]);
        assert_eq!(
            doc.repository().and_then(RepositoryField::url),
            Some("git+https://github.com/stevemao/left-pad.git")
        );
    }

    #[test]
    fn test_versions_not_an_object() {
        let doc = PackageDocument::from_value(json!({"_id": "x", "versions": "1.0.0"})).unwrap();
        assert!(doc.versions().is_none());
    }

    #[test]
    fn test_design_document() {
        let doc = PackageDocument::from_value(json!({"_id": "_design/app"})).unwrap();
        assert!(doc.is_design_document());
    }

    #[test]
    fn test_repository_shapes() {
        assert_eq!(
            RepositoryField::from_value(&json!("npm/cli")).url(),
            Some("npm/cli")
        );
        assert_eq!(
            RepositoryField::from_value(&json!({"type": "git"})).url(),
            None
        );
        assert_eq!(RepositoryField::from_value(&json!(42)), RepositoryField::Unknown);
    }

    #[test]
    fn test_person_usernames() {
        assert_eq!(
            PersonField::from_value(&json!("Barney Rubble <b@rubble.com> (http://x.y/)")).username(),
            Some("Barney Rubble")
        );
        assert_eq!(PersonField::from_value(&json!("isaacs")).username(), Some("isaacs"));
        assert_eq!(
            PersonField::from_value(&json!({"name": " sindresorhus ", "email": "s@x.y"})).username(),
            Some("sindresorhus")
        );
        assert_eq!(PersonField::from_value(&json!({"email": "s@x.y"})).username(), None);
        assert_eq!(PersonField::from_value(&json!("<only@email.com>")).username(), None);
        assert_eq!(PersonField::from_value(&json!(12)).username(), None);
    }

    #[test]
    fn test_maintainer_shapes() {
        let single = json!({"name": "a", "email": "a@x.y"});
        assert_eq!(MaintainersField::from_value(&single).people().len(), 1);

        let list = json!(["a", {"name": "b"}, 3]);
        let people = MaintainersField::from_value(&list).people();
        let names: Vec<_> = people.iter().map(|p| p.username()).collect();
        assert_eq!(names, [Some("a"), Some("b"), None]);

        let keyed = json!({"0": {"name": "a"}, "1": "b"});
        let people = MaintainersField::from_value(&keyed).people();
        assert_eq!(people.len(), 2);

        let email_only = json!({"email": "nobody@example.com"});
        let people = MaintainersField::from_value(&email_only).people();
        assert_eq!(people.len(), 1);
        assert_eq!(people[0].username(), None);

        let url_only = json!({"url": "https://example.com/~someone"});
        assert_eq!(MaintainersField::from_value(&url_only).people()[0].username(), None);

        let text = json!("solo");
        assert_eq!(
            MaintainersField::from_value(&text).people()[0].username(),
            Some("solo")
        );
    }

    #[test]
    fn test_manifest_accessors() {
        let value = json!({
            "dependencies": {"a": "^1.0.0"},
            "devDependencies": ["not", "a", "map"],
            "dist": {"fileCount": 12, "unpackedSize": 4096},
            "scripts": {"postinstall": "node setup.js", "install": "  ", "test": "jest"}
        });
        let manifest = VersionManifest::from_value(&value).unwrap();

        assert!(matches!(manifest.dependencies("dependencies"), DependencyField::Map(m) if m.len() == 1));
        assert!(matches!(manifest.dependencies("devDependencies"), DependencyField::Invalid(_)));
        assert_eq!(manifest.dependencies("peerDependencies"), DependencyField::Absent);
        assert_eq!(manifest.dist_counts(), (Some(12), Some(4096)));
        assert_eq!(manifest.script("postinstall"), Some("node setup.js"));
        assert_eq!(manifest.script("install"), None);
        assert_eq!(manifest.script("preinstall"), None);
        assert!(manifest.maintainers().is_none());

        assert!(VersionManifest::from_value(&json!("1.0.0")).is_none());
    }

    #[test]
    fn test_parse_timestamp() {
        let ts = parse_timestamp("2020-01-01T12:00:00.000Z").unwrap();
        assert_eq!(ts.timestamp(), 1_577_880_000);
        assert_eq!(
            parse_timestamp("2020-01-01T12:00:00").map(|t| t.timestamp()),
            Some(1_577_880_000)
        );
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
    }
}

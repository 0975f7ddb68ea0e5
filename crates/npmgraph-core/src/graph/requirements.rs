//! Deduplicated `(dependency, range)` requirements and their dependents.

use super::index::NameMap;
use super::model::{RequirementId, VersionId};

/// Separator between the dependency name and the range in registry keys.
///
/// NUL never occurs in package names or ranges, so keys are unambiguous even
/// for names containing `--` or `@`.
const KEY_SEPARATOR: char = '\0';

/// Build the registry key for a `(name, range)` pair.
#[must_use]
pub fn requirement_key(name: &str, range: &str) -> String {
    let (name, range) = (name.trim(), range.trim());
    let mut key = String::with_capacity(name.len() + range.len() + 1);
    key.push_str(name);
    key.push(KEY_SEPARATOR);
    key.push_str(range);
    key
}

#[derive(Debug, Clone)]
struct RequirementEntry {
    id: RequirementId,
    name_len: usize,
    dependents: Vec<VersionId>,
}

/// Result of [`RequirementRegistry::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// First sighting: the caller must emit the requirement node and its
    /// edge to the dependency package.
    Created(RequirementId),
    Existing(RequirementId),
}

impl Upsert {
    #[must_use]
    pub fn id(self) -> RequirementId {
        match self {
            Self::Created(id) | Self::Existing(id) => id,
        }
    }
}

/// A requirement as seen by the resolver.
#[derive(Debug, Clone, Copy)]
pub struct Requirement<'a> {
    pub id: RequirementId,
    /// Dependency package name (trimmed).
    pub name: &'a str,
    /// Range (trimmed).
    pub range: &'a str,
    /// Versions that expressed this requirement.
    pub dependents: &'a [VersionId],
}

/// Registry of every distinct requirement in the run.
#[derive(Debug, Default)]
pub struct RequirementRegistry {
    entries: NameMap<RequirementEntry>,
    next_id: u64,
}

impl RequirementRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register that `dependent` requires `name` at `range`.
    ///
    /// Ids are sequential from 1 in order of first sighting. A dependent is
    /// recorded once per requirement even if it lists the pair under several
    /// dependency kinds.
    pub fn upsert(&mut self, name: &str, range: &str, dependent: &VersionId) -> Upsert {
        let key = requirement_key(name, range);

        if let Some(entry) = self.entries.get_mut(&key) {
            if entry.dependents.last() != Some(dependent) {
                entry.dependents.push(dependent.clone());
            }
            return Upsert::Existing(entry.id);
        }

        self.next_id += 1;
        let id = RequirementId(self.next_id);
        self.entries.insert(
            &key,
            RequirementEntry {
                id,
                name_len: name.trim().len(),
                dependents: vec![dependent.clone()],
            },
        );
        Upsert::Created(id)
    }

    /// Look up a requirement by name and range.
    #[must_use]
    pub fn get(&self, name: &str, range: &str) -> Option<Requirement<'_>> {
        self.entries
            .get_key_value(&requirement_key(name, range))
            .map(|(key, entry)| Self::view(key, entry))
    }

    /// Every requirement, in key order.
    pub fn iter(&self) -> impl Iterator<Item = Requirement<'_>> {
        self.entries.iter().map(|(key, entry)| Self::view(key, entry))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn view<'a>(key: &'a str, entry: &'a RequirementEntry) -> Requirement<'a> {
        Requirement {
            id: entry.id,
            name: &key[..entry.name_len],
            range: &key[entry.name_len + KEY_SEPARATOR.len_utf8()..],
            dependents: &entry.dependents,
        }
    }
}

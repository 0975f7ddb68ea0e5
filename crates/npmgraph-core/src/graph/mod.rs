//! Graph construction.
//!
//! Phase one ([`GraphBuilder`]) reads documents and fills the indexes; phase
//! two ([`Resolver`]) runs against the frozen [`GraphSnapshot`].

pub mod builder;
pub mod catalog;
pub mod index;
pub mod issue;
pub mod model;
pub mod range;
pub mod repository;
pub mod requirements;
pub mod resolve;
pub mod timeline;

pub use builder::{BuildStats, GraphBuilder, GraphSnapshot};
pub use issue::{codes, Issue, IssueLog};
pub use model::{DependencyKind, RequirementId, VersionId, VersionNode};
pub use range::{RangeError, VersionRange};
pub use resolve::{Resolution, ResolveStats, Resolver};

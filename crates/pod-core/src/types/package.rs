//! Package identifiers, identities and candidate records.
//!
//! A `CandidateRecord` is one version alternative for a package id, carrying
//! the dependency edges that version declares. The absent record is the
//! resolver's "choose nothing" alternative for an id.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use super::{Dependency, Version, VersionRange};
use crate::error::{PodError, PodResult};

/// Case-insensitive package identifier
///
/// Comparison, hashing and ordering use the lowercased name; display keeps the
/// spelling the id was created with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct PackageId {
    name: String,
    key: String,
}

/// Concrete package version (e.g. `Newtonsoft.Json 13.0.1`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageIdentity {
    pub id: PackageId,
    pub version: Version,
}

/// Package the caller requires in the result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub id: PackageId,
    /// Versions the caller is willing to accept; `None` accepts any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<VersionRange>,
}

/// One version alternative for a package id
#[derive(Debug, Clone)]
pub struct CandidateRecord {
    id: PackageId,
    version: Option<Version>,
    dependencies: IndexMap<PackageId, Dependency>,
    absent: bool,
    listed: bool,
}

impl PackageId {
    /// Create a package id
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let key = name.to_lowercase();
        Self { name, key }
    }

    /// The spelling this id was created with
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// The normalized comparison key
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl PartialEq for PackageId {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for PackageId {}

impl Hash for PackageId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for PackageId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PackageId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl From<&str> for PackageId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for PackageId {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<&PackageId> for PackageId {
    fn from(id: &PackageId) -> Self {
        id.clone()
    }
}

impl From<PackageId> for String {
    fn from(id: PackageId) -> Self {
        id.name
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl PackageIdentity {
    /// Create a new package identity
    pub fn new(id: impl Into<PackageId>, version: Version) -> Self {
        Self {
            id: id.into(),
            version,
        }
    }

    /// Create a package identity from an id and a version string
    pub fn parse(id: impl Into<PackageId>, version: &str) -> PodResult<Self> {
        Ok(Self::new(id, Version::parse(version)?))
    }
}

impl fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.version)
    }
}

impl Target {
    /// Require a package at any version
    pub fn new(id: impl Into<PackageId>) -> Self {
        Self {
            id: id.into(),
            allowed: None,
        }
    }

    /// Require a package at exactly one version
    pub fn pinned(id: impl Into<PackageId>, version: Version) -> Self {
        Self::new(id).with_allowed(VersionRange::exact(version))
    }

    /// Restrict the versions accepted for this target
    pub fn with_allowed(mut self, range: VersionRange) -> Self {
        self.allowed = Some(range);
        self
    }

    /// Check if a candidate is acceptable for this target
    pub fn accepts(&self, candidate: &CandidateRecord) -> bool {
        match (&self.allowed, candidate.version()) {
            (None, _) => true,
            (Some(range), Some(version)) => range.satisfies(version),
            (Some(_), None) => false,
        }
    }
}

impl CandidateRecord {
    /// Create a concrete candidate
    ///
    /// Fails with `DuplicateDependency` if two edges target the same id.
    pub fn new(
        id: impl Into<PackageId>,
        version: Version,
        dependencies: impl IntoIterator<Item = Dependency>,
    ) -> PodResult<Self> {
        let id = id.into();
        let mut edges = IndexMap::new();
        for dependency in dependencies {
            if edges.contains_key(&dependency.id) {
                return Err(PodError::DuplicateDependency {
                    package: format!("{} {}", id, version),
                    dependency: dependency.id.to_string(),
                });
            }
            edges.insert(dependency.id.clone(), dependency);
        }

        Ok(Self {
            id,
            version: Some(version),
            dependencies: edges,
            absent: false,
            listed: true,
        })
    }

    /// Create a concrete candidate without dependencies
    pub fn leaf(id: impl Into<PackageId>, version: Version) -> Self {
        Self {
            id: id.into(),
            version: Some(version),
            dependencies: IndexMap::new(),
            absent: false,
            listed: true,
        }
    }

    /// Create the "choose nothing" alternative for an id
    pub fn absent(id: impl Into<PackageId>) -> Self {
        Self {
            id: id.into(),
            version: None,
            dependencies: IndexMap::new(),
            absent: true,
            listed: true,
        }
    }

    /// Mark this candidate as listed or unlisted in its feed
    pub fn with_listed(mut self, listed: bool) -> Self {
        self.listed = listed;
        self
    }

    /// Copy of this candidate with every dependency edge removed
    pub fn without_dependencies(&self) -> Self {
        Self {
            dependencies: IndexMap::new(),
            ..self.clone()
        }
    }

    pub fn id(&self) -> &PackageId {
        &self.id
    }

    /// Version of this candidate; `None` for the absent record
    pub fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    pub fn is_absent(&self) -> bool {
        self.absent
    }

    pub fn is_listed(&self) -> bool {
        self.listed
    }

    /// Dependency edges in declaration order
    pub fn dependencies(&self) -> impl Iterator<Item = &Dependency> {
        self.dependencies.values()
    }

    pub fn has_dependencies(&self) -> bool {
        !self.dependencies.is_empty()
    }

    /// Find the edge this candidate declares on `id`
    pub fn find_dependency(&self, id: &PackageId) -> Option<&Dependency> {
        self.dependencies.get(id)
    }

    /// Check if this candidate declares an edge on `id`
    pub fn depends_on(&self, id: &PackageId) -> bool {
        self.dependencies.contains_key(id)
    }

    /// Identity of a concrete candidate
    pub fn identity(&self) -> Option<PackageIdentity> {
        self.version
            .as_ref()
            .map(|version| PackageIdentity::new(self.id.clone(), version.clone()))
    }
}

impl PartialEq for CandidateRecord {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.version == other.version && self.absent == other.absent
    }
}

impl Eq for CandidateRecord {}

impl Hash for CandidateRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.version.hash(state);
        self.absent.hash(state);
    }
}

impl fmt::Display for CandidateRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{} {}", self.id, version),
            None => write!(f, "{} (absent)", self.id),
        }
    }
}

//! Dependency specification types.
//!
//! A dependency names a package id and an optional version range; a missing
//! range accepts every version of that id.

use serde::{Deserialize, Serialize};

use super::{CandidateRecord, PackageId, Version, VersionRange};
use crate::error::PodResult;

/// Dependency edge declared by a candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub id: PackageId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<VersionRange>,
}

impl Dependency {
    /// Create a dependency constrained to a range
    pub fn new(id: impl Into<PackageId>, range: VersionRange) -> Self {
        Self {
            id: id.into(),
            range: Some(range),
        }
    }

    /// Create a dependency accepting any version
    pub fn any(id: impl Into<PackageId>) -> Self {
        Self {
            id: id.into(),
            range: None,
        }
    }

    /// Create a dependency from a range in interval notation
    pub fn parse(id: impl Into<PackageId>, range: &str) -> PodResult<Self> {
        Ok(Self::new(id, VersionRange::parse(range)?))
    }

    /// Check if a concrete version is acceptable for this edge
    pub fn allows(&self, version: &Version) -> bool {
        self.range.as_ref().map_or(true, |range| range.satisfies(version))
    }

    /// Check if a candidate satisfies this edge; absent candidates never do
    pub fn is_satisfied_by(&self, candidate: &CandidateRecord) -> bool {
        candidate.id() == &self.id && candidate.version().map_or(false, |v| self.allows(v))
    }

    /// Human readable form, e.g. `B (>= 1.0.0)` or just `B`
    pub fn pretty(&self) -> String {
        let range = self.range.as_ref().map(VersionRange::pretty).unwrap_or_default();
        format!("{} {}", self.id, range).trim().to_string()
    }
}

//! Candidate preference and conflict strategies
//!
//! The solver only ever asks two questions: which of two alternatives for the
//! same id should be tried first, and whether two chosen candidates clash.
//! Both are traits so callers can swap the rules without touching the search.

use std::cmp::Ordering;

use pod_core::types::{CandidateRecord, Version};

use crate::config::{DependencyBehavior, ResolverConfig};

/// Total order over the candidates of one group; `Less` is tried first
pub trait PreferencePolicy {
    fn compare(&self, a: &CandidateRecord, b: &CandidateRecord) -> Ordering;
}

/// Symmetric clash test between candidates of different groups
pub trait ConflictPolicy {
    fn conflicts(&self, a: &CandidateRecord, b: &CandidateRecord) -> bool;
}

/// Preference driven by the dependency behavior and the install state
#[derive(Debug, Clone, Copy)]
pub struct BehaviorPolicy<'a> {
    config: &'a ResolverConfig,
}

/// Two candidates conflict when either one declares a dependency on the
/// other's id that the other does not satisfy
#[derive(Debug, Clone, Copy, Default)]
pub struct DependencyConflict;

impl<'a> BehaviorPolicy<'a> {
    pub fn new(config: &'a ResolverConfig) -> Self {
        Self { config }
    }

    fn compare_versions(&self, a: &CandidateRecord, b: &CandidateRecord, va: &Version, vb: &Version) -> Ordering {
        let preferred = self.config.preferred_version(a.id());

        // Keep what is installed
        if let Some(installed) = preferred {
            match (va == installed, vb == installed) {
                (true, false) => return Ordering::Less,
                (false, true) => return Ordering::Greater,
                _ => {},
            }
        }

        match (a.is_listed(), b.is_listed()) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {},
        }

        if let Some(installed) = preferred {
            match (va >= installed, vb >= installed) {
                (true, false) => return Ordering::Less,
                (false, true) => return Ordering::Greater,
                // Closest downgrade first
                (false, false) => return vb.cmp(va),
                (true, true) => {},
            }
        }

        behavior_order(self.config.behavior, va, vb)
    }
}

fn behavior_order(behavior: DependencyBehavior, a: &Version, b: &Version) -> Ordering {
    match behavior {
        DependencyBehavior::Lowest => a.cmp(b),
        DependencyBehavior::Highest | DependencyBehavior::Ignore => b.cmp(a),
        DependencyBehavior::HighestMinor => a
            .major
            .cmp(&b.major)
            .then_with(|| b.minor.cmp(&a.minor))
            .then_with(|| b.patch.cmp(&a.patch))
            .then_with(|| b.cmp(a)),
        DependencyBehavior::HighestPatch => a
            .major
            .cmp(&b.major)
            .then_with(|| a.minor.cmp(&b.minor))
            .then_with(|| b.patch.cmp(&a.patch))
            .then_with(|| b.cmp(a)),
    }
}

impl PreferencePolicy for BehaviorPolicy<'_> {
    fn compare(&self, a: &CandidateRecord, b: &CandidateRecord) -> Ordering {
        let primary = match (a.version(), b.version()) {
            (Some(va), Some(vb)) => self.compare_versions(a, b, va, vb),
            (None, None) => Ordering::Equal,
            // Absent is tried first unless the id must be present
            (None, Some(_)) if self.config.is_target(a.id()) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) if self.config.is_target(b.id()) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
        };

        primary
            .then_with(|| a.version().cmp(&b.version()))
            .then_with(|| a.id().cmp(b.id()))
    }
}

impl DependencyConflict {
    fn violates(from: &CandidateRecord, to: &CandidateRecord) -> bool {
        from.find_dependency(to.id())
            .map_or(false, |dependency| !dependency.is_satisfied_by(to))
    }
}

impl ConflictPolicy for DependencyConflict {
    fn conflicts(&self, a: &CandidateRecord, b: &CandidateRecord) -> bool {
        Self::violates(a, b) || Self::violates(b, a)
    }
}

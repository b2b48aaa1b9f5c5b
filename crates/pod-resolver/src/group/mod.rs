//! Input validation and candidate group construction
//!
//! Turns the flat candidate list into one group of mutually exclusive
//! alternatives per package id. Non-target groups get an absent alternative so
//! the solver can leave them out, and ids that are only ever referenced by a
//! dependency edge get a group holding nothing but the absent record. Ids no
//! target can reach get no group at all.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use tracing::debug;

use pod_core::error::PodError;
use pod_core::types::{CandidateRecord, PackageId, PackageIdentity, Target, Version};

use crate::config::{DependencyBehavior, ResolverConfig};
use crate::diagnostic;
use crate::ResolverResult;

/// All alternatives for one package id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateGroup {
    id: PackageId,
    candidates: Vec<CandidateRecord>,
}

impl CandidateGroup {
    /// Create a group from already ordered candidates
    pub fn new(id: impl Into<PackageId>, candidates: Vec<CandidateRecord>) -> Self {
        Self {
            id: id.into(),
            candidates,
        }
    }

    pub fn id(&self) -> &PackageId {
        &self.id
    }

    pub fn candidates(&self) -> &[CandidateRecord] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Candidates that carry a version
    pub fn concrete(&self) -> impl Iterator<Item = &CandidateRecord> {
        self.candidates.iter().filter(|c| !c.is_absent())
    }

    /// Check if the absent alternative is part of this group
    pub fn allows_absent(&self) -> bool {
        self.candidates.iter().any(CandidateRecord::is_absent)
    }
}

/// Check the caller's input and derive the per-call config
///
/// Checks run in a fixed order so the same bad input always reports the same
/// error.
pub fn validate(
    targets: &[Target],
    available: &[CandidateRecord],
    installed: &[PackageIdentity],
    behavior: DependencyBehavior,
) -> ResolverResult<ResolverConfig> {
    if targets.is_empty() {
        return Err(PodError::NoTargets);
    }

    let mut target_ids = BTreeSet::new();
    for target in targets {
        if !target_ids.insert(target.id.clone()) {
            return Err(PodError::DuplicateTarget {
                id: target.id.to_string(),
            });
        }
    }

    let known: HashSet<&PackageId> = available
        .iter()
        .filter(|c| !c.is_absent())
        .map(CandidateRecord::id)
        .collect();

    let required = targets.iter().map(|t| &t.id).chain(installed.iter().map(|p| &p.id));
    for id in required {
        if !known.contains(id) {
            return Err(PodError::MissingDependencyInfo { id: id.to_string() });
        }
    }

    if let Some(stray) = installed.iter().find(|p| !target_ids.contains(&p.id)) {
        return Err(PodError::InstalledNotInTargets {
            id: stray.id.to_string(),
        });
    }

    let mut installed_versions: BTreeMap<PackageId, Version> = BTreeMap::new();
    for identity in installed {
        if installed_versions
            .insert(identity.id.clone(), identity.version.clone())
            .is_some()
        {
            return Err(PodError::DuplicateInstalled {
                id: identity.id.to_string(),
            });
        }
    }

    let new_ids = target_ids
        .iter()
        .filter(|id| !installed_versions.contains_key(*id))
        .cloned()
        .collect();

    Ok(ResolverConfig {
        behavior,
        installed: installed_versions,
        new_ids,
        target_ids,
    })
}

/// Build the candidate groups, ordered by id
///
/// Within a group candidates are ordered by version ascending with the absent
/// record, when present, last.
pub fn build_groups(
    targets: &[Target],
    available: &[CandidateRecord],
    config: &ResolverConfig,
) -> ResolverResult<Vec<CandidateGroup>> {
    let ignore_dependencies = config.behavior == DependencyBehavior::Ignore;

    let mut seen: HashSet<(&PackageId, Option<&Version>)> = HashSet::new();
    let mut by_id: BTreeMap<PackageId, Vec<CandidateRecord>> = BTreeMap::new();

    for candidate in available {
        if candidate.is_absent() {
            debug!("Skipping absent record supplied for {}", candidate.id());
            continue;
        }
        if !seen.insert((candidate.id(), candidate.version())) {
            debug!("Ignoring duplicate candidate {}", candidate);
            continue;
        }

        let record = if ignore_dependencies {
            candidate.without_dependencies()
        } else {
            candidate.clone()
        };
        by_id.entry(candidate.id().clone()).or_default().push(record);
    }

    for target in targets {
        let Some(allowed) = &target.allowed else {
            continue;
        };
        if let Some(group) = by_id.get_mut(&target.id) {
            group.retain(|candidate| target.accepts(candidate));
            if group.is_empty() {
                return Err(PodError::no_solution(diagnostic::allowed_versions_message(
                    &target.id, allowed,
                )));
            }
        }
    }

    let reachable = reachable_ids(targets, &by_id);
    let before = by_id.len();
    by_id.retain(|id, _| reachable.contains(id));
    if by_id.len() < before {
        debug!("Leaving out {} packages no target depends on", before - by_id.len());
    }

    for id in reachable {
        if !by_id.contains_key(&id) {
            debug!("No candidates known for dependency {}", id);
            by_id.insert(id, Vec::new());
        }
    }

    let groups: Vec<CandidateGroup> = by_id
        .into_iter()
        .map(|(id, mut candidates)| {
            candidates.sort_by(|a, b| a.version().cmp(&b.version()));
            if !config.is_target(&id) {
                candidates.push(CandidateRecord::absent(id.clone()));
            }
            CandidateGroup::new(id, candidates)
        })
        .collect();

    debug!(
        "Built {} candidate groups ({} targets)",
        groups.len(),
        config.target_ids.len()
    );

    Ok(groups)
}

/// Ids reachable from the targets through any candidate's dependencies
///
/// Anything else can only ever be absent from a minimal solution.
fn reachable_ids(targets: &[Target], by_id: &BTreeMap<PackageId, Vec<CandidateRecord>>) -> BTreeSet<PackageId> {
    let mut reachable = BTreeSet::new();
    let mut frontier: Vec<PackageId> = targets.iter().map(|target| target.id.clone()).collect();

    while let Some(id) = frontier.pop() {
        if reachable.contains(&id) {
            continue;
        }
        if let Some(candidates) = by_id.get(&id) {
            frontier.extend(
                candidates
                    .iter()
                    .flat_map(CandidateRecord::dependencies)
                    .filter(|dependency| !reachable.contains(&dependency.id))
                    .map(|dependency| dependency.id.clone()),
            );
        }
        reachable.insert(id);
    }

    reachable
}

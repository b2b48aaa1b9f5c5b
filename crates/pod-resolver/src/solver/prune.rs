//! Candidate pruning ahead of the search
//!
//! A candidate survives only while every group it shares a dependency edge
//! with still holds an alternative it does not conflict with. Pruning runs to
//! a fixpoint. Every removed candidate belongs to no solution, so the search
//! over what is left finds the same first solution it would have found over
//! the full groups.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use tracing::debug;

use pod_core::types::{CandidateRecord, PackageId};

use crate::group::CandidateGroup;
use crate::policy::ConflictPolicy;

/// Groups joined by a dependency edge in either direction, by position
pub(crate) fn adjacent_groups(groups: &[&CandidateGroup]) -> Vec<BTreeSet<usize>> {
    let index: HashMap<&PackageId, usize> = groups
        .iter()
        .enumerate()
        .map(|(position, group)| (group.id(), position))
        .collect();

    let mut adjacent = vec![BTreeSet::new(); groups.len()];
    for (from, group) in groups.iter().enumerate() {
        for dependency in group.candidates().iter().flat_map(CandidateRecord::dependencies) {
            if let Some(&to) = index.get(&dependency.id) {
                if to != from {
                    adjacent[from].insert(to);
                    adjacent[to].insert(from);
                }
            }
        }
    }

    adjacent
}

/// Remove unsupported candidates from `domains`
///
/// Returns the position of the first group left without candidates, if any.
pub(crate) fn prune(
    domains: &mut [Vec<&CandidateRecord>],
    adjacent: &[BTreeSet<usize>],
    conflict: &dyn ConflictPolicy,
) -> Option<usize> {
    let mut queue: VecDeque<(usize, usize)> = VecDeque::new();
    let mut queued: HashSet<(usize, usize)> = HashSet::new();
    for (from, neighbors) in adjacent.iter().enumerate() {
        for &to in neighbors {
            queue.push_back((from, to));
            queued.insert((from, to));
        }
    }

    let mut removed = 0;
    while let Some((from, to)) = queue.pop_front() {
        queued.remove(&(from, to));

        let before = domains[from].len();
        let supports = std::mem::take(&mut domains[to]);
        domains[from].retain(|candidate| supports.iter().any(|other| !conflict.conflicts(candidate, other)));
        domains[to] = supports;

        let after = domains[from].len();
        if after == before {
            continue;
        }
        removed += before - after;

        if after == 0 {
            debug!("Pruning emptied a group after removing {} candidates", removed);
            return Some(from);
        }

        // Neighbors may have lost their only support
        for &next in &adjacent[from] {
            if next != to && queued.insert((next, from)) {
                queue.push_back((next, from));
            }
        }
    }

    if removed > 0 {
        debug!("Pruned {} candidates that belong to no solution", removed);
    }
    None
}

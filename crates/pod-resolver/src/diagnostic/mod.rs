//! Failure explanations
//!
//! When the search exhausts every combination, the partial assignment the
//! solver reports is inspected for the dependency edge most likely responsible.
//! Edges touching new targets are checked first, then edges of installed
//! packages, then everything else nearest-to-a-target first.

use std::collections::{BTreeSet, HashSet, VecDeque};

use pod_core::types::{CandidateRecord, Dependency, PackageId, Target, Version, VersionRange};

use crate::config::ResolverConfig;

/// Levels walked before distance stops mattering for ordering
const MAX_DISTANCE: usize = 20;

const NO_SOLUTION: &str = "Unable to resolve dependencies.";

/// Message for a target whose allowed range matches no candidate
pub fn allowed_versions_message(id: &PackageId, allowed: &VersionRange) -> String {
    format!(
        "Unable to find a version of '{}' that satisfies the allowed versions {}.",
        id,
        allowed.pretty()
    )
}

/// Explain why no solution exists
///
/// `partial` is the assignment the solver reported and `available`
/// every candidate the caller supplied.
pub fn diagnose(
    partial: &[&CandidateRecord],
    available: &[CandidateRecord],
    config: &ResolverConfig,
    targets: &[Target],
) -> String {
    let context = Diagnosis::new(partial, available, config, targets);
    context.message()
}

/// Lowest number of dependency levels between a required package and `id`
///
/// A -> B -> C puts C two levels from A. Gives up after a fixed depth.
pub fn lowest_distance_from_target(
    id: &PackageId,
    required: &BTreeSet<PackageId>,
    solution: &[&CandidateRecord],
) -> usize {
    let mut walked: HashSet<&PackageId> = solution
        .iter()
        .map(|record| record.id())
        .filter(|candidate| required.contains(*candidate))
        .collect();

    let mut level = 0;
    while level < MAX_DISTANCE && !walked.contains(id) {
        level += 1;

        let next: Vec<&PackageId> = solution
            .iter()
            .filter(|record| walked.contains(record.id()))
            .flat_map(|record| record.dependencies())
            .filter_map(|dependency| {
                solution
                    .iter()
                    .find(|record| record.id() == &dependency.id)
                    .map(|record| record.id())
            })
            .collect();

        if next.iter().all(|found| walked.contains(*found)) {
            // Nothing new is reachable
            return MAX_DISTANCE;
        }
        walked.extend(next);
    }

    level
}

struct Diagnosis<'a> {
    /// Concrete records of the partial assignment
    solution: Vec<&'a CandidateRecord>,
    available: &'a [CandidateRecord],
    config: &'a ResolverConfig,
    targets: &'a [Target],
    required: BTreeSet<PackageId>,
}

impl<'a> Diagnosis<'a> {
    fn new(
        partial: &[&'a CandidateRecord],
        available: &'a [CandidateRecord],
        config: &'a ResolverConfig,
        targets: &'a [Target],
    ) -> Self {
        let mut solution: Vec<&CandidateRecord> =
            partial.iter().copied().filter(|record| !record.is_absent()).collect();
        solution.sort_by(|a, b| a.id().cmp(b.id()));

        let required = config
            .new_ids
            .iter()
            .chain(config.installed.keys())
            .cloned()
            .collect();

        Self {
            solution,
            available,
            config,
            targets,
            required,
        }
    }

    fn chosen(&self, id: &PackageId) -> Option<&'a CandidateRecord> {
        self.solution.iter().copied().find(|record| record.id() == id)
    }

    fn message(&self) -> String {
        // Required packages whose dependency on a new target is broken
        for target_id in &self.config.new_ids {
            let chosen = self.chosen(target_id);
            let broken = self
                .solution
                .iter()
                .filter(|record| self.required.contains(record.id()))
                .filter_map(|record| record.find_dependency(target_id))
                .any(|dependency| !satisfied(dependency, chosen));
            if broken {
                return self.problem_message(target_id);
            }
        }

        // Dependency trees of new targets, against the partial solution and
        // everything available
        let mut visited: HashSet<PackageId> = HashSet::new();
        for record in self.solution.iter().filter(|r| self.config.is_new(r.id())) {
            if let Some(id) = self.first_unavailable_dependency(*record, &mut visited) {
                return self.problem_message(&id);
            }
        }

        // Installed packages missing a dependency
        for record in self
            .solution
            .iter()
            .filter(|r| self.config.is_installed(r.id()))
        {
            if let Some(id) = self.first_broken_dependency(record) {
                return self.problem_message(&id);
            }
        }

        // Everything else, closest to a target first
        let mut others: Vec<(usize, &CandidateRecord)> = self
            .solution
            .iter()
            .filter(|r| !self.required.contains(r.id()))
            .map(|r| {
                (
                    lowest_distance_from_target(r.id(), &self.required, &self.solution),
                    *r,
                )
            })
            .collect();
        others.sort_by(|(da, a), (db, b)| da.cmp(db).then_with(|| a.id().cmp(b.id())));

        for (_, record) in others {
            if let Some(id) = self.first_broken_dependency(record) {
                return self.problem_message(&id);
            }
        }

        NO_SOLUTION.to_string()
    }

    /// Smallest id among `record`'s broken dependencies in the partial solution
    fn first_broken_dependency(&self, record: &CandidateRecord) -> Option<PackageId> {
        record
            .dependencies()
            .filter(|dependency| !satisfied(dependency, self.chosen(&dependency.id)))
            .map(|dependency| dependency.id.clone())
            .min()
    }

    /// Breadth-first walk from `root`, reporting the smallest dependency id
    /// that neither the partial solution nor any available candidate satisfies
    fn first_unavailable_dependency(
        &self,
        root: &'a CandidateRecord,
        visited: &mut HashSet<PackageId>,
    ) -> Option<PackageId> {
        if visited.contains(root.id()) {
            return None;
        }

        let mut broken: Option<PackageId> = None;
        let mut queue = VecDeque::from([root]);

        while let Some(node) = queue.pop_front() {
            for dependency in node.dependencies() {
                let chosen = self.chosen(&dependency.id);
                let unavailable = match chosen {
                    None => true,
                    Some(record) => {
                        !satisfied(dependency, Some(record))
                            && !self
                                .available
                                .iter()
                                .any(|candidate| dependency.is_satisfied_by(candidate))
                    },
                };

                if unavailable && broken.as_ref().map_or(true, |current| &dependency.id < current) {
                    broken = Some(dependency.id.clone());
                }

                if let Some(record) = chosen {
                    if visited.insert(dependency.id.clone()) {
                        queue.push_back(record);
                    }
                }
            }
        }

        broken
    }

    fn problem_message(&self, problem_id: &PackageId) -> String {
        let problem = self.chosen(problem_id);

        let mut dependants: Vec<String> = self
            .solution
            .iter()
            .filter_map(|record| {
                record
                    .find_dependency(problem_id)
                    .filter(|dependency| !satisfied(dependency, problem))
                    .map(|dependency| constraint(record, dependency))
            })
            .collect();
        dependants.sort_by_key(|entry| entry.to_lowercase());

        let allowed = self
            .targets
            .iter()
            .find(|target| &target.id == problem_id)
            .and_then(|target| target.allowed.as_ref());

        let options: BTreeSet<&Version> = self
            .available
            .iter()
            .filter(|candidate| candidate.id() == problem_id)
            .filter_map(CandidateRecord::version)
            .collect();

        let mut message = if options.is_empty() || dependants.is_empty() {
            format!("Unable to resolve dependency '{}'.", problem_id)
        } else if options.len() == 1 && allowed.is_none() {
            let only = options.iter().next().map(|v| v.to_string()).unwrap_or_default();
            format!(
                "Unable to resolve dependencies. '{} {}' is not compatible with {}.",
                problem_id,
                only,
                dependants.join(", ")
            )
        } else {
            format!(
                "Unable to find a version of '{}' that is compatible with {}.",
                problem_id,
                dependants.join(", ")
            )
        };

        if let Some(range) = allowed {
            message.push_str(&format!(
                " '{}' has an additional constraint {} defined in the allowed versions.",
                problem_id,
                range.pretty()
            ));
        }

        message
    }
}

fn satisfied(dependency: &Dependency, chosen: Option<&CandidateRecord>) -> bool {
    chosen.map_or(false, |record| dependency.is_satisfied_by(record))
}

/// 'A 1.0.0 constraint: B (= 1.5.0)'
fn constraint(record: &CandidateRecord, dependency: &Dependency) -> String {
    format!("'{} constraint: {}'", record, dependency.pretty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DependencyBehavior;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn record(id: &str, version: &str, deps: Vec<(&str, &str)>) -> CandidateRecord {
        let deps = deps
            .into_iter()
            .map(|(dep, range)| Dependency::parse(dep, range).unwrap())
            .collect::<Vec<_>>();
        CandidateRecord::new(id, v(version), deps).unwrap()
    }

    fn new_targets(ids: &[&str]) -> ResolverConfig {
        let mut config = ResolverConfig::new(DependencyBehavior::Lowest);
        for id in ids {
            config.target_ids.insert(PackageId::new(*id));
            config.new_ids.insert(PackageId::new(*id));
        }
        config
    }

    #[test]
    fn test_unknown_dependency() {
        let available = vec![record("A", "1.0.0", vec![("Missing", "1.0")])];
        let partial = vec![&available[0]];
        let message = diagnose(&partial, &available, &new_targets(&["A"]), &[Target::new("A")]);
        assert_eq!(message, "Unable to resolve dependency 'Missing'.");
    }

    #[test]
    fn test_single_version_mismatch() {
        let available = vec![record("A", "1.0.0", vec![("B", "[1.5]")]), record("B", "1.4.0", vec![])];
        let partial = vec![&available[0]];
        let message = diagnose(&partial, &available, &new_targets(&["A"]), &[Target::new("A")]);
        assert_eq!(
            message,
            "Unable to resolve dependencies. 'B 1.4.0' is not compatible with 'A 1.0.0 constraint: B (= 1.5.0)'."
        );
    }

    #[test]
    fn test_competing_constraints() {
        let available = vec![
            record("A", "1.0.0", vec![("C", "[1.0]")]),
            record("B", "1.0.0", vec![("C", "[2.0]")]),
            record("C", "1.0.0", vec![]),
            record("C", "2.0.0", vec![]),
        ];
        let partial = vec![&available[0], &available[1]];
        let message = diagnose(
            &partial,
            &available,
            &new_targets(&["A", "B"]),
            &[Target::new("A"), Target::new("B")],
        );
        assert_eq!(
            message,
            "Unable to find a version of 'C' that is compatible with 'A 1.0.0 constraint: C (= 1.0.0)', 'B 1.0.0 constraint: C (= 2.0.0)'."
        );
    }

    #[test]
    fn test_broken_dependency_on_new_target() {
        // Installed B needs A 1.x but only A 2.0.0 could be chosen
        let available = vec![record("A", "2.0.0", vec![]), record("B", "1.0.0", vec![("A", "[1.0,2.0)")])];
        let mut config = new_targets(&["A", "B"]);
        config.new_ids.remove(&PackageId::new("B"));
        config.installed.insert(PackageId::new("B"), v("1.0.0"));

        let partial = vec![&available[0], &available[1]];
        let message = diagnose(&partial, &available, &config, &[Target::new("A"), Target::new("B")]);
        assert_eq!(
            message,
            "Unable to resolve dependencies. 'A 2.0.0' is not compatible with 'B 1.0.0 constraint: A (>= 1.0.0 && < 2.0.0)'."
        );
    }

    #[test]
    fn test_allowed_range_suffix() {
        let available = vec![
            record("A", "2.0.0", vec![]),
            record("B", "1.0.0", vec![("A", "[1.0,2.0)")]),
        ];
        let mut config = new_targets(&["A", "B"]);
        config.new_ids.remove(&PackageId::new("B"));
        config.installed.insert(PackageId::new("B"), v("1.0.0"));
        let targets = vec![
            Target::new("A").with_allowed(VersionRange::parse("[2.0,3.0)").unwrap()),
            Target::new("B"),
        ];

        let partial = vec![&available[0], &available[1]];
        let message = diagnose(&partial, &available, &config, &targets);
        assert_eq!(
            message,
            "Unable to find a version of 'A' that is compatible with 'B 1.0.0 constraint: A (>= 1.0.0 && < 2.0.0)'. 'A' has an additional constraint (>= 2.0.0 && < 3.0.0) defined in the allowed versions."
        );
    }

    #[test]
    fn test_transitive_dependency_reported() {
        let available = vec![
            record("A", "1.0.0", vec![("B", "1.0")]),
            record("B", "1.0.0", vec![("C", "[3.0]")]),
            record("C", "1.0.0", vec![]),
        ];
        let partial = vec![&available[0], &available[1]];
        let message = diagnose(&partial, &available, &new_targets(&["A"]), &[Target::new("A")]);
        assert_eq!(
            message,
            "Unable to resolve dependencies. 'C 1.0.0' is not compatible with 'B 1.0.0 constraint: C (= 3.0.0)'."
        );
    }

    #[test]
    fn test_nothing_found() {
        let available = vec![record("A", "1.0.0", vec![])];
        let partial = vec![&available[0]];
        let message = diagnose(&partial, &available, &new_targets(&["A"]), &[Target::new("A")]);
        assert_eq!(message, "Unable to resolve dependencies.");
    }

    #[test]
    fn test_lowest_distance_from_target() {
        let available = vec![
            record("A", "1.0.0", vec![("B", "1.0")]),
            record("B", "1.0.0", vec![("C", "1.0")]),
            record("C", "1.0.0", vec![]),
            record("D", "1.0.0", vec![]),
        ];
        let solution: Vec<&CandidateRecord> = available.iter().collect();
        let required: BTreeSet<PackageId> = [PackageId::new("A")].into_iter().collect();

        assert_eq!(lowest_distance_from_target(&PackageId::new("A"), &required, &solution), 0);
        assert_eq!(lowest_distance_from_target(&PackageId::new("c"), &required, &solution), 2);
        assert_eq!(
            lowest_distance_from_target(&PackageId::new("D"), &required, &solution),
            MAX_DISTANCE
        );
    }

    #[test]
    fn test_allowed_versions_message() {
        let range = VersionRange::exact(v("4.0.0"));
        assert_eq!(
            allowed_versions_message(&PackageId::new("A"), &range),
            "Unable to find a version of 'A' that satisfies the allowed versions (= 4.0.0)."
        );
    }
}

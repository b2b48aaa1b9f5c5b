//! Combination solver
//!
//! Depth-first search over the candidate groups, one choice per group. Groups
//! with fewer alternatives are visited first and each group is walked in
//! preference order, so the first conflict-free assignment found is the one
//! returned. The search keeps an explicit stack of frames instead of
//! recursing, which keeps deep dependency chains off the call stack and makes
//! the attempt budget a simple counter.
//!
//! Before searching, candidates with no support in a neighboring group are
//! pruned. During the search every frame records which earlier commitments
//! rejected its candidates, and an exhausted frame jumps straight back to the
//! deepest of them. Both only skip assignments that cannot be completed.

mod prune;

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::time::Instant;

use tracing::{debug, trace};

use pod_core::error::PodError;
use pod_core::types::{CandidateRecord, PackageId};
use pod_core::utils::CancellationToken;

use crate::config::ResolverOptions;
use crate::group::CandidateGroup;
use crate::policy::{ConflictPolicy, PreferencePolicy};
use crate::ResolverResult;

/// Backtracking search over candidate groups
pub struct CombinationSolver<'a> {
    preference: &'a dyn PreferencePolicy,
    conflict: &'a dyn ConflictPolicy,
    options: &'a ResolverOptions,
    cancel: &'a CancellationToken,
}

/// How a completed search ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome<'g> {
    /// One record per group, in search order
    Solved(Vec<&'g CandidateRecord>),
    /// Every combination conflicts; carries the assignment used to explain
    /// the failure
    Exhausted { best_partial: Vec<&'g CandidateRecord> },
}

/// Outcome plus search statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchReport<'g> {
    pub outcome: SearchOutcome<'g>,
    /// Candidates evaluated
    pub attempts: u64,
    /// Commitments undone
    pub backtracks: u64,
}

/// Position in one group of the search order
#[derive(Debug, Clone)]
struct Frame {
    group: usize,
    cursor: usize,
    /// Earlier frames whose commitments rejected a candidate of this one
    culprits: BTreeSet<usize>,
}

impl Frame {
    fn at(group: usize) -> Self {
        Self {
            group,
            cursor: 0,
            culprits: BTreeSet::new(),
        }
    }
}

type Ordered<'g> = Vec<(&'g CandidateGroup, Vec<&'g CandidateRecord>)>;

impl<'a> CombinationSolver<'a> {
    pub fn new(
        preference: &'a dyn PreferencePolicy,
        conflict: &'a dyn ConflictPolicy,
        options: &'a ResolverOptions,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            preference,
            conflict,
            options,
            cancel,
        }
    }

    /// Order groups for the search: fewest candidates first, then by id
    fn search_order<'g>(&self, groups: &'g [CandidateGroup]) -> Ordered<'g> {
        let mut ordered: Vec<&CandidateGroup> = groups.iter().collect();
        ordered.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.id().cmp(b.id())));

        ordered
            .into_iter()
            .map(|group| {
                let mut candidates: Vec<&CandidateRecord> = group.candidates().iter().collect();
                candidates.sort_by(|a, b| self.preference.compare(a, b));
                (group, candidates)
            })
            .collect()
    }

    /// Find the first conflict-free assignment covering every group
    ///
    /// Fails with `SearchBudgetExceeded` once more than `max_attempts`
    /// candidates have been evaluated or the timeout elapses, and with
    /// `Cancelled` when the token is observed set.
    pub fn find_solution<'g>(&self, groups: &'g [CandidateGroup]) -> ResolverResult<SearchReport<'g>> {
        let start = Instant::now();
        let order = self.search_order(groups);
        let poll_interval = self.options.poll_interval();
        let timeout = self.options.timeout();

        let mut attempts: u64 = 0;
        let mut backtracks: u64 = 0;
        let mut chosen: Vec<&'g CandidateRecord> = Vec::with_capacity(order.len());

        if order.is_empty() {
            return Ok(SearchReport {
                outcome: SearchOutcome::Solved(chosen),
                attempts,
                backtracks,
            });
        }

        let mut domains: Vec<Vec<&'g CandidateRecord>> =
            order.iter().map(|(_, candidates)| candidates.clone()).collect();
        let searched: Vec<&CandidateGroup> = order.iter().map(|(group, _)| *group).collect();
        if let Some(emptied) = prune::prune(&mut domains, &prune::adjacent_groups(&searched), self.conflict) {
            debug!("No candidate of {} can be part of a solution", searched[emptied].id());
            return Ok(SearchReport {
                outcome: SearchOutcome::Exhausted {
                    best_partial: self.explain(&order),
                },
                attempts,
                backtracks,
            });
        }
        self.cancel.check()?;

        let mut frames = vec![Frame::at(0)];

        // Frame `i` sits at position `i`; every frame except the top one has
        // its candidate in `chosen`
        while let Some(frame) = frames.last_mut() {
            let depth = frame.group;

            if frame.cursor >= domains[depth].len() {
                let culprits = std::mem::take(&mut frame.culprits);
                let Some(&target) = culprits.iter().next_back() else {
                    // Nothing committed caused this, so no assignment can work
                    break;
                };

                backtracks += (chosen.len() - target) as u64;
                trace!(
                    "Backtracking out of {} to {} after {} attempts",
                    order[depth].0.id(),
                    order[target].0.id(),
                    attempts
                );
                chosen.truncate(target);
                frames.truncate(target + 1);
                if let Some(parent) = frames.last_mut() {
                    parent.culprits.extend(culprits.into_iter().filter(|&culprit| culprit != target));
                    parent.cursor += 1;
                }
                continue;
            }

            attempts += 1;
            if attempts > self.options.max_attempts {
                return Err(budget_exceeded(attempts - 1, start));
            }
            if attempts % poll_interval == 0 {
                self.cancel.check()?;
                if timeout.map_or(false, |limit| start.elapsed() >= limit) {
                    return Err(budget_exceeded(attempts, start));
                }
            }

            let candidate = domains[depth][frame.cursor];
            if let Some(culprit) = chosen
                .iter()
                .position(|committed| self.conflict.conflicts(committed, candidate))
            {
                frame.culprits.insert(culprit);
                frame.cursor += 1;
                continue;
            }

            chosen.push(candidate);
            if chosen.len() == order.len() {
                return Ok(SearchReport {
                    outcome: SearchOutcome::Solved(chosen),
                    attempts,
                    backtracks,
                });
            }

            frames.push(Frame::at(depth + 1));
        }

        Ok(SearchReport {
            outcome: SearchOutcome::Exhausted {
                best_partial: self.explain(&order),
            },
            attempts,
            backtracks,
        })
    }

    /// Assignment handed to the diagnostic when no solution exists
    ///
    /// Starts at the groups that must be present, follows dependency edges
    /// breadth-first and commits each group's most preferred candidate that
    /// agrees with everything committed so far. Groups with no such candidate
    /// are skipped; groups never reached are visited last, by id.
    fn explain<'g>(&self, order: &[(&'g CandidateGroup, Vec<&'g CandidateRecord>)]) -> Vec<&'g CandidateRecord> {
        let index: HashMap<&PackageId, usize> = order
            .iter()
            .enumerate()
            .map(|(position, (group, _))| (group.id(), position))
            .collect();
        let by_id = |a: &usize, b: &usize| order[*a].0.id().cmp(order[*b].0.id());

        let mut roots: Vec<usize> = (0..order.len()).filter(|&i| !order[i].0.allows_absent()).collect();
        roots.sort_by(by_id);

        let mut visited = vec![false; order.len()];
        let mut queue: VecDeque<usize> = VecDeque::new();
        for root in roots {
            visited[root] = true;
            queue.push_back(root);
        }

        let mut walk: Vec<usize> = Vec::with_capacity(order.len());
        while let Some(position) = queue.pop_front() {
            walk.push(position);
            for dependency in order[position].1.iter().flat_map(|record| record.dependencies()) {
                if let Some(&next) = index.get(&dependency.id) {
                    if !visited[next] {
                        visited[next] = true;
                        queue.push_back(next);
                    }
                }
            }
        }

        let mut unreached: Vec<usize> = (0..order.len()).filter(|&i| !visited[i]).collect();
        unreached.sort_by(by_id);
        walk.extend(unreached);

        let mut chosen: Vec<&'g CandidateRecord> = Vec::with_capacity(walk.len());
        for position in walk {
            let fits = order[position]
                .1
                .iter()
                .copied()
                .find(|candidate| !chosen.iter().any(|committed| self.conflict.conflicts(committed, candidate)));
            if let Some(candidate) = fits {
                chosen.push(candidate);
            }
        }

        chosen
    }
}

fn budget_exceeded(attempts: u64, start: Instant) -> PodError {
    PodError::SearchBudgetExceeded {
        attempts,
        elapsed_ms: start.elapsed().as_millis() as u64,
    }
}

impl SearchOutcome<'_> {
    pub fn is_solved(&self) -> bool {
        matches!(self, SearchOutcome::Solved(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DependencyBehavior, ResolverConfig};
    use crate::policy::{BehaviorPolicy, DependencyConflict};
    use pod_core::types::{Dependency, PackageId, Version};
    use std::time::Duration;

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

    fn group(id: &str, mut candidates: Vec<CandidateRecord>, target: bool) -> CandidateGroup {
        if !target {
            candidates.push(CandidateRecord::absent(id));
        }
        CandidateGroup::new(id, candidates)
    }

    fn config(targets: &[&str]) -> ResolverConfig {
        let mut config = ResolverConfig::new(DependencyBehavior::Lowest);
        for id in targets {
            config.target_ids.insert(PackageId::new(*id));
            config.new_ids.insert(PackageId::new(*id));
        }
        config
    }

    fn run<'g>(
        groups: &'g [CandidateGroup],
        config: &ResolverConfig,
        options: &ResolverOptions,
        cancel: &CancellationToken,
    ) -> ResolverResult<SearchReport<'g>> {
        let policy = BehaviorPolicy::new(config);
        CombinationSolver::new(&policy, &DependencyConflict, options, cancel).find_solution(groups)
    }

    fn names(records: &[&CandidateRecord]) -> Vec<String> {
        records.iter().map(|r| r.to_string()).collect()
    }

    #[test]
    fn test_empty_input_is_solved() {
        let report = run(&[], &config(&[]), &ResolverOptions::default(), &CancellationToken::new()).unwrap();
        assert_eq!(report.outcome, SearchOutcome::Solved(Vec::new()));
        assert_eq!(report.attempts, 0);
    }

    #[test]
    fn test_picks_compatible_dependency() {
        let groups = vec![
            group("A", vec![record("A", "1.0.0", vec![("B", "[1.0,2.0)")])], true),
            group(
                "B",
                vec![record("B", "1.5.0", vec![]), record("B", "2.0.0", vec![])],
                false,
            ),
        ];

        let report = run(&groups, &config(&["A"]), &ResolverOptions::default(), &CancellationToken::new())
            .unwrap();
        let SearchOutcome::Solved(solution) = report.outcome else {
            panic!("expected a solution");
        };

        // A has one candidate and is searched first
        assert_eq!(names(&solution), vec!["A 1.0.0", "B 1.5.0"]);
        // Pruning leaves B 1.5.0 as the only candidate worth trying
        assert_eq!(report.backtracks, 0);
        assert_eq!(report.attempts, 2);
    }

    #[test]
    fn test_unneeded_package_stays_absent() {
        let groups = vec![
            group("A", vec![record("A", "1.0.0", vec![])], true),
            group("B", vec![record("B", "1.0.0", vec![])], false),
        ];

        let report = run(&groups, &config(&["A"]), &ResolverOptions::default(), &CancellationToken::new())
            .unwrap();
        let SearchOutcome::Solved(solution) = report.outcome else {
            panic!("expected a solution");
        };
        assert_eq!(names(&solution), vec!["A 1.0.0", "B (absent)"]);
    }

    /// A, B and Z are targets joined in a cycle. Every candidate is supported
    /// by some candidate of each neighbor, so pruning removes nothing, yet
    /// neither version of A closes the cycle through Z 1.0.0 or Z 2.0.0. Only
    /// `Z 3.0.0`, when offered, completes A 2.0.0 and B 2.0.0.
    fn cycle_groups(solvable: bool) -> Vec<CandidateGroup> {
        let mut z = vec![
            record("Z", "1.0.0", vec![("A", "[2.0]")]),
            record("Z", "2.0.0", vec![("A", "[1.0]")]),
        ];
        if solvable {
            z.push(record("Z", "3.0.0", vec![("A", "[2.0]")]));
        }

        vec![
            group(
                "A",
                vec![
                    record("A", "1.0.0", vec![("B", "[1.0]")]),
                    record("A", "2.0.0", vec![("B", "[2.0]")]),
                ],
                true,
            ),
            group(
                "B",
                vec![
                    record("B", "1.0.0", vec![("Z", "[1.0]")]),
                    record("B", "2.0.0", vec![("Z", "[2.0,3.0]")]),
                ],
                true,
            ),
            group("Z", z, true),
        ]
    }

    fn leaves(count: usize) -> Vec<CandidateGroup> {
        (0..count)
            .map(|i| {
                let id = format!("L{}", i);
                group(&id, vec![record(&id, "1.0.0", vec![])], false)
            })
            .collect()
    }

    #[test]
    fn test_backtracks_into_earlier_group() {
        let groups = cycle_groups(true);

        let report = run(&groups, &config(&["A", "B", "Z"]), &ResolverOptions::default(), &CancellationToken::new())
            .unwrap();
        let SearchOutcome::Solved(solution) = report.outcome else {
            panic!("expected a solution");
        };
        assert_eq!(names(&solution), vec!["A 2.0.0", "B 2.0.0", "Z 3.0.0"]);

        // Z rejects B 1.0.0 and A 1.0.0, and B 2.0.0 rejects A 1.0.0
        assert_eq!(report.backtracks, 2);
        assert_eq!(report.attempts, 12);
    }

    #[test]
    fn test_backjumps_over_unrelated_groups() {
        // Twenty independent leaves sit between B and Z in the search order;
        // revisiting their combinations would take millions of attempts
        let mut groups = cycle_groups(true);
        groups.extend(leaves(20));

        let options = ResolverOptions::default().with_max_attempts(100);
        let report = run(&groups, &config(&["A", "B", "Z"]), &options, &CancellationToken::new()).unwrap();
        let SearchOutcome::Solved(solution) = report.outcome else {
            panic!("expected a solution");
        };

        let chosen = names(&solution);
        assert_eq!(chosen[..2], ["A 2.0.0".to_string(), "B 2.0.0".to_string()]);
        assert_eq!(chosen.last().map(String::as_str), Some("Z 3.0.0"));
        assert!(solution[2..22].iter().all(|record| record.is_absent()));
        assert_eq!(report.attempts, 52);
        assert_eq!(report.backtracks, 22);
    }

    #[test]
    fn test_unsatisfiable_cycle_is_exhausted() {
        let mut groups = cycle_groups(false);
        groups.extend(leaves(20));

        let options = ResolverOptions::default().with_max_attempts(200);
        let report = run(&groups, &config(&["A", "B", "Z"]), &options, &CancellationToken::new()).unwrap();
        let SearchOutcome::Exhausted { best_partial } = report.outcome else {
            panic!("expected exhaustion");
        };

        // Targets first, then the leaves; Z fits neither A 1.0.0 nor B 1.0.0
        assert_eq!(best_partial.len(), 22);
        assert_eq!(names(&best_partial[..2]), vec!["A 1.0.0", "B 1.0.0"]);
        assert!(best_partial.iter().all(|record| record.id().as_str() != "Z"));
    }

    #[test]
    fn test_exhaustion_reports_best_partial() {
        let groups = vec![
            group("A", vec![record("A", "1.0.0", vec![("C", "[1.0]")])], true),
            group("B", vec![record("B", "1.0.0", vec![("C", "[2.0]")])], true),
            group(
                "C",
                vec![record("C", "1.0.0", vec![]), record("C", "2.0.0", vec![])],
                false,
            ),
        ];

        let report = run(&groups, &config(&["A", "B"]), &ResolverOptions::default(), &CancellationToken::new())
            .unwrap();
        assert!(!report.outcome.is_solved());
        let SearchOutcome::Exhausted { best_partial } = report.outcome else {
            panic!("expected exhaustion");
        };
        assert_eq!(names(&best_partial), vec!["A 1.0.0", "B 1.0.0"]);

        // No candidate of C survives pruning, so nothing was searched
        assert_eq!(report.attempts, 0);
    }

    #[test]
    fn test_attempt_budget_fails_closed() {
        let groups = vec![
            group("A", vec![record("A", "1.0.0", vec![("B", "[1.0,2.0)")])], true),
            group(
                "B",
                vec![record("B", "1.5.0", vec![]), record("B", "2.0.0", vec![])],
                false,
            ),
        ];

        let options = ResolverOptions::default().with_max_attempts(1);
        let err = run(&groups, &config(&["A"]), &options, &CancellationToken::new()).unwrap_err();
        assert!(matches!(err, PodError::SearchBudgetExceeded { attempts: 1, .. }));
    }

    #[test]
    fn test_exact_budget_is_enough() {
        let groups = vec![group("A", vec![record("A", "1.0.0", vec![])], true)];
        let options = ResolverOptions::default().with_max_attempts(1);
        let report = run(&groups, &config(&["A"]), &options, &CancellationToken::new()).unwrap();
        assert!(report.outcome.is_solved());
    }

    #[test]
    fn test_cancellation_is_polled() {
        let groups = vec![group("A", vec![record("A", "1.0.0", vec![])], true)];
        let options = ResolverOptions::default().with_poll_interval(1);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = run(&groups, &config(&["A"]), &options, &cancel).unwrap_err();
        assert_eq!(err, PodError::Cancelled);
    }

    #[test]
    fn test_timeout_fails_closed() {
        let groups = cycle_groups(true);
        let options = ResolverOptions::default()
            .with_timeout(Duration::ZERO)
            .with_poll_interval(1);

        let err = run(&groups, &config(&["A", "B", "Z"]), &options, &CancellationToken::new()).unwrap_err();
        assert!(matches!(err, PodError::SearchBudgetExceeded { attempts: 1, .. }));
    }

    #[test]
    fn test_search_order_is_by_size_then_id() {
        let groups = vec![
            group("A", vec![record("A", "1.0.0", vec![]), record("A", "2.0.0", vec![])], true),
            group("C", vec![record("C", "1.0.0", vec![])], true),
            group("B", vec![record("B", "1.0.0", vec![])], true),
        ];

        let report = run(&groups, &config(&["A", "B", "C"]), &ResolverOptions::default(), &CancellationToken::new())
            .unwrap();
        let SearchOutcome::Solved(solution) = report.outcome else {
            panic!("expected a solution");
        };
        assert_eq!(names(&solution), vec!["B 1.0.0", "C 1.0.0", "A 1.0.0"]);
    }
}

//! Resolver facade
//!
//! Validates the input, builds the candidate groups, drives the combination
//! solver and sequences the accepted records dependencies-first. All scratch
//! state lives in a `ResolveContext` created per call, so one `Resolver` can
//! serve concurrent callers.

use std::time::Instant;

use tracing::{debug, info};

use pod_core::error::PodError;
use pod_core::types::{CandidateRecord, PackageId, PackageIdentity, Target, Version};
use pod_core::utils::CancellationToken;

use crate::config::{DependencyBehavior, ResolverConfig, ResolverOptions};
use crate::diagnostic;
use crate::graph::SolutionGraph;
use crate::group::{self, CandidateGroup};
use crate::policy::{BehaviorPolicy, ConflictPolicy, DependencyConflict, PreferencePolicy};
use crate::solver::{CombinationSolver, SearchOutcome};
use crate::ResolverResult;

/// Main dependency resolver
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    options: ResolverOptions,
}

/// Result of dependency resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Chosen packages, dependencies first
    pub packages: Vec<PackageIdentity>,
    /// Candidates evaluated by the search
    pub attempts: u64,
    /// Resolution time in milliseconds
    pub resolution_time_ms: u64,
}

/// Per-call state shared by grouping, search and sequencing
struct ResolveContext<'a> {
    targets: &'a [Target],
    available: &'a [CandidateRecord],
    config: ResolverConfig,
    groups: Vec<CandidateGroup>,
    started: Instant,
}

impl<'a> ResolveContext<'a> {
    fn new(
        targets: &'a [Target],
        available: &'a [CandidateRecord],
        installed: &[PackageIdentity],
        behavior: DependencyBehavior,
        cancel: &CancellationToken,
    ) -> ResolverResult<Self> {
        let started = Instant::now();
        cancel.check()?;

        let config = group::validate(targets, available, installed, behavior)?;
        let groups = group::build_groups(targets, available, &config)?;

        Ok(Self {
            targets,
            available,
            config,
            groups,
            started,
        })
    }

    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

impl Resolver {
    /// Create a resolver with the given search budget
    pub fn new(options: ResolverOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Resolve `targets` against `available` using the behavior policy
    ///
    /// Returns the chosen identities dependencies-first; ids resolved to
    /// absent are left out.
    pub fn resolve(
        &self,
        targets: &[Target],
        available: &[CandidateRecord],
        installed: &[PackageIdentity],
        behavior: DependencyBehavior,
        cancel: &CancellationToken,
    ) -> ResolverResult<Resolution> {
        debug!(
            "Resolving {} targets from {} candidates ({}, {} installed)",
            targets.len(),
            available.len(),
            behavior,
            installed.len()
        );

        let context = ResolveContext::new(targets, available, installed, behavior, cancel)?;
        let preference = BehaviorPolicy::new(&context.config);
        self.run(&context, &preference, &DependencyConflict, cancel)
    }

    /// Resolve with caller supplied preference and conflict rules
    ///
    /// Validation and grouping still follow `behavior`.
    #[allow(clippy::too_many_arguments)]
    pub fn resolve_with(
        &self,
        targets: &[Target],
        available: &[CandidateRecord],
        installed: &[PackageIdentity],
        behavior: DependencyBehavior,
        preference: &dyn PreferencePolicy,
        conflict: &dyn ConflictPolicy,
        cancel: &CancellationToken,
    ) -> ResolverResult<Resolution> {
        debug!(
            "Resolving {} targets from {} candidates with custom policies",
            targets.len(),
            available.len()
        );

        let context = ResolveContext::new(targets, available, installed, behavior, cancel)?;
        self.run(&context, preference, conflict, cancel)
    }

    fn run(
        &self,
        context: &ResolveContext<'_>,
        preference: &dyn PreferencePolicy,
        conflict: &dyn ConflictPolicy,
        cancel: &CancellationToken,
    ) -> ResolverResult<Resolution> {
        let solver = CombinationSolver::new(preference, conflict, &self.options, cancel);
        let report = solver.find_solution(&context.groups).map_err(|err| {
            debug!("Search stopped: {}", err);
            err
        })?;

        let solution = match report.outcome {
            SearchOutcome::Solved(solution) => solution,
            SearchOutcome::Exhausted { best_partial } => {
                let message = diagnostic::diagnose(
                    &best_partial,
                    context.available,
                    &context.config,
                    context.targets,
                );
                debug!(
                    "No solution after {} attempts and {} backtracks: {}",
                    report.attempts, report.backtracks, message
                );
                return Err(PodError::no_solution(message));
            },
        };

        cancel.check()?;

        let graph = SolutionGraph::new(solution);
        graph.validate_no_cycles().map_err(|err| {
            debug!("Rejecting solution: {}", err);
            err
        })?;

        let packages: Vec<PackageIdentity> = graph
            .dependencies_first()?
            .into_iter()
            .filter_map(CandidateRecord::identity)
            .collect();

        let resolution_time_ms = context.elapsed_ms();
        info!(
            "Resolved {} packages in {} ms ({} attempts)",
            packages.len(),
            resolution_time_ms,
            report.attempts
        );

        Ok(Resolution {
            packages,
            attempts: report.attempts,
            resolution_time_ms,
        })
    }
}

impl Resolution {
    /// Get number of packages chosen
    pub fn package_count(&self) -> usize {
        self.packages.len()
    }

    /// Version chosen for `id`, if it is part of the result
    pub fn version_of(&self, id: &PackageId) -> Option<&Version> {
        self.packages
            .iter()
            .find(|identity| &identity.id == id)
            .map(|identity| &identity.version)
    }

    pub fn contains(&self, id: &PackageId) -> bool {
        self.version_of(id).is_some()
    }
}

//! Dependency resolution engine for pod
//!
//! This crate turns a set of target packages, a universe of candidate records
//! and the currently installed packages into one consistent, deterministic,
//! dependencies-first installation order.

pub mod config;
pub mod diagnostic;
pub mod graph;
pub mod group;
pub mod policy;
pub mod resolver;
pub mod solver;

// Re-export main types
pub use config::{DependencyBehavior, ResolverConfig, ResolverOptions};
pub use group::CandidateGroup;
pub use policy::{BehaviorPolicy, ConflictPolicy, DependencyConflict, PreferencePolicy};
pub use resolver::{Resolution, Resolver};
pub use solver::{CombinationSolver, SearchOutcome, SearchReport};

use pod_core::error::PodError;

/// Result type for resolver operations
pub type ResolverResult<T> = Result<T, PodError>;

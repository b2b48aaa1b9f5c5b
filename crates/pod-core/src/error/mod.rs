//! Error types and result aliases for pod operations.
//!
//! Provides a unified error type that covers every failure the resolver can
//! report, split into malformed input, unsatisfiable constraints, exhausted
//! search budgets and cancellation.

use thiserror::Error;

use crate::types::version::VersionError;

/// Unified error type for all pod operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PodError {
    // Input errors
    #[error("At least one target package is required")]
    NoTargets,

    #[error("Target package '{id}' was requested more than once")]
    DuplicateTarget { id: String },

    #[error("Unable to find dependency information for '{id}'")]
    MissingDependencyInfo { id: String },

    #[error("Installed package '{id}' must also be listed as a target")]
    InstalledNotInTargets { id: String },

    #[error("Package '{id}' is installed with more than one version")]
    DuplicateInstalled { id: String },

    #[error("Package '{package}' declares more than one dependency on '{dependency}'")]
    DuplicateDependency { package: String, dependency: String },

    #[error("Invalid version '{input}': {reason}")]
    InvalidVersion { input: String, reason: String },

    #[error("Invalid version range '{input}': {reason}")]
    InvalidVersionRange { input: String, reason: String },

    #[error("Failed to parse resolver options: {message}")]
    ConfigParse { message: String },

    // Resolution errors
    #[error("{message}")]
    NoSolution { message: String },

    #[error("Circular dependency detected '{cycle}'.")]
    CircularDependency { cycle: String },

    #[error("Resolver gave up after {attempts} attempts ({elapsed_ms} ms)")]
    SearchBudgetExceeded { attempts: u64, elapsed_ms: u64 },

    // Cancellation
    #[error("Resolution was cancelled")]
    Cancelled,
}

/// Result type alias for pod operations
pub type PodResult<T> = Result<T, PodError>;

impl PodError {
    /// Create a no-solution error carrying a diagnostic message
    pub fn no_solution(message: impl Into<String>) -> Self {
        Self::NoSolution {
            message: message.into(),
        }
    }

    /// Check if this error was caused by malformed caller input
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            PodError::NoTargets
                | PodError::DuplicateTarget { .. }
                | PodError::MissingDependencyInfo { .. }
                | PodError::InstalledNotInTargets { .. }
                | PodError::DuplicateInstalled { .. }
                | PodError::DuplicateDependency { .. }
                | PodError::InvalidVersion { .. }
                | PodError::InvalidVersionRange { .. }
                | PodError::ConfigParse { .. }
        )
    }

    /// Check if the constraints themselves could not be satisfied
    pub fn is_constraint_error(&self) -> bool {
        matches!(
            self,
            PodError::NoSolution { .. } | PodError::CircularDependency { .. }
        )
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            PodError::MissingDependencyInfo { .. } => {
                Some("Make sure every target and installed package has at least one candidate")
            },
            PodError::InstalledNotInTargets { .. } => {
                Some("List every installed package as a target so it is not silently dropped")
            },
            PodError::NoSolution { .. } => {
                Some("Try a different dependency behavior or relax the version constraints")
            },
            PodError::CircularDependency { .. } => {
                Some("Remove circular dependencies by restructuring your packages")
            },
            PodError::SearchBudgetExceeded { .. } => {
                Some("Raise max_attempts or timeout_ms in the resolver options")
            },
            _ => None,
        }
    }
}

impl From<VersionError> for PodError {
    fn from(err: VersionError) -> Self {
        match err {
            VersionError::InvalidRange { input, reason } => {
                PodError::InvalidVersionRange { input, reason }
            },
            other => PodError::InvalidVersion {
                input: other.input().to_string(),
                reason: other.to_string(),
            },
        }
    }
}

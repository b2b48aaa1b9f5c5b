//! Core data types for pod package resolution.
//!
//! This module provides the fundamental types used throughout the resolver:
//! - Version and version range types
//! - Package identifiers and identities
//! - Dependency specifications and candidate records

pub mod dependency;
pub mod package;
pub mod version;

// Re-export all public types
pub use dependency::Dependency;
pub use package::{CandidateRecord, PackageId, PackageIdentity, Target};
pub use version::{Version, VersionRange};

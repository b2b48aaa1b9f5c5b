//! # pod-core
//!
//! Core types and utilities shared across all pod crates.
//!
//! This crate provides:
//! - Version and VersionRange types with a total version ordering
//! - PackageId, PackageIdentity, Dependency and CandidateRecord types
//! - PodError enum for unified error handling
//! - A cooperative cancellation token
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Core data types (Version, CandidateRecord, etc.)
//! - `error`: Error types and result aliases
//! - `utils`: Utility types shared by the resolver and its callers

pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{PodError, PodResult};
pub use types::{
    CandidateRecord, Dependency, PackageId, PackageIdentity, Target, Version, VersionRange,
};
pub use utils::CancellationToken;

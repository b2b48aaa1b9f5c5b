//! Utility types and helpers.
//!
//! Common functionality used across multiple pod crates.

pub mod cancel;

// Re-export commonly used utilities
pub use cancel::CancellationToken;

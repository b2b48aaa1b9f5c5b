//! Pod benchmarking suite
//!
//! Benchmarks for the resolver pipeline and the version primitives it leans
//! on, plus the synthetic candidate universes they run against.

pub mod common;

pub use common::*;

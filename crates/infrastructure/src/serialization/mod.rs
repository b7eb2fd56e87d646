//! Deterministic JSON serialization for persisted Arbor state.
//!
//! Files are written with 2-space indentation and a trailing newline, and
//! map-backed types keep their keys sorted, so rewrites produce clean diffs.

mod json;

pub use json::*;

//! Structured diagnostics for directory walks.
//!
//! Deterministic, sortable records of what a walk skipped and why, and of the
//! subtrees it could not read.

pub mod walk_diagnostics;

pub use walk_diagnostics::{DiagnosticStage, SkipReason, WalkDiagnostic};

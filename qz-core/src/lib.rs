#![warn(missing_docs)]
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

/// Core domain models for quiz grading.
///
/// This module contains the records read from the submission feed, the
/// per-student aggregate built from them, and the persisted score record.
///
/// The models are primarily data structures with minimal business logic. The
/// grouping, filtering, and scoring rules that operate on them live in the
/// engine crate.
pub mod models;

/// Interface traits for quiz grading.
///
/// This module contains the "ports" in the hexagonal architecture pattern:
/// the key-value contract that storage backends implement, and the error type
/// the engine reports when a backend fails.
pub mod ports;

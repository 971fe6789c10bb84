#![warn(missing_docs)]
// Note: this overwrites the link in the README to point to the rust docs of the qz-core crate.
//! [qz_core]: https://docs.rs/qz_core/latest/qz_core/index.html
#![doc = include_str!("../README.md")]

pub mod aggregate;
pub mod config;
mod error;
pub mod filter;
pub mod grading;
pub mod record_store;
mod session;

pub use error::GradeError;
pub use session::{ScoreBook, ScoreUpdate, Session};

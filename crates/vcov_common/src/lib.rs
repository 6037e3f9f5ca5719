//! Shared foundational types used across the vcov coverage instrumenter.
//!
//! This crate provides interned identifiers for generated coverage names and
//! genvar environments, plus the internal-error result type used to report
//! broken invariants.

#![warn(missing_docs)]

pub mod ident;
pub mod result;

pub use ident::{Ident, Interner};
pub use result::{InternalError, VcovResult};

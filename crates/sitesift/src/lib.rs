//! Public facade crate for `sitesift`.
//!
//! This crate intentionally contains no IO or transport-specific logic.
//! It re-exports the backend-agnostic types/traits from `sitesift-core`.

pub use sitesift_core::*;

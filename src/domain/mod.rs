//! Domain layer types and invariants.

pub mod diagnostics;
pub mod error;
pub mod render;

//! Core traits, diagnostics, errors, and serialization payloads.

pub mod engine;
pub mod serialization;

pub use engine::*;
pub use serialization::*;

//! Solver engine implementations.

pub mod hjb;

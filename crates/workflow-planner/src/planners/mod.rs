//! Planner implementations.

pub mod heft;
pub mod pch;

//! Constraint solving for Trellis layouts.
//!
//! This crate implements the Cassowary linear constraint solving algorithm
//! with the pieces the layout engine needs:
//! - an incremental simplex tableau with constraint strengths
//! - edit variables whose suggested values override rather than accumulate
//! - batched constraint addition, so contradictions between required
//!   constraints surface at solve time rather than add time

mod cassowary;

pub use cassowary::{
    Constraint, Expression, Relation, Solver, Strength, Variable, EPSILON,
};

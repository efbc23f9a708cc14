//! Core types and errors for the Trellis layout engine.
//!
//! This crate provides the foundational types used across the other trellis
//! crates:
//! - Geometry types (`Rect`, `CellSpan`, `GridSpec`)
//! - Identities of external objects (`PanelId`, `GridId`)
//! - Error types

pub mod errors;
pub mod types;

pub use errors::*;
pub use types::*;

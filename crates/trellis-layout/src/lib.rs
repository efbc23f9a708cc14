//! Constraint-based panel layout for nested grids.
//!
//! This crate positions rectangular panels arranged in (possibly nested)
//! grids so that none of their decorations overlap, while respecting
//! relative-size ratios and padding requests.  It is a geometry subsystem,
//! not a renderer: measured bounding boxes come in through the [`Renderer`]
//! trait, resolved rectangles go back out through the [`Figure`] trait.
//!
//! # Architecture
//!
//! 1. **Box tree**: an arena of constrained rectangles sharing one solver
//! 2. **Grid math**: fractional cell rectangles for (spanning) grid cells
//! 3. **Algebra**: stacking, alignment and size-matching constraint emitters
//! 4. **Engine**: the two-pass orchestrator behind [`run_layout`]
//!
//! # Example
//!
//! ```
//! use trellis_core::{CellSpan, GridSpec};
//! use trellis_layout::{run_layout, MemFigure};
//!
//! let (mut figure, renderer) = MemFigure::new(800.0, 600.0);
//! let grid = figure.add_grid(GridSpec::new(2, 2));
//! for cell in 0..4 {
//!     figure.add_panel(grid, CellSpan::cell(cell));
//! }
//! run_layout(&mut figure, &renderer, 0.02, 0.02).unwrap();
//! ```

mod algebra;
mod engine;
mod grid;
mod host;
mod tree;

pub use algebra::{
    align, hstack, hstack_eq, match_dimension, match_edge_margins, match_heights,
    match_margins, match_widths, vstack, vstack_eq,
};
pub use engine::run_layout;
pub use grid::{cell_box, cell_fraction, occupancy};
pub use host::{Decorations, Figure, MemFigure, MemRenderer, Renderer};
pub use tree::{Attr, BoxFlags, BoxId, BoxTree, Dim, Side};

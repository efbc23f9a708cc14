//! Core value types for the Trellis layout engine.

use glam::Vec2;

use crate::errors::ConfigError;

/// Identity of an external panel (the visual element a layout position is
/// written back to).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PanelId(pub u64);

/// Identity of an external grid specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridId(pub u64);

/// Axis-aligned rectangle with a y-up origin at the lower-left corner.
///
/// The same type is used for device-space rectangles (pixels) and
/// figure-normalized rectangles ([0,1] x [0,1]).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Create a rectangle from its lower-left corner and size.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Create a rectangle from its two corners.
    pub fn from_extents(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        }
    }

    /// Get the right edge (x + width).
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Get the top edge (y + height).
    pub fn top(&self) -> f64 {
        self.y + self.height
    }

    /// Get the center X coordinate.
    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    /// Get the center Y coordinate.
    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    /// Get the lower-left corner as a Vec2.
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x as f32, self.y as f32)
    }

    /// Get the size as a Vec2.
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }

    /// Check if a point is inside the rectangle.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.top()
    }

    /// Compute the union (bounding box) with another rectangle.
    pub fn union(&self, other: &Rect) -> Rect {
        let x0 = self.x.min(other.x);
        let y0 = self.y.min(other.y);
        let x1 = self.right().max(other.right());
        let y1 = self.top().max(other.top());
        Rect::from_extents(x0, y0, x1, y1)
    }

    /// Grow the rectangle outward by per-side amounts.
    pub fn expand(&self, left: f64, right: f64, bottom: f64, top: f64) -> Rect {
        Rect::from_extents(
            self.x - left,
            self.y - bottom,
            self.right() + right,
            self.top() + top,
        )
    }

    /// Check whether the interiors of two rectangles intersect.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.top()
            && other.y < self.top()
    }
}

/// A panel's slot within a grid, as linear cell indices in row-major order
/// with row 0 at the top of the grid.
///
/// `end == None` means the span covers the single `start` cell.  A spanning
/// cell covers the rectangular block between the two corner cells: the union
/// of their row ranges and column ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellSpan {
    pub start: usize,
    pub end: Option<usize>,
}

impl CellSpan {
    /// A single-cell span.
    pub fn cell(index: usize) -> Self {
        Self { start: index, end: None }
    }

    /// A span between two linear cell indices (inclusive).
    pub fn range(start: usize, end: usize) -> Self {
        Self { start, end: Some(end) }
    }

    /// The two corner cells (equal for single-cell spans).
    pub fn corners(&self) -> (usize, usize) {
        (self.start, self.end.unwrap_or(self.start))
    }

    /// Inclusive (min, max) row indices covered, given the grid's column
    /// count.
    pub fn row_range(&self, cols: usize) -> (usize, usize) {
        let (a, b) = self.corners();
        let (ra, rb) = (a / cols, b / cols);
        (ra.min(rb), ra.max(rb))
    }

    /// Inclusive (min, max) column indices covered, given the grid's column
    /// count.
    pub fn col_range(&self, cols: usize) -> (usize, usize) {
        let (a, b) = self.corners();
        let (ca, cb) = (a % cols, b % cols);
        (ca.min(cb), ca.max(cb))
    }

    /// Number of rows covered.
    pub fn row_extent(&self, cols: usize) -> usize {
        let (lo, hi) = self.row_range(cols);
        hi - lo + 1
    }

    /// Number of columns covered.
    pub fn col_extent(&self, cols: usize) -> usize {
        let (lo, hi) = self.col_range(cols);
        hi - lo + 1
    }

    /// Whether the two spans cover at least one common row.  This is an
    /// overlap test, not an equality test, so spans of different extents
    /// still compare.
    pub fn same_row(&self, other: &CellSpan, cols: usize) -> bool {
        let (a0, a1) = self.row_range(cols);
        let (b0, b1) = other.row_range(cols);
        a0 <= b1 && b0 <= a1
    }

    /// Whether the two spans cover at least one common column.
    pub fn same_col(&self, other: &CellSpan, cols: usize) -> bool {
        let (a0, a1) = self.col_range(cols);
        let (b0, b1) = other.col_range(cols);
        a0 <= b1 && b0 <= a1
    }
}

/// Geometry descriptor of one grid: row/column counts, optional relative
/// size weights, and inter-cell spacing fractions.
///
/// Weights are relative: they are normalized so that they sum to the
/// row/column count before use.  Spacing is expressed as a fraction of the
/// mean cell size, inserted between adjacent cells.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridSpec {
    pub rows: usize,
    pub cols: usize,
    pub row_weights: Option<Vec<f64>>,
    pub col_weights: Option<Vec<f64>>,
    pub wspace: f64,
    pub hspace: f64,
}

impl GridSpec {
    /// A uniform grid with no spacing.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            row_weights: None,
            col_weights: None,
            wspace: 0.0,
            hspace: 0.0,
        }
    }

    /// Set relative row heights.
    pub fn with_row_weights(mut self, weights: Vec<f64>) -> Self {
        self.row_weights = Some(weights);
        self
    }

    /// Set relative column widths.
    pub fn with_col_weights(mut self, weights: Vec<f64>) -> Self {
        self.col_weights = Some(weights);
        self
    }

    /// Set inter-cell spacing fractions.
    pub fn with_spacing(mut self, wspace: f64, hspace: f64) -> Self {
        self.wspace = wspace;
        self.hspace = hspace;
        self
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        self.rows * self.cols
    }

    /// Check the descriptor for internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rows == 0 || self.cols == 0 {
            return Err(ConfigError::MalformedGrid {
                reason: format!("grid must have at least one cell, got {}x{}", self.rows, self.cols),
            });
        }
        if let Some(w) = &self.row_weights {
            if w.len() != self.rows {
                return Err(ConfigError::MalformedGrid {
                    reason: format!("{} row weights for {} rows", w.len(), self.rows),
                });
            }
            if w.iter().any(|r| !r.is_finite() || *r <= 0.0) {
                return Err(ConfigError::MalformedGrid {
                    reason: "row weights must be finite and positive".to_string(),
                });
            }
        }
        if let Some(w) = &self.col_weights {
            if w.len() != self.cols {
                return Err(ConfigError::MalformedGrid {
                    reason: format!("{} column weights for {} columns", w.len(), self.cols),
                });
            }
            if w.iter().any(|r| !r.is_finite() || *r <= 0.0) {
                return Err(ConfigError::MalformedGrid {
                    reason: "column weights must be finite and positive".to_string(),
                });
            }
        }
        if self.wspace < 0.0 || self.hspace < 0.0 {
            return Err(ConfigError::MalformedGrid {
                reason: "spacing fractions must be non-negative".to_string(),
            });
        }
        Ok(())
    }

    /// Check that a span's corner cells lie inside this grid.
    pub fn validate_span(&self, span: &CellSpan) -> Result<(), ConfigError> {
        let (a, b) = span.corners();
        if a > b {
            return Err(ConfigError::MalformedGrid {
                reason: format!("inverted cell span {}..{}", a, b),
            });
        }
        if b >= self.cell_count() {
            return Err(ConfigError::MalformedGrid {
                reason: format!("cell {} outside a {}x{} grid", b, self.rows, self.cols),
            });
        }
        Ok(())
    }
}

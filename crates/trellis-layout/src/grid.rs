//! Grid-cell geometry: fractional cell rectangles and occupancy.
//!
//! Rows are indexed from the top of the grid; the fractional rectangles are
//! expressed in the parent box's y-up unit square, so row 0 sits against
//! y = 1.

use trellis_core::{CellSpan, ConfigError, GridSpec, LayoutError, Rect};
use trellis_constraint::Strength;

use crate::tree::{BoxFlags, BoxId, BoxTree};

/// Fractional offset and extent of a (possibly spanning) cell within its
/// grid's unit square.
///
/// Weights are normalized so they sum to the row/column count; spacing
/// fractions of the mean cell size separate adjacent cells.  A spanning cell
/// covers the union of its corner cells, spacing included.
pub fn cell_fraction(spec: &GridSpec, span: &CellSpan) -> Result<Rect, ConfigError> {
    spec.validate()?;
    spec.validate_span(span)?;

    let rows = spec.rows as f64;
    let cols = spec.cols as f64;

    let cell_h = 1.0 / (rows + spec.hspace * (rows - 1.0));
    let sep_h = spec.hspace * cell_h;
    let heights: Vec<f64> = match &spec.row_weights {
        Some(weights) => {
            let total: f64 = weights.iter().sum();
            let net = cell_h * rows;
            weights.iter().map(|w| net * w / total).collect()
        }
        None => vec![cell_h; spec.rows],
    };

    let cell_w = 1.0 / (cols + spec.wspace * (cols - 1.0));
    let sep_w = spec.wspace * cell_w;
    let widths: Vec<f64> = match &spec.col_weights {
        Some(weights) => {
            let total: f64 = weights.iter().sum();
            let net = cell_w * cols;
            weights.iter().map(|w| net * w / total).collect()
        }
        None => vec![cell_w; spec.cols],
    };

    let (rmin, rmax) = span.row_range(spec.cols);
    let (cmin, cmax) = span.col_range(spec.cols);

    let top = 1.0 - (heights[..rmin].iter().sum::<f64>() + sep_h * rmin as f64);
    let bottom =
        1.0 - (heights[..=rmax].iter().sum::<f64>() + sep_h * rmax as f64);
    let left = widths[..cmin].iter().sum::<f64>() + sep_w * cmin as f64;
    let right = widths[..=cmax].iter().sum::<f64>() + sep_w * cmax as f64;

    Ok(Rect::from_extents(left, bottom, right, top))
}

/// Create a child box pinned to a grid cell of the parent box.
pub fn cell_box(
    tree: &mut BoxTree,
    parent: BoxId,
    spec: &GridSpec,
    span: &CellSpan,
    name: impl Into<String>,
    flags: BoxFlags,
) -> Result<BoxId, LayoutError> {
    let frac = cell_fraction(spec, span)?;
    let id = tree.new_box(Some(parent), name, flags)?;
    tree.constrain_fraction_of(id, parent, frac, Strength::Strong);
    Ok(id)
}

/// Which cells of a grid are covered by the given spans.
///
/// A span covers its full rectangular block: the union of the row and column
/// ranges of its corner cells.
pub fn occupancy(spec: &GridSpec, spans: &[CellSpan]) -> Result<Vec<bool>, ConfigError> {
    spec.validate()?;
    let mut covered = vec![false; spec.cell_count()];
    for span in spans {
        spec.validate_span(span)?;
        let (rmin, rmax) = span.row_range(spec.cols);
        let (cmin, cmax) = span.col_range(spec.cols);
        for row in rmin..=rmax {
            for col in cmin..=cmax {
                covered[row * spec.cols + col] = true;
            }
        }
    }
    Ok(covered)
}

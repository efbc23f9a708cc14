//! Layout orchestration: the two-pass constrained layout driver.
//!
//! One [`run_layout`] call builds a fresh box tree for the figure's grid
//! hierarchies, feeds measured decoration overage into margin bounds, emits
//! adjacency/alignment/size constraints between sibling panels, resolves the
//! shared solver and writes the resulting rectangles back onto the panels.
//! Two passes are run so that decoration measurements taken at the adjusted
//! positions can settle.

use std::collections::HashMap;

use log::{debug, warn};
use trellis_constraint::{Expression, Relation, Strength};
use trellis_core::{ConfigError, GridId, LayoutError, PanelId, Rect};

use crate::algebra;
use crate::grid;
use crate::host::{Figure, Renderer};
use crate::tree::{Attr, BoxFlags, BoxId, BoxTree, Dim, Side};

/// Weak lower bound keeping panels from collapsing to nothing when
/// decorations overwhelm the available space.
const MIN_PANEL_SIZE: f64 = 0.05;

/// Phases of one layout pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LayoutPhase {
    FillGaps,
    ArrangeHierarchy,
    ApplyMargins,
    MatchSizes,
    Solve,
    Writeback,
}

/// The first pass builds the hierarchy; later passes only refresh margins
/// and re-solve.
const FIRST_PASS: &[LayoutPhase] = &[
    LayoutPhase::FillGaps,
    LayoutPhase::ArrangeHierarchy,
    LayoutPhase::ApplyMargins,
    LayoutPhase::MatchSizes,
    LayoutPhase::Solve,
    LayoutPhase::Writeback,
];
const SETTLE_PASS: &[LayoutPhase] = &[
    LayoutPhase::ApplyMargins,
    LayoutPhase::Solve,
    LayoutPhase::Writeback,
];

struct PanelBoxes {
    container: BoxId,
    position: BoxId,
}

/// Per-invocation orchestrator state.  Nothing survives between calls, so
/// repeated invocations on different figures cannot interfere.
struct LayoutContext {
    tree: BoxTree,
    root: BoxId,
    title: Option<BoxId>,
    grid_boxes: HashMap<GridId, BoxId>,
    panel_boxes: HashMap<PanelId, PanelBoxes>,
    panels: Vec<PanelId>,
    grids: Vec<GridId>,
}

impl LayoutContext {
    fn new(grids: Vec<GridId>) -> Result<Self, LayoutError> {
        let mut tree = BoxTree::new();
        let root = tree.new_box(None, "figure", BoxFlags::default())?;
        tree.set_geometry(root, Rect::new(0.0, 0.0, 1.0, 1.0), Strength::Strong);
        Ok(Self {
            tree,
            root,
            title: None,
            grid_boxes: HashMap::new(),
            panel_boxes: HashMap::new(),
            panels: Vec::new(),
            grids,
        })
    }
}

/// Run the constrained layout for a figure.
///
/// `h_pad` and `w_pad` are figure-normalized padding added around every
/// panel's decorations.  On success every participating panel's position has
/// been overwritten; on error (or when no panel belongs to a grid) the
/// figure is left untouched.
pub fn run_layout<F: Figure, R: Renderer>(
    figure: &mut F,
    renderer: &R,
    h_pad: f64,
    w_pad: f64,
) -> Result<(), LayoutError> {
    validate_pad(h_pad)?;
    validate_pad(w_pad)?;

    let grids = discover_grids(figure);
    if grids.is_empty() {
        warn!("constrained layout skipped: no panel belongs to a grid");
        return Ok(());
    }

    let mut ctx = LayoutContext::new(grids)?;
    for pass in 0..2 {
        let phases = if pass == 0 { FIRST_PASS } else { SETTLE_PASS };
        for &phase in phases {
            match phase {
                LayoutPhase::FillGaps => fill_gaps(&ctx, figure)?,
                LayoutPhase::ArrangeHierarchy => arrange_hierarchy(&mut ctx, figure, renderer)?,
                LayoutPhase::ApplyMargins => {
                    apply_margins(&mut ctx, figure, renderer, h_pad, w_pad)?
                }
                LayoutPhase::MatchSizes => match_sizes(&mut ctx, figure),
                LayoutPhase::Solve => ctx.tree.solve()?,
                LayoutPhase::Writeback => writeback(&ctx, figure),
            }
        }
        debug!("constrained layout pass {pass} complete");
    }
    Ok(())
}

fn validate_pad(pad: f64) -> Result<(), ConfigError> {
    if !pad.is_finite() || pad < 0.0 || pad >= 0.5 {
        return Err(ConfigError::InvalidPadding { value: pad });
    }
    Ok(())
}

/// Unique grids that own at least one panel, in first-seen order.
fn discover_grids<F: Figure>(figure: &F) -> Vec<GridId> {
    let mut grids = Vec::new();
    for panel in figure.panels() {
        if let Some(grid) = figure.grid_of(panel) {
            if !grids.contains(&grid) {
                grids.push(grid);
            }
        }
    }
    grids
}

/// Synthesize an invisible placeholder panel for every unoccupied grid cell.
/// Without one the solver has no box for the cell and the remaining panels
/// silently take the whole grid.
fn fill_gaps<F: Figure>(ctx: &LayoutContext, figure: &mut F) -> Result<(), LayoutError> {
    for &gid in &ctx.grids {
        let spec = figure.grid_spec(gid);
        let spans: Vec<_> = figure
            .panels()
            .into_iter()
            .filter(|&p| figure.grid_of(p) == Some(gid))
            .map(|p| figure.cell_span(p))
            .collect();
        let coverage = grid::occupancy(&spec, &spans)?;
        for (cell, &covered) in coverage.iter().enumerate() {
            if !covered {
                figure.insert_placeholder(gid, cell);
                debug!("inserted placeholder for grid {} cell {cell}", gid.0);
            }
        }
    }
    Ok(())
}

/// Build the box tree: the title box, every grid box (nested grids
/// recursively, pinned to their parent cell), and a container plus position
/// box per panel.
fn arrange_hierarchy<F: Figure, R: Renderer>(
    ctx: &mut LayoutContext,
    figure: &F,
    renderer: &R,
) -> Result<(), LayoutError> {
    if renderer.suptitle_bbox().is_some() {
        let title = ctx.tree.new_box(
            Some(ctx.root),
            "figure.title",
            BoxFlags {
                tight_height: true,
                ..BoxFlags::default()
            },
        )?;
        for attr in [Attr::Left, Attr::Right, Attr::Top] {
            let expr = Expression::from_variable(ctx.tree.attr_var(title, attr))
                .term(ctx.tree.attr_var(ctx.root, attr), -1.0);
            ctx.tree.add(expr, Relation::Equal, Strength::Strong);
        }
        ctx.title = Some(title);
    }

    let grids = ctx.grids.clone();
    for gid in grids {
        ensure_grid_box(ctx, figure, gid)?;
    }

    for panel in figure.panels() {
        let Some(gid) = figure.grid_of(panel) else {
            continue;
        };
        let Some(&grid_box) = ctx.grid_boxes.get(&gid) else {
            continue;
        };
        let spec = figure.grid_spec(gid);
        let span = figure.cell_span(panel);
        let container = grid::cell_box(
            &mut ctx.tree,
            grid_box,
            &spec,
            &span,
            format!("panel{}.cell", panel.0),
            BoxFlags::default(),
        )?;
        let position = ctx.tree.new_box(
            Some(container),
            format!("panel{}.pos", panel.0),
            BoxFlags::position(),
        )?;
        ctx.panel_boxes
            .insert(panel, PanelBoxes { container, position });
        ctx.panels.push(panel);
    }
    Ok(())
}

/// Create the box for a grid, recursing into parent grids first.  Top-level
/// grids span the content area below the title; nested grids are pinned to
/// their parent cell.
fn ensure_grid_box<F: Figure>(
    ctx: &mut LayoutContext,
    figure: &F,
    gid: GridId,
) -> Result<BoxId, LayoutError> {
    if let Some(&existing) = ctx.grid_boxes.get(&gid) {
        return Ok(existing);
    }
    let id = match figure.parent_cell(gid) {
        Some((parent, span)) => {
            let parent_box = ensure_grid_box(ctx, figure, parent)?;
            let spec = figure.grid_spec(parent);
            grid::cell_box(
                &mut ctx.tree,
                parent_box,
                &spec,
                &span,
                format!("grid{}", gid.0),
                BoxFlags::default(),
            )?
        }
        None => {
            let id = ctx
                .tree
                .new_box(Some(ctx.root), format!("grid{}", gid.0), BoxFlags::default())?;
            let left = Expression::from_variable(ctx.tree.attr_var(id, Attr::Left));
            ctx.tree.add(left, Relation::Equal, Strength::Strong);
            let bottom = Expression::from_variable(ctx.tree.attr_var(id, Attr::Bottom));
            ctx.tree.add(bottom, Relation::Equal, Strength::Strong);
            let right = Expression::from_variable(ctx.tree.attr_var(id, Attr::Right)).minus(1.0);
            ctx.tree.add(right, Relation::Equal, Strength::Strong);
            let top = match ctx.title {
                Some(title) => Expression::from_variable(ctx.tree.attr_var(id, Attr::Top))
                    .term(ctx.tree.attr_var(title, Attr::Bottom), -1.0),
                None => Expression::from_variable(ctx.tree.attr_var(id, Attr::Top)).minus(1.0),
            };
            ctx.tree.add(top, Relation::Equal, Strength::Strong);
            id
        }
    };
    ctx.grid_boxes.insert(gid, id);
    Ok(id)
}

/// Feed measured decoration overage into margin lower bounds, and the
/// measured title height into the title box.
fn apply_margins<F: Figure, R: Renderer>(
    ctx: &mut LayoutContext,
    figure: &F,
    renderer: &R,
    h_pad: f64,
    w_pad: f64,
) -> Result<(), LayoutError> {
    for &panel in &ctx.panels {
        let pos = figure.get_position(panel);
        let tight = renderer.to_normalized(renderer.tight_bbox(panel));
        let position = ctx.panel_boxes[&panel].position;
        ctx.tree
            .edit_margin_min(position, Side::Left, pos.x - tight.x + w_pad)?;
        ctx.tree
            .edit_margin_min(position, Side::Right, tight.right() - pos.right() + w_pad)?;
        ctx.tree
            .edit_margin_min(position, Side::Bottom, pos.y - tight.y + h_pad)?;
        ctx.tree
            .edit_margin_min(position, Side::Top, tight.top() - pos.top() + h_pad)?;
    }
    if let Some(title) = ctx.title {
        if let Some(bbox) = renderer.suptitle_bbox() {
            let height = renderer.to_normalized(bbox).height;
            ctx.tree.edit_size(title, Dim::Height, height)?;
        }
    }
    Ok(())
}

/// Emit ordering, alignment and size constraints between every pair of
/// panels sharing a grid.
///
/// Disjoint spans stack; shared span edges align.  Size comparisons only
/// apply when the spans overlap in the other dimension ("same row/column" is
/// an overlap test so spanning cells still compare), and the box covering
/// more cells is bounded below by the scaled size of the smaller one, which
/// keeps the solver away from the degenerate all-zero solution.
fn match_sizes<F: Figure>(ctx: &mut LayoutContext, figure: &F) {
    for &gid in &ctx.grids {
        let cols = figure.grid_spec(gid).cols;
        let panels: Vec<PanelId> = ctx
            .panels
            .iter()
            .copied()
            .filter(|&p| figure.grid_of(p) == Some(gid))
            .collect();

        for i in 0..panels.len() {
            for j in (i + 1)..panels.len() {
                let (a, b) = (panels[i], panels[j]);
                let sa = figure.cell_span(a);
                let sb = figure.cell_span(b);
                let (ac, ap) = {
                    let boxes = &ctx.panel_boxes[&a];
                    (boxes.container, boxes.position)
                };
                let (bc, bp) = {
                    let boxes = &ctx.panel_boxes[&b];
                    (boxes.container, boxes.position)
                };

                let (a_c0, a_c1) = sa.col_range(cols);
                let (b_c0, b_c1) = sb.col_range(cols);
                let (a_r0, a_r1) = sa.row_range(cols);
                let (b_r0, b_r1) = sb.row_range(cols);

                if a_c1 < b_c0 {
                    algebra::hstack(&mut ctx.tree, &[ac, bc], 0.0);
                } else if b_c1 < a_c0 {
                    algebra::hstack(&mut ctx.tree, &[bc, ac], 0.0);
                }
                if a_c0 == b_c0 {
                    algebra::align(&mut ctx.tree, &[ap, bp], Attr::Left);
                    algebra::align(&mut ctx.tree, &[ac, bc], Attr::Left);
                    algebra::match_edge_margins(&mut ctx.tree, &[ap, bp], Attr::Left, 1);
                }
                if a_c1 == b_c1 {
                    algebra::align(&mut ctx.tree, &[ap, bp], Attr::Right);
                    algebra::align(&mut ctx.tree, &[ac, bc], Attr::Right);
                    algebra::match_edge_margins(&mut ctx.tree, &[ap, bp], Attr::Right, 1);
                }

                if a_r1 < b_r0 {
                    algebra::vstack(&mut ctx.tree, &[ac, bc], 0.0);
                } else if b_r1 < a_r0 {
                    algebra::vstack(&mut ctx.tree, &[bc, ac], 0.0);
                }
                if a_r0 == b_r0 {
                    algebra::align(&mut ctx.tree, &[ap, bp], Attr::Top);
                    algebra::align(&mut ctx.tree, &[ac, bc], Attr::Top);
                    algebra::match_edge_margins(&mut ctx.tree, &[ap, bp], Attr::Top, 1);
                }
                if a_r1 == b_r1 {
                    algebra::align(&mut ctx.tree, &[ap, bp], Attr::Bottom);
                    algebra::align(&mut ctx.tree, &[ac, bc], Attr::Bottom);
                    algebra::match_edge_margins(&mut ctx.tree, &[ap, bp], Attr::Bottom, 1);
                }

                if sa.same_col(&sb, cols) {
                    let da = sa.row_extent(cols) as f64;
                    let db = sb.row_extent(cols) as f64;
                    if da > db {
                        ctx.tree
                            .constrain_size_min(ap, Dim::Height, bp, da / db, Strength::Strong);
                    } else if db > da {
                        ctx.tree
                            .constrain_size_min(bp, Dim::Height, ap, db / da, Strength::Strong);
                    } else {
                        ctx.tree.constrain_size(ap, Dim::Height, bp, 1.0, Strength::Strong);
                    }
                }
                if sa.same_row(&sb, cols) {
                    let da = sa.col_extent(cols) as f64;
                    let db = sb.col_extent(cols) as f64;
                    if da > db {
                        ctx.tree
                            .constrain_size_min(ap, Dim::Width, bp, da / db, Strength::Strong);
                    } else if db > da {
                        ctx.tree
                            .constrain_size_min(bp, Dim::Width, ap, db / da, Strength::Strong);
                    } else {
                        ctx.tree.constrain_size(ap, Dim::Width, bp, 1.0, Strength::Strong);
                    }
                }
            }
        }

        for &panel in &panels {
            let position = ctx.panel_boxes[&panel].position;
            ctx.tree
                .constrain_size_floor(position, Dim::Width, MIN_PANEL_SIZE, Strength::Weak);
            ctx.tree
                .constrain_size_floor(position, Dim::Height, MIN_PANEL_SIZE, Strength::Weak);
        }
    }
}

/// Commit resolved position-box rectangles back onto the panels.
fn writeback<F: Figure>(ctx: &LayoutContext, figure: &mut F) {
    for &panel in &ctx.panels {
        let rect = ctx.tree.rect(ctx.panel_boxes[&panel].position);
        figure.set_position(panel, rect);
    }
}

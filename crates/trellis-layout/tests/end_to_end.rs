//! End-to-end layout scenarios driving the engine through the in-memory
//! host.

use trellis_core::{CellSpan, ConfigError, GridSpec, LayoutError, PanelId, Rect};
use trellis_layout::{cell_fraction, run_layout, Decorations, Figure, MemFigure, MemRenderer};

const TOL: f64 = 1e-6;
const PAD: f64 = 0.02;

fn layout(figure: &mut MemFigure, renderer: &MemRenderer) {
    run_layout(figure, renderer, PAD, PAD).unwrap();
}

fn positions(figure: &MemFigure, panels: &[PanelId]) -> Vec<Rect> {
    panels.iter().map(|&p| figure.get_position(p)).collect()
}

#[test]
fn single_panel_fills_figure_minus_padding() {
    let (mut figure, renderer) = MemFigure::new(800.0, 600.0);
    let grid = figure.add_grid(GridSpec::new(1, 1));
    let panel = figure.add_panel(grid, CellSpan::cell(0));

    layout(&mut figure, &renderer);

    let pos = figure.get_position(panel);
    assert!((pos.x - PAD).abs() < TOL);
    assert!((pos.y - PAD).abs() < TOL);
    assert!((pos.width - (1.0 - 2.0 * PAD)).abs() < TOL);
    assert!((pos.height - (1.0 - 2.0 * PAD)).abs() < TOL);
}

#[test]
fn two_by_two_with_y_labels() {
    let delta = 0.1; // label width, figure-normalized
    let (mut figure, renderer) = MemFigure::new(1000.0, 1000.0);
    let grid = figure.add_grid(GridSpec::new(2, 2));
    let panels: Vec<PanelId> = (0..4).map(|c| figure.add_panel(grid, CellSpan::cell(c))).collect();
    for &panel in &panels {
        figure.set_decorations(
            panel,
            Decorations { left: delta * 1000.0, ..Decorations::default() },
        );
    }

    layout(&mut figure, &renderer);

    let rects = positions(&figure, &panels);
    for rect in &rects[1..] {
        assert!((rect.width - rects[0].width).abs() < TOL);
        assert!((rect.height - rects[0].height).abs() < TOL);
    }
    // Left-column panels leave room for the label plus padding.
    assert!(rects[0].x >= delta + PAD - TOL);
    assert!(rects[2].x >= delta + PAD - TOL);
    // No decorated bounding box overlaps another.
    for i in 0..panels.len() {
        for j in (i + 1)..panels.len() {
            let a = figure.decorated_bbox(panels[i]);
            let b = figure.decorated_bbox(panels[j]);
            assert!(!a.overlaps(&b), "panels {i} and {j} overlap: {a:?} vs {b:?}");
        }
    }
}

#[test]
fn full_grid_gets_no_placeholders() {
    let (mut figure, renderer) = MemFigure::new(640.0, 480.0);
    let grid = figure.add_grid(GridSpec::new(2, 2));
    for cell in 0..4 {
        figure.add_panel(grid, CellSpan::cell(cell));
    }

    layout(&mut figure, &renderer);

    assert_eq!(figure.placeholder_count(), 0);
}

#[test]
fn missing_cells_get_placeholders() {
    let (mut figure, renderer) = MemFigure::new(640.0, 480.0);
    let spec = GridSpec::new(2, 2);
    let grid = figure.add_grid(spec.clone());
    for cell in 0..3 {
        figure.add_panel(grid, CellSpan::cell(cell));
    }

    layout(&mut figure, &renderer);

    assert_eq!(figure.placeholder_count(), 1);
    // The ghost is the last panel added, pinned inside the empty cell.
    let ghost = *figure.panels().last().unwrap();
    assert!(!figure.is_visible(ghost));
    let cell = cell_fraction(&spec, &CellSpan::cell(3)).unwrap();
    let pos = figure.get_position(ghost);
    assert!(pos.x >= cell.x - TOL && pos.right() <= cell.right() + TOL);
    assert!(pos.y >= cell.y - TOL && pos.top() <= cell.top() + TOL);
    assert!(pos.width > 0.0 && pos.height > 0.0);
}

#[test]
fn disjoint_columns_do_not_overlap() {
    let (mut figure, renderer) = MemFigure::new(900.0, 300.0);
    let grid = figure.add_grid(GridSpec::new(1, 2));
    let left = figure.add_panel(grid, CellSpan::cell(0));
    let right = figure.add_panel(grid, CellSpan::cell(1));
    figure.set_decorations(left, Decorations { right: 45.0, ..Decorations::default() });
    figure.set_decorations(right, Decorations { left: 90.0, ..Decorations::default() });

    layout(&mut figure, &renderer);

    let a = figure.get_position(left);
    let b = figure.get_position(right);
    assert!(a.right() + PAD <= b.x + TOL);
}

#[test]
fn shared_column_edges_align() {
    let (mut figure, renderer) = MemFigure::new(500.0, 800.0);
    let grid = figure.add_grid(GridSpec::new(2, 1));
    let top = figure.add_panel(grid, CellSpan::cell(0));
    let bottom = figure.add_panel(grid, CellSpan::cell(1));
    // Different label widths would otherwise give different left edges.
    figure.set_decorations(top, Decorations { left: 80.0, ..Decorations::default() });
    figure.set_decorations(bottom, Decorations { left: 20.0, ..Decorations::default() });

    layout(&mut figure, &renderer);

    let a = figure.get_position(top);
    let b = figure.get_position(bottom);
    assert!((a.x - b.x).abs() < TOL);
    assert!((a.right() - b.right()).abs() < TOL);
}

#[test]
fn settled_layout_is_idempotent() {
    let (mut figure, renderer) = MemFigure::new(1000.0, 800.0);
    let grid = figure.add_grid(GridSpec::new(2, 2));
    let panels: Vec<PanelId> = (0..4).map(|c| figure.add_panel(grid, CellSpan::cell(c))).collect();
    for (i, &panel) in panels.iter().enumerate() {
        figure.set_decorations(
            panel,
            Decorations {
                left: 30.0 + 10.0 * i as f64,
                bottom: 25.0,
                ..Decorations::default()
            },
        );
    }

    layout(&mut figure, &renderer);
    let first = positions(&figure, &panels);
    layout(&mut figure, &renderer);
    let second = positions(&figure, &panels);

    for (a, b) in first.iter().zip(&second) {
        assert!((a.x - b.x).abs() < TOL);
        assert!((a.y - b.y).abs() < TOL);
        assert!((a.width - b.width).abs() < TOL);
        assert!((a.height - b.height).abs() < TOL);
    }
}

#[test]
fn row_span_ratio_is_respected() {
    let (mut figure, renderer) = MemFigure::new(600.0, 900.0);
    let grid = figure.add_grid(GridSpec::new(3, 1));
    let short = figure.add_panel(grid, CellSpan::cell(0));
    let tall = figure.add_panel(grid, CellSpan::range(1, 2));

    layout(&mut figure, &renderer);

    let a = figure.get_position(short);
    let b = figure.get_position(tall);
    assert!(b.height >= 2.0 * a.height - TOL);
}

#[test]
fn figure_without_grids_is_left_alone() {
    let (mut figure, renderer) = MemFigure::new(400.0, 400.0);
    let free = figure.add_free_panel(Rect::new(0.3, 0.3, 0.4, 0.4));

    run_layout(&mut figure, &renderer, PAD, PAD).unwrap();

    let pos = figure.get_position(free);
    assert!((pos.x - 0.3).abs() < TOL);
    assert!((pos.width - 0.4).abs() < TOL);
    assert_eq!(figure.placeholder_count(), 0);
}

#[test]
fn invalid_padding_is_rejected() {
    let (mut figure, renderer) = MemFigure::new(400.0, 400.0);
    let grid = figure.add_grid(GridSpec::new(1, 1));
    figure.add_panel(grid, CellSpan::cell(0));

    for bad in [-0.1, 0.5, f64::NAN] {
        let result = run_layout(&mut figure, &renderer, bad, PAD);
        assert!(matches!(
            result,
            Err(LayoutError::Config(ConfigError::InvalidPadding { .. }))
        ));
    }
}

#[test]
fn suptitle_reserves_headroom() {
    let (mut figure, renderer) = MemFigure::new(600.0, 600.0);
    let grid = figure.add_grid(GridSpec::new(1, 1));
    let panel = figure.add_panel(grid, CellSpan::cell(0));
    figure.set_suptitle_height(60.0); // 0.1 of the figure

    layout(&mut figure, &renderer);

    let pos = figure.get_position(panel);
    assert!(pos.top() <= 1.0 - 0.1 - PAD + TOL);
    assert!((pos.y - PAD).abs() < TOL);
}

#[test]
fn nested_grids_stay_in_their_cell() {
    let (mut figure, renderer) = MemFigure::new(1000.0, 600.0);
    let outer = figure.add_grid(GridSpec::new(1, 2));
    let inner = figure.add_nested_grid(GridSpec::new(2, 1), outer, CellSpan::cell(0));
    let upper = figure.add_panel(inner, CellSpan::cell(0));
    let lower = figure.add_panel(inner, CellSpan::cell(1));
    let side = figure.add_panel(outer, CellSpan::cell(1));

    layout(&mut figure, &renderer);

    let u = figure.get_position(upper);
    let l = figure.get_position(lower);
    let s = figure.get_position(side);
    // The nested pair stays inside the left half, stacked top to bottom.
    assert!(u.right() <= 0.5 + TOL);
    assert!(l.right() <= 0.5 + TOL);
    assert!(u.y >= l.top() - TOL);
    // The outer panel stays inside the right half.
    assert!(s.x >= 0.5 - TOL);
    assert!(s.width > 0.0 && u.height > 0.0 && l.height > 0.0);
}

//! Host-side collaborators of the layout engine.
//!
//! The engine never renders or measures anything itself: the owning
//! application supplies panel structure and write-back through [`Figure`],
//! and measured bounding boxes through [`Renderer`].  [`MemFigure`] /
//! [`MemRenderer`] are a self-contained in-memory pair used by the
//! integration tests and benches, and double as a reference for embedders.

use std::cell::RefCell;
use std::rc::Rc;

use trellis_core::{CellSpan, GridId, GridSpec, PanelId, Rect};

/// Panel structure and position write-back.
pub trait Figure {
    /// Every panel in the figure, in creation order.
    fn panels(&self) -> Vec<PanelId>;

    /// The grid a panel was placed through, if any.  Panels placed without a
    /// grid do not participate in layout.
    fn grid_of(&self, panel: PanelId) -> Option<GridId>;

    /// Geometry descriptor of a grid.
    fn grid_spec(&self, grid: GridId) -> GridSpec;

    /// The panel's slot within its grid.
    fn cell_span(&self, panel: PanelId) -> CellSpan;

    /// For a nested grid, the parent grid and the cell it occupies.
    fn parent_cell(&self, grid: GridId) -> Option<(GridId, CellSpan)>;

    /// Current figure-normalized position of a panel.
    fn get_position(&self, panel: PanelId) -> Rect;

    /// Commit a resolved figure-normalized position.
    fn set_position(&mut self, panel: PanelId, pos: Rect);

    /// Create an invisible placeholder panel pinned to a single grid cell.
    /// Placeholders keep unoccupied cells from collapsing out of the layout.
    fn insert_placeholder(&mut self, grid: GridId, cell: usize) -> PanelId;
}

/// Measurement service for decorated bounding boxes.
pub trait Renderer {
    /// Device-space tight bounding box of a panel, decorations included.
    fn tight_bbox(&self, panel: PanelId) -> Rect;

    /// Device-space bounding box of the figure title, if there is one.
    fn suptitle_bbox(&self) -> Option<Rect>;

    /// Transform a device-space rectangle into figure-normalized space.
    fn to_normalized(&self, rect: Rect) -> Rect;
}

/// Per-side decoration extents in device units: left, right, bottom, top.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decorations {
    pub left: f64,
    pub right: f64,
    pub bottom: f64,
    pub top: f64,
}

#[derive(Debug)]
struct PanelState {
    grid: Option<GridId>,
    span: CellSpan,
    position: Rect,
    decorations: Decorations,
    visible: bool,
    placeholder: bool,
}

#[derive(Debug)]
struct GridState {
    spec: GridSpec,
    parent: Option<(GridId, CellSpan)>,
}

#[derive(Debug)]
struct FigureState {
    width: f64,
    height: f64,
    panels: Vec<PanelState>,
    grids: Vec<GridState>,
    suptitle_height: Option<f64>,
}

/// In-memory [`Figure`] implementation with a device space of fixed pixel
/// size and identity decoration measurement.
#[derive(Debug)]
pub struct MemFigure {
    state: Rc<RefCell<FigureState>>,
}

/// Measurement half of [`MemFigure`]: reports a panel's stored position
/// expanded by its decoration extents.
#[derive(Debug)]
pub struct MemRenderer {
    state: Rc<RefCell<FigureState>>,
}

impl MemFigure {
    /// Create a figure with the given device size in pixels.
    pub fn new(width: f64, height: f64) -> (MemFigure, MemRenderer) {
        let state = Rc::new(RefCell::new(FigureState {
            width,
            height,
            panels: Vec::new(),
            grids: Vec::new(),
            suptitle_height: None,
        }));
        (
            MemFigure { state: Rc::clone(&state) },
            MemRenderer { state },
        )
    }

    /// Register a top-level grid.
    pub fn add_grid(&mut self, spec: GridSpec) -> GridId {
        let mut state = self.state.borrow_mut();
        state.grids.push(GridState { spec, parent: None });
        GridId(state.grids.len() as u64 - 1)
    }

    /// Register a grid nested in a cell of another grid.
    pub fn add_nested_grid(&mut self, spec: GridSpec, parent: GridId, span: CellSpan) -> GridId {
        let mut state = self.state.borrow_mut();
        state.grids.push(GridState {
            spec,
            parent: Some((parent, span)),
        });
        GridId(state.grids.len() as u64 - 1)
    }

    /// Add a visible panel occupying a span of a grid.  Its initial position
    /// is the span's fractional cell rectangle.
    pub fn add_panel(&mut self, grid: GridId, span: CellSpan) -> PanelId {
        let position = {
            let state = self.state.borrow();
            crate::grid::cell_fraction(&state.grids[grid.0 as usize].spec, &span)
                .unwrap_or(Rect::new(0.0, 0.0, 1.0, 1.0))
        };
        let mut state = self.state.borrow_mut();
        state.panels.push(PanelState {
            grid: Some(grid),
            span,
            position,
            decorations: Decorations::default(),
            visible: true,
            placeholder: false,
        });
        PanelId(state.panels.len() as u64 - 1)
    }

    /// Add a panel placed directly, outside any grid.  It keeps whatever
    /// position it is given and never participates in layout.
    pub fn add_free_panel(&mut self, position: Rect) -> PanelId {
        let mut state = self.state.borrow_mut();
        state.panels.push(PanelState {
            grid: None,
            span: CellSpan::cell(0),
            position,
            decorations: Decorations::default(),
            visible: true,
            placeholder: false,
        });
        PanelId(state.panels.len() as u64 - 1)
    }

    /// Set a panel's decoration extents in device pixels.
    pub fn set_decorations(&mut self, panel: PanelId, decorations: Decorations) {
        self.state.borrow_mut().panels[panel.0 as usize].decorations = decorations;
    }

    /// Give the figure a title of the given device-pixel height.
    pub fn set_suptitle_height(&mut self, height: f64) {
        self.state.borrow_mut().suptitle_height = Some(height);
    }

    /// How many placeholder panels the layout inserted.
    pub fn placeholder_count(&self) -> usize {
        self.state
            .borrow()
            .panels
            .iter()
            .filter(|p| p.placeholder)
            .count()
    }

    pub fn is_visible(&self, panel: PanelId) -> bool {
        self.state.borrow().panels[panel.0 as usize].visible
    }

    /// Figure-normalized union of a panel's position and decorations.
    pub fn decorated_bbox(&self, panel: PanelId) -> Rect {
        let state = self.state.borrow();
        let p = &state.panels[panel.0 as usize];
        p.position.expand(
            p.decorations.left / state.width,
            p.decorations.right / state.width,
            p.decorations.bottom / state.height,
            p.decorations.top / state.height,
        )
    }
}

impl Figure for MemFigure {
    fn panels(&self) -> Vec<PanelId> {
        (0..self.state.borrow().panels.len() as u64)
            .map(PanelId)
            .collect()
    }

    fn grid_of(&self, panel: PanelId) -> Option<GridId> {
        self.state.borrow().panels[panel.0 as usize].grid
    }

    fn grid_spec(&self, grid: GridId) -> GridSpec {
        self.state.borrow().grids[grid.0 as usize].spec.clone()
    }

    fn cell_span(&self, panel: PanelId) -> CellSpan {
        self.state.borrow().panels[panel.0 as usize].span
    }

    fn parent_cell(&self, grid: GridId) -> Option<(GridId, CellSpan)> {
        self.state.borrow().grids[grid.0 as usize].parent
    }

    fn get_position(&self, panel: PanelId) -> Rect {
        self.state.borrow().panels[panel.0 as usize].position
    }

    fn set_position(&mut self, panel: PanelId, pos: Rect) {
        self.state.borrow_mut().panels[panel.0 as usize].position = pos;
    }

    fn insert_placeholder(&mut self, grid: GridId, cell: usize) -> PanelId {
        let mut state = self.state.borrow_mut();
        state.panels.push(PanelState {
            grid: Some(grid),
            span: CellSpan::cell(cell),
            position: Rect::new(0.0, 0.0, 1.0, 1.0),
            decorations: Decorations::default(),
            visible: false,
            placeholder: true,
        });
        PanelId(state.panels.len() as u64 - 1)
    }
}

impl Renderer for MemRenderer {
    fn tight_bbox(&self, panel: PanelId) -> Rect {
        let state = self.state.borrow();
        let p = &state.panels[panel.0 as usize];
        let device = Rect::new(
            p.position.x * state.width,
            p.position.y * state.height,
            p.position.width * state.width,
            p.position.height * state.height,
        );
        device.expand(
            p.decorations.left,
            p.decorations.right,
            p.decorations.bottom,
            p.decorations.top,
        )
    }

    fn suptitle_bbox(&self) -> Option<Rect> {
        let state = self.state.borrow();
        let height = state.suptitle_height?;
        Some(Rect::new(0.0, state.height - height, state.width, height))
    }

    fn to_normalized(&self, rect: Rect) -> Rect {
        let state = self.state.borrow();
        Rect::new(
            rect.x / state.width,
            rect.y / state.height,
            rect.width / state.width,
            rect.height / state.height,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tight_bbox_expands_by_decorations() {
        let (mut figure, renderer) = MemFigure::new(1000.0, 500.0);
        let grid = figure.add_grid(GridSpec::new(1, 1));
        let panel = figure.add_panel(grid, CellSpan::cell(0));
        figure.set_position(panel, Rect::new(0.2, 0.2, 0.6, 0.6));
        figure.set_decorations(
            panel,
            Decorations { left: 100.0, bottom: 50.0, ..Decorations::default() },
        );

        let bbox = renderer.to_normalized(renderer.tight_bbox(panel));
        assert!((bbox.x - 0.1).abs() < 1e-9);
        assert!((bbox.y - 0.1).abs() < 1e-9);
        assert!((bbox.right() - 0.8).abs() < 1e-9);
        assert!((bbox.top() - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_placeholders_are_invisible() {
        let (mut figure, _renderer) = MemFigure::new(640.0, 480.0);
        let grid = figure.add_grid(GridSpec::new(2, 1));
        figure.add_panel(grid, CellSpan::cell(0));
        let ghost = figure.insert_placeholder(grid, 1);
        assert!(!figure.is_visible(ghost));
        assert_eq!(figure.placeholder_count(), 1);
        assert_eq!(figure.grid_of(ghost), Some(grid));
    }

    #[test]
    fn test_suptitle_measurement() {
        let (mut figure, renderer) = MemFigure::new(800.0, 400.0);
        assert!(renderer.suptitle_bbox().is_none());
        figure.set_suptitle_height(40.0);
        let bbox = renderer.to_normalized(renderer.suptitle_bbox().unwrap());
        assert!((bbox.height - 0.1).abs() < 1e-9);
        assert!((bbox.top() - 1.0).abs() < 1e-9);
    }
}

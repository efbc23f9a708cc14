//! The box arena: constrained rectangles sharing one solver.
//!
//! A [`BoxTree`] owns every box of one layout hierarchy together with the
//! solver their variables live in.  Boxes are referenced by [`BoxId`]
//! handles; parent/child relationships are stored as handles, so teardown is
//! simply dropping the tree.

use trellis_constraint::{Constraint, Expression, Relation, Solver, Strength, Variable};
use trellis_core::{ConstraintError, LayoutError, Rect};

/// Handle to a box in a [`BoxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoxId(usize);

/// Sides of a box, used for margin bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
    Bottom,
    Top,
}

/// Size dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dim {
    Width,
    Height,
}

/// Alignable box attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attr {
    Left,
    Right,
    Bottom,
    Top,
    Width,
    Height,
    HCenter,
    VCenter,
}

/// Creation flags for a box.
///
/// A position box carries margin variables tying it to its parent; its
/// resolved rectangle is what gets written back as a panel's final position.
/// A tight dimension prefers to collapse to its minimum instead of growing,
/// which is what decoration-only boxes want.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoxFlags {
    pub position: bool,
    pub tight_width: bool,
    pub tight_height: bool,
}

impl BoxFlags {
    /// Flags for a panel position box.
    pub fn position() -> Self {
        Self { position: true, ..Self::default() }
    }

    /// Flags for a box that should hug its content in both dimensions.
    pub fn tight() -> Self {
        Self {
            tight_width: true,
            tight_height: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct BoxVars {
    left: Variable,
    bottom: Variable,
    right: Variable,
    top: Variable,
    width: Variable,
    height: Variable,
    h_center: Variable,
    v_center: Variable,
    min_width: Variable,
    min_height: Variable,
    pref_width: Variable,
    pref_height: Variable,
}

#[derive(Debug, Clone, Copy)]
struct MarginVars {
    left: Variable,
    right: Variable,
    bottom: Variable,
    top: Variable,
    left_min: Variable,
    right_min: Variable,
    bottom_min: Variable,
    top_min: Variable,
}

/// One node of the arena.
#[derive(Debug)]
struct BoxNode {
    name: String,
    parent: Option<BoxId>,
    children: Vec<BoxId>,
    vars: BoxVars,
    margins: Option<MarginVars>,
}

/// Arena of boxes plus the shared solver.
#[derive(Debug, Default)]
pub struct BoxTree {
    solver: Solver,
    nodes: Vec<BoxNode>,
}

impl BoxTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a box, allocating its variables and emitting its creation
    /// constraints.
    ///
    /// Every box gets the rectangle algebra (size and center definitions,
    /// sizes bounded below by editable minimums) plus the soft size
    /// preference.  A box with a parent is constrained to lie inside it.
    /// A position box additionally gets margin variables with editable
    /// lower bounds.
    pub fn new_box(
        &mut self,
        parent: Option<BoxId>,
        name: impl Into<String>,
        flags: BoxFlags,
    ) -> Result<BoxId, LayoutError> {
        let vars = BoxVars {
            left: self.solver.new_variable(),
            bottom: self.solver.new_variable(),
            right: self.solver.new_variable(),
            top: self.solver.new_variable(),
            width: self.solver.new_variable(),
            height: self.solver.new_variable(),
            h_center: self.solver.new_variable(),
            v_center: self.solver.new_variable(),
            min_width: self.solver.new_variable(),
            min_height: self.solver.new_variable(),
            pref_width: self.solver.new_variable(),
            pref_height: self.solver.new_variable(),
        };

        // width == right - left, height == top - bottom, centers midway.
        self.require(
            Expression::from_variable(vars.width)
                .term(vars.right, -1.0)
                .term(vars.left, 1.0),
            Relation::Equal,
        );
        self.require(
            Expression::from_variable(vars.height)
                .term(vars.top, -1.0)
                .term(vars.bottom, 1.0),
            Relation::Equal,
        );
        self.require(
            Expression::from_variable(vars.h_center)
                .term(vars.left, -0.5)
                .term(vars.right, -0.5),
            Relation::Equal,
        );
        self.require(
            Expression::from_variable(vars.v_center)
                .term(vars.bottom, -0.5)
                .term(vars.top, -0.5),
            Relation::Equal,
        );

        // Sizes never drop below their editable minimums, which are
        // themselves held at >= 0 through the edit seeded at zero.
        self.require(
            Expression::from_variable(vars.width).term(vars.min_width, -1.0),
            Relation::GreaterOrEqual,
        );
        self.require(
            Expression::from_variable(vars.height).term(vars.min_height, -1.0),
            Relation::GreaterOrEqual,
        );
        self.require(Expression::from_variable(vars.min_width), Relation::GreaterOrEqual);
        self.require(Expression::from_variable(vars.min_height), Relation::GreaterOrEqual);
        self.solver.add_edit_variable(vars.min_width, Strength::Strong)?;
        self.solver.add_edit_variable(vars.min_height, Strength::Strong)?;

        // Soft size preference: tight dimensions prefer to collapse, the
        // rest prefer to fill.
        let pref_w = if flags.tight_width { 0.0 } else { 1.0 };
        let pref_h = if flags.tight_height { 0.0 } else { 1.0 };
        self.add(
            Expression::from_variable(vars.pref_width).minus(pref_w),
            Relation::Equal,
            Strength::Strong,
        );
        self.add(
            Expression::from_variable(vars.pref_height).minus(pref_h),
            Relation::Equal,
            Strength::Strong,
        );
        self.add(
            Expression::from_variable(vars.width).term(vars.pref_width, -1.0),
            Relation::Equal,
            Strength::Weak,
        );
        self.add(
            Expression::from_variable(vars.height).term(vars.pref_height, -1.0),
            Relation::Equal,
            Strength::Weak,
        );

        if let Some(parent) = parent {
            let pvars = self.nodes[parent.0].vars;
            self.require(
                Expression::from_variable(vars.left).term(pvars.left, -1.0),
                Relation::GreaterOrEqual,
            );
            self.require(
                Expression::from_variable(vars.bottom).term(pvars.bottom, -1.0),
                Relation::GreaterOrEqual,
            );
            self.require(
                Expression::from_variable(vars.right).term(pvars.right, -1.0),
                Relation::LessOrEqual,
            );
            self.require(
                Expression::from_variable(vars.top).term(pvars.top, -1.0),
                Relation::LessOrEqual,
            );
        }

        let margins = if flags.position {
            let Some(parent) = parent else {
                return Err(ConstraintError::Internal("a position box requires a parent").into());
            };
            let pvars = self.nodes[parent.0].vars;
            let margins = MarginVars {
                left: self.solver.new_variable(),
                right: self.solver.new_variable(),
                bottom: self.solver.new_variable(),
                top: self.solver.new_variable(),
                left_min: self.solver.new_variable(),
                right_min: self.solver.new_variable(),
                bottom_min: self.solver.new_variable(),
                top_min: self.solver.new_variable(),
            };
            // Margin definitions, signed so every margin is the inward gap.
            self.require(
                Expression::from_variable(margins.left)
                    .term(vars.left, -1.0)
                    .term(pvars.left, 1.0),
                Relation::Equal,
            );
            self.require(
                Expression::from_variable(margins.right)
                    .term(pvars.right, -1.0)
                    .term(vars.right, 1.0),
                Relation::Equal,
            );
            self.require(
                Expression::from_variable(margins.bottom)
                    .term(vars.bottom, -1.0)
                    .term(pvars.bottom, 1.0),
                Relation::Equal,
            );
            self.require(
                Expression::from_variable(margins.top)
                    .term(pvars.top, -1.0)
                    .term(vars.top, 1.0),
                Relation::Equal,
            );
            // Each margin stays above its editable lower bound.
            for (margin, bound) in [
                (margins.left, margins.left_min),
                (margins.right, margins.right_min),
                (margins.bottom, margins.bottom_min),
                (margins.top, margins.top_min),
            ] {
                self.require(
                    Expression::from_variable(margin).term(bound, -1.0),
                    Relation::GreaterOrEqual,
                );
                self.solver.add_edit_variable(bound, Strength::Strong)?;
            }
            Some(margins)
        } else {
            None
        };

        let id = BoxId(self.nodes.len());
        self.nodes.push(BoxNode {
            name: name.into(),
            parent,
            children: Vec::new(),
            vars,
            margins,
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        Ok(id)
    }

    /// Pin all four edges to a rectangle.
    pub fn set_geometry(&mut self, id: BoxId, rect: Rect, strength: Strength) {
        let vars = self.nodes[id.0].vars;
        self.add(
            Expression::from_variable(vars.left).minus(rect.x),
            Relation::Equal,
            strength,
        );
        self.add(
            Expression::from_variable(vars.bottom).minus(rect.y),
            Relation::Equal,
            strength,
        );
        self.add(
            Expression::from_variable(vars.right).minus(rect.right()),
            Relation::Equal,
            strength,
        );
        self.add(
            Expression::from_variable(vars.top).minus(rect.top()),
            Relation::Equal,
            strength,
        );
    }

    /// Suggest a lower bound for one of a position box's margins.
    ///
    /// Later suggestions override earlier ones; the bound is enforced by a
    /// required constraint, so the margin can grow but not shrink past it.
    pub fn edit_margin_min(
        &mut self,
        id: BoxId,
        side: Side,
        value: f64,
    ) -> Result<(), LayoutError> {
        let margins = self.nodes[id.0]
            .margins
            .ok_or(ConstraintError::Internal("margin edits require a position box"))?;
        let bound = match side {
            Side::Left => margins.left_min,
            Side::Right => margins.right_min,
            Side::Bottom => margins.bottom_min,
            Side::Top => margins.top_min,
        };
        self.solver.suggest_value(bound, value)?;
        Ok(())
    }

    /// Suggest an exact size for one dimension through an edit variable,
    /// registering the edit on first use.
    pub fn edit_size(&mut self, id: BoxId, dim: Dim, value: f64) -> Result<(), LayoutError> {
        let vars = self.nodes[id.0].vars;
        let var = match dim {
            Dim::Width => vars.width,
            Dim::Height => vars.height,
        };
        if !self.solver.has_edit_variable(var) {
            self.solver.add_edit_variable(var, Strength::Strong)?;
        }
        self.solver.suggest_value(var, value)?;
        Ok(())
    }

    /// Tie a dimension to a multiple of another box's dimension.
    pub fn constrain_size(
        &mut self,
        id: BoxId,
        dim: Dim,
        other: BoxId,
        ratio: f64,
        strength: Strength,
    ) {
        let expr = Expression::from_variable(self.dim_var(id, dim))
            .term(self.dim_var(other, dim), -ratio);
        self.add(expr, Relation::Equal, strength);
    }

    /// Bound a dimension below by a multiple of another box's dimension.
    pub fn constrain_size_min(
        &mut self,
        id: BoxId,
        dim: Dim,
        other: BoxId,
        ratio: f64,
        strength: Strength,
    ) {
        let expr = Expression::from_variable(self.dim_var(id, dim))
            .term(self.dim_var(other, dim), -ratio);
        self.add(expr, Relation::GreaterOrEqual, strength);
    }

    /// Bound a dimension below by a fixed value.
    pub fn constrain_size_floor(&mut self, id: BoxId, dim: Dim, value: f64, strength: Strength) {
        let expr = Expression::from_variable(self.dim_var(id, dim)).minus(value);
        self.add(expr, Relation::GreaterOrEqual, strength);
    }

    /// Pin a child box to a fractional sub-rectangle of its parent, so the
    /// child follows the parent wherever the solver moves it.
    pub fn constrain_fraction_of(
        &mut self,
        child: BoxId,
        parent: BoxId,
        frac: Rect,
        strength: Strength,
    ) {
        let c = self.nodes[child.0].vars;
        let p = self.nodes[parent.0].vars;
        self.add(
            Expression::from_variable(c.left)
                .term(p.left, -1.0)
                .term(p.width, -frac.x),
            Relation::Equal,
            strength,
        );
        self.add(
            Expression::from_variable(c.bottom)
                .term(p.bottom, -1.0)
                .term(p.height, -frac.y),
            Relation::Equal,
            strength,
        );
        self.add(
            Expression::from_variable(c.width).term(p.width, -frac.width),
            Relation::Equal,
            strength,
        );
        self.add(
            Expression::from_variable(c.height).term(p.height, -frac.height),
            Relation::Equal,
            strength,
        );
    }

    /// Lay an auxiliary box out against the right edge of `anchor`: a tight
    /// sibling container strictly to the right, holding an inner box at a
    /// fraction of the anchor's height, vertically centered on it.
    pub fn attach_right(
        &mut self,
        anchor: BoxId,
        shrink: f64,
        width_frac: f64,
    ) -> Result<(BoxId, BoxId), LayoutError> {
        let parent = self.nodes[anchor.0]
            .parent
            .ok_or(ConstraintError::Internal("attach_right needs a parented anchor"))?;
        let name = self.nodes[anchor.0].name.clone();
        let container = self.new_box(
            Some(parent),
            format!("{name}.flank"),
            BoxFlags {
                tight_width: true,
                ..BoxFlags::default()
            },
        )?;
        let inner = self.new_box(Some(container), format!("{name}.flank.pos"), BoxFlags::default())?;

        let a = self.nodes[anchor.0].vars;
        let c = self.nodes[container.0].vars;
        let i = self.nodes[inner.0].vars;
        self.require(
            Expression::from_variable(a.right).term(c.left, -1.0),
            Relation::LessOrEqual,
        );
        self.add(
            Expression::from_variable(i.height).term(a.height, -shrink),
            Relation::Equal,
            Strength::Strong,
        );
        self.add(
            Expression::from_variable(i.width).term(a.width, -width_frac),
            Relation::Equal,
            Strength::Strong,
        );
        self.add(
            Expression::from_variable(i.v_center).term(a.v_center, -1.0),
            Relation::Equal,
            Strength::Medium,
        );
        Ok((container, inner))
    }

    /// Resolve the constraint system, folding in everything queued since the
    /// last solve.
    pub fn solve(&mut self) -> Result<(), LayoutError> {
        self.solver.update_variables()?;
        Ok(())
    }

    /// The box's resolved rectangle (left, bottom, width, height).
    pub fn rect(&self, id: BoxId) -> Rect {
        let vars = self.nodes[id.0].vars;
        Rect::new(
            self.solver.value(vars.left),
            self.solver.value(vars.bottom),
            self.solver.value(vars.width),
            self.solver.value(vars.height),
        )
    }

    /// Resolved value of one attribute.
    pub fn attr_value(&self, id: BoxId, attr: Attr) -> f64 {
        self.solver.value(self.attr_var(id, attr))
    }

    /// Resolved margin of a position box.
    pub fn margin(&self, id: BoxId, side: Side) -> Option<f64> {
        let margins = self.nodes[id.0].margins?;
        let var = match side {
            Side::Left => margins.left,
            Side::Right => margins.right,
            Side::Bottom => margins.bottom,
            Side::Top => margins.top,
        };
        Some(self.solver.value(var))
    }

    pub fn name(&self, id: BoxId) -> &str {
        &self.nodes[id.0].name
    }

    pub fn parent(&self, id: BoxId) -> Option<BoxId> {
        self.nodes[id.0].parent
    }

    /// Walk `levels` steps up the parent chain.
    pub fn ancestor(&self, id: BoxId, levels: usize) -> Option<BoxId> {
        let mut current = id;
        for _ in 0..levels {
            current = self.nodes[current.0].parent?;
        }
        Some(current)
    }

    pub fn children(&self, id: BoxId) -> &[BoxId] {
        &self.nodes[id.0].children
    }

    pub(crate) fn attr_var(&self, id: BoxId, attr: Attr) -> Variable {
        let vars = self.nodes[id.0].vars;
        match attr {
            Attr::Left => vars.left,
            Attr::Right => vars.right,
            Attr::Bottom => vars.bottom,
            Attr::Top => vars.top,
            Attr::Width => vars.width,
            Attr::Height => vars.height,
            Attr::HCenter => vars.h_center,
            Attr::VCenter => vars.v_center,
        }
    }

    fn dim_var(&self, id: BoxId, dim: Dim) -> Variable {
        let vars = self.nodes[id.0].vars;
        match dim {
            Dim::Width => vars.width,
            Dim::Height => vars.height,
        }
    }

    pub(crate) fn add(&mut self, expression: Expression, relation: Relation, strength: Strength) {
        self.solver
            .add_constraint(Constraint::new(expression, relation, strength));
    }

    fn require(&mut self, expression: Expression, relation: Relation) {
        self.add(expression, relation, Strength::Required);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-6;

    #[test]
    fn test_geometry_roundtrip() {
        let mut tree = BoxTree::new();
        let root = tree.new_box(None, "root", BoxFlags::default()).unwrap();
        tree.set_geometry(root, Rect::new(0.0, 0.0, 1.0, 1.0), Strength::Strong);
        tree.solve().unwrap();
        let rect = tree.rect(root);
        assert!((rect.x - 0.0).abs() < TOL);
        assert!((rect.width - 1.0).abs() < TOL);
        assert!((tree.attr_value(root, Attr::HCenter) - 0.5).abs() < TOL);
    }

    #[test]
    fn test_child_fills_parent() {
        let mut tree = BoxTree::new();
        let root = tree.new_box(None, "root", BoxFlags::default()).unwrap();
        tree.set_geometry(root, Rect::new(0.0, 0.0, 1.0, 1.0), Strength::Strong);
        let child = tree.new_box(Some(root), "child", BoxFlags::default()).unwrap();
        tree.solve().unwrap();
        // Containment plus the fill preference stretch the child over the
        // whole parent.
        let rect = tree.rect(child);
        assert!((rect.x - 0.0).abs() < TOL);
        assert!((rect.y - 0.0).abs() < TOL);
        assert!((rect.width - 1.0).abs() < TOL);
        assert!((rect.height - 1.0).abs() < TOL);
        assert_eq!(tree.parent(child), Some(root));
        assert_eq!(tree.children(root), &[child]);
    }

    #[test]
    fn test_tight_box_collapses() {
        let mut tree = BoxTree::new();
        let root = tree.new_box(None, "root", BoxFlags::default()).unwrap();
        tree.set_geometry(root, Rect::new(0.0, 0.0, 1.0, 1.0), Strength::Strong);
        let child = tree.new_box(Some(root), "child", BoxFlags::tight()).unwrap();
        tree.solve().unwrap();
        let rect = tree.rect(child);
        assert!(rect.width.abs() < TOL);
        assert!(rect.height.abs() < TOL);
    }

    #[test]
    fn test_position_box_margins() {
        let mut tree = BoxTree::new();
        let root = tree.new_box(None, "root", BoxFlags::default()).unwrap();
        tree.set_geometry(root, Rect::new(0.0, 0.0, 1.0, 1.0), Strength::Strong);
        let pos = tree.new_box(Some(root), "pos", BoxFlags::position()).unwrap();
        tree.edit_margin_min(pos, Side::Left, 0.1).unwrap();
        tree.edit_margin_min(pos, Side::Right, 0.05).unwrap();
        tree.edit_margin_min(pos, Side::Bottom, 0.2).unwrap();
        tree.edit_margin_min(pos, Side::Top, 0.02).unwrap();
        tree.solve().unwrap();
        let rect = tree.rect(pos);
        assert!((rect.x - 0.1).abs() < TOL);
        assert!((rect.right() - 0.95).abs() < TOL);
        assert!((rect.y - 0.2).abs() < TOL);
        assert!((rect.top() - 0.98).abs() < TOL);
        assert!((tree.margin(pos, Side::Left).unwrap() - 0.1).abs() < TOL);
        assert!(tree.margin(root, Side::Left).is_none());

        // A later suggestion overrides the earlier bound.
        tree.edit_margin_min(pos, Side::Left, 0.3).unwrap();
        tree.solve().unwrap();
        assert!((tree.rect(pos).x - 0.3).abs() < TOL);
    }

    #[test]
    fn test_position_box_needs_parent() {
        let mut tree = BoxTree::new();
        assert!(tree.new_box(None, "orphan", BoxFlags::position()).is_err());
    }

    #[test]
    fn test_constrain_size_ratio() {
        let mut tree = BoxTree::new();
        let root = tree.new_box(None, "root", BoxFlags::default()).unwrap();
        tree.set_geometry(root, Rect::new(0.0, 0.0, 1.0, 1.0), Strength::Strong);
        let a = tree.new_box(Some(root), "a", BoxFlags::tight()).unwrap();
        let b = tree.new_box(Some(root), "b", BoxFlags::tight()).unwrap();
        tree.edit_size(a, Dim::Height, 0.2).unwrap();
        tree.constrain_size(b, Dim::Height, a, 2.0, Strength::Strong);
        tree.solve().unwrap();
        assert!((tree.rect(a).height - 0.2).abs() < TOL);
        assert!((tree.rect(b).height - 0.4).abs() < TOL);

        // Size edits override like any other suggestion.
        tree.edit_size(a, Dim::Height, 0.1).unwrap();
        tree.solve().unwrap();
        assert!((tree.rect(b).height - 0.2).abs() < TOL);
    }

    #[test]
    fn test_fraction_of_parent_follows_parent() {
        let mut tree = BoxTree::new();
        let root = tree.new_box(None, "root", BoxFlags::default()).unwrap();
        tree.set_geometry(root, Rect::new(0.2, 0.0, 0.8, 1.0), Strength::Strong);
        let child = tree.new_box(Some(root), "child", BoxFlags::default()).unwrap();
        tree.constrain_fraction_of(
            child,
            root,
            Rect::new(0.5, 0.0, 0.5, 0.5),
            Strength::Strong,
        );
        tree.solve().unwrap();
        let rect = tree.rect(child);
        assert!((rect.x - 0.6).abs() < TOL);
        assert!((rect.y - 0.0).abs() < TOL);
        assert!((rect.width - 0.4).abs() < TOL);
        assert!((rect.height - 0.5).abs() < TOL);
    }

    #[test]
    fn test_attach_right() {
        let mut tree = BoxTree::new();
        let root = tree.new_box(None, "root", BoxFlags::default()).unwrap();
        tree.set_geometry(root, Rect::new(0.0, 0.0, 1.0, 1.0), Strength::Strong);
        let anchor = tree.new_box(Some(root), "panel", BoxFlags::default()).unwrap();
        tree.set_geometry(anchor, Rect::new(0.1, 0.1, 0.5, 0.7), Strength::Strong);
        let (container, inner) = tree.attach_right(anchor, 0.6, 0.1).unwrap();
        tree.solve().unwrap();

        let a = tree.rect(anchor);
        let c = tree.rect(container);
        let i = tree.rect(inner);
        assert!(c.x >= a.right() - TOL);
        assert!((i.height - 0.7 * 0.6).abs() < TOL);
        assert!((i.width - 0.5 * 0.1).abs() < TOL);
        assert!((i.center_y() - a.center_y()).abs() < TOL);
        assert_eq!(tree.ancestor(inner, 2), Some(root));
        assert!(tree.name(container).ends_with(".flank"));
    }
}

//! Alignment and stacking algebra.
//!
//! Stateless routines that emit ordering, alignment and size-matching
//! constraints over sequences of boxes sharing one tree.  Stacking runs at
//! the strong tier rather than required, so an infeasible arrangement bends
//! instead of failing; alignment runs at medium so a more specific stronger
//! constraint can override it.

use trellis_constraint::{Expression, Relation, Strength};

use crate::tree::{Attr, BoxId, BoxTree, Dim};

/// Stack boxes left to right: each box's right edge, plus padding, stays at
/// or before the next box's left edge.
pub fn hstack(tree: &mut BoxTree, boxes: &[BoxId], padding: f64) {
    for pair in boxes.windows(2) {
        // right + padding - next.left <= 0
        let expr = Expression::from_constant(padding)
            .term(tree.attr_var(pair[0], Attr::Right), 1.0)
            .term(tree.attr_var(pair[1], Attr::Left), -1.0);
        tree.add(expr, Relation::LessOrEqual, Strength::Strong);
    }
}

/// Stack boxes top to bottom: each box's bottom edge stays at or above the
/// next box's top edge plus padding.
pub fn vstack(tree: &mut BoxTree, boxes: &[BoxId], padding: f64) {
    for pair in boxes.windows(2) {
        // bottom - next.top - padding >= 0
        let expr = Expression::from_constant(-padding)
            .term(tree.attr_var(pair[0], Attr::Bottom), 1.0)
            .term(tree.attr_var(pair[1], Attr::Top), -1.0);
        tree.add(expr, Relation::GreaterOrEqual, Strength::Strong);
    }
}

/// Tie an attribute of every box to the first box's.
pub fn align(tree: &mut BoxTree, boxes: &[BoxId], attr: Attr) {
    let Some((&first, rest)) = boxes.split_first() else {
        return;
    };
    for &other in rest {
        let expr = Expression::from_variable(tree.attr_var(first, attr))
            .term(tree.attr_var(other, attr), -1.0);
        tree.add(expr, Relation::Equal, Strength::Medium);
    }
}

/// Chain dimension equalities at the given ratios (uniform when absent):
/// `boxes[i].dim == boxes[i+1].dim * ratios[i] / ratios[i+1]`.
pub fn match_dimension(
    tree: &mut BoxTree,
    boxes: &[BoxId],
    dim: Dim,
    ratios: Option<&[f64]>,
    strength: Strength,
) {
    let ratio = |i: usize| ratios.and_then(|r| r.get(i)).copied().unwrap_or(1.0);
    for (i, pair) in boxes.windows(2).enumerate() {
        tree.constrain_size(pair[0], dim, pair[1], ratio(i) / ratio(i + 1), strength);
    }
}

/// Chain width equalities.
pub fn match_widths(tree: &mut BoxTree, boxes: &[BoxId], ratios: Option<&[f64]>) {
    match_dimension(tree, boxes, Dim::Width, ratios, Strength::Medium);
}

/// Chain height equalities.
pub fn match_heights(tree: &mut BoxTree, boxes: &[BoxId], ratios: Option<&[f64]>) {
    match_dimension(tree, boxes, Dim::Height, ratios, Strength::Medium);
}

/// Stack left to right and match widths.
pub fn hstack_eq(tree: &mut BoxTree, boxes: &[BoxId], padding: f64, ratios: Option<&[f64]>) {
    hstack(tree, boxes, padding);
    match_widths(tree, boxes, ratios);
}

/// Stack top to bottom and match heights.
pub fn vstack_eq(tree: &mut BoxTree, boxes: &[BoxId], padding: f64, ratios: Option<&[f64]>) {
    vstack(tree, boxes, padding);
    match_heights(tree, boxes, ratios);
}

/// Equate one edge's distance-to-ancestor across boxes: for every box,
/// `box.edge - ancestor.edge` matches the first box's, where the ancestor is
/// `levels` steps up the parent chain.  Boxes without a deep enough ancestor
/// are skipped.
pub fn match_edge_margins(tree: &mut BoxTree, boxes: &[BoxId], edge: Attr, levels: usize) {
    let mut anchored = boxes
        .iter()
        .filter_map(|&id| tree.ancestor(id, levels).map(|ancestor| (id, ancestor)));
    let Some((first, first_ancestor)) = anchored.next() else {
        return;
    };
    let rest: Vec<(BoxId, BoxId)> = anchored.collect();
    for (other, other_ancestor) in rest {
        let expr = Expression::from_variable(tree.attr_var(first, edge))
            .term(tree.attr_var(first_ancestor, edge), -1.0)
            .term(tree.attr_var(other, edge), -1.0)
            .term(tree.attr_var(other_ancestor, edge), 1.0);
        tree.add(expr, Relation::Equal, Strength::Strong);
    }
}

/// Match all four edge margins against the level-`levels` ancestors.
pub fn match_margins(tree: &mut BoxTree, boxes: &[BoxId], levels: usize) {
    for edge in [Attr::Left, Attr::Right, Attr::Bottom, Attr::Top] {
        match_edge_margins(tree, boxes, edge, levels);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::BoxFlags;
    use trellis_core::Rect;

    const TOL: f64 = 1e-6;

    fn tree_with_root() -> (BoxTree, BoxId) {
        let mut tree = BoxTree::new();
        let root = tree.new_box(None, "root", BoxFlags::default()).unwrap();
        tree.set_geometry(root, Rect::new(0.0, 0.0, 1.0, 1.0), Strength::Strong);
        (tree, root)
    }

    #[test]
    fn test_hstack_orders_boxes() {
        let (mut tree, root) = tree_with_root();
        let boxes: Vec<BoxId> = (0..3)
            .map(|i| {
                tree.new_box(Some(root), format!("b{i}"), BoxFlags::default())
                    .unwrap()
            })
            .collect();
        hstack_eq(&mut tree, &boxes, 0.01, None);
        tree.solve().unwrap();
        for pair in boxes.windows(2) {
            let a = tree.rect(pair[0]);
            let b = tree.rect(pair[1]);
            assert!(a.right() + 0.01 <= b.x + TOL);
        }
        let w0 = tree.rect(boxes[0]).width;
        for &b in &boxes[1..] {
            assert!((tree.rect(b).width - w0).abs() < TOL);
        }
    }

    #[test]
    fn test_vstack_runs_top_down() {
        let (mut tree, root) = tree_with_root();
        let a = tree.new_box(Some(root), "a", BoxFlags::default()).unwrap();
        let b = tree.new_box(Some(root), "b", BoxFlags::default()).unwrap();
        vstack_eq(&mut tree, &[a, b], 0.02, None);
        tree.solve().unwrap();
        let (ra, rb) = (tree.rect(a), tree.rect(b));
        // The first box ends up above the second.
        assert!(ra.y >= rb.top() + 0.02 - TOL);
        assert!((ra.height - rb.height).abs() < TOL);
    }

    #[test]
    fn test_align_ties_edges() {
        let (mut tree, root) = tree_with_root();
        let a = tree.new_box(Some(root), "a", BoxFlags::tight()).unwrap();
        let b = tree.new_box(Some(root), "b", BoxFlags::tight()).unwrap();
        tree.set_geometry(a, Rect::new(0.25, 0.6, 0.2, 0.2), Strength::Strong);
        align(&mut tree, &[a, b], Attr::Left);
        align(&mut tree, &[a, b], Attr::VCenter);
        tree.solve().unwrap();
        let (ra, rb) = (tree.rect(a), tree.rect(b));
        assert!((ra.x - rb.x).abs() < TOL);
        assert!((ra.center_y() - rb.center_y()).abs() < TOL);
    }

    #[test]
    fn test_match_dimension_ratios() {
        let (mut tree, root) = tree_with_root();
        let a = tree.new_box(Some(root), "a", BoxFlags::tight()).unwrap();
        let b = tree.new_box(Some(root), "b", BoxFlags::tight()).unwrap();
        tree.edit_size(b, Dim::Height, 0.6).unwrap();
        // a.height == b.height * 1/3
        match_dimension(&mut tree, &[a, b], Dim::Height, Some(&[1.0, 3.0]), Strength::Strong);
        tree.solve().unwrap();
        assert!((tree.rect(a).height - 0.2).abs() < TOL);
    }

    #[test]
    fn test_match_edge_margins_across_containers() {
        let (mut tree, root) = tree_with_root();
        let left = tree.new_box(Some(root), "left", BoxFlags::default()).unwrap();
        let right = tree.new_box(Some(root), "right", BoxFlags::default()).unwrap();
        tree.set_geometry(left, Rect::new(0.0, 0.0, 0.5, 1.0), Strength::Strong);
        tree.set_geometry(right, Rect::new(0.5, 0.0, 0.5, 1.0), Strength::Strong);
        let pa = tree.new_box(Some(left), "pa", BoxFlags::position()).unwrap();
        let pb = tree.new_box(Some(right), "pb", BoxFlags::position()).unwrap();
        tree.edit_margin_min(pa, crate::tree::Side::Left, 0.1).unwrap();
        match_margins(&mut tree, &[pa, pb], 1);
        tree.solve().unwrap();
        // Both boxes carry the same left gap to their own containers.
        let ga = tree.rect(pa).x - tree.rect(left).x;
        let gb = tree.rect(pb).x - tree.rect(right).x;
        assert!((ga - gb).abs() < TOL);
        assert!(ga >= 0.1 - TOL);
    }
}

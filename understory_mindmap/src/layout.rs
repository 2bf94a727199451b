// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The layout contract and a reference strategy.
//!
//! A [`LayoutStrategy`] turns node sizes into positions and draws the
//! connecting lines between a parent and its children. The map runs it once
//! per layout pass, after every visible node and summary node was sized.

use kurbo::{BezPath, Point, Rect, Size};
use tracing::debug;
use understory_scene::SceneBackend;

use crate::mindmap::MindMap;
use crate::style::{StyleProp, StyleResolver, StyleScope};
use crate::tree::{NodeId, NodeTree};

/// Inputs a strategy may consult besides the tree.
#[derive(Copy, Clone, Debug)]
pub struct LayoutCx<'a> {
    /// Canvas size.
    pub canvas: Size,
    /// Style lookups for margins and similar values.
    pub style: StyleResolver<'a>,
}

/// What a summary node needs to be placed.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GeneralizationRequest {
    /// Node owning the summary.
    pub owner: NodeId,
    /// Covered children of `owner`, inclusive; `None` covers `owner` itself.
    pub range: Option<[usize; 2]>,
    /// Size of the summary node.
    pub size: Size,
    /// Gap between the covered subtrees and the bracket.
    pub line_margin: f64,
    /// Gap between the bracket and the summary node.
    pub node_margin: f64,
}

/// Where a summary node goes and the bracket drawn next to the covered range.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneralizationPlacement {
    /// Top-left corner of the summary node.
    pub position: Point,
    /// Bracket path in world space.
    pub bracket: BezPath,
}

/// A pluggable layout algorithm.
pub trait LayoutStrategy {
    /// Computes the layout position of every visible node.
    ///
    /// Pinned nodes may be reported too; their pinned position still wins.
    fn layout(&self, tree: &NodeTree, cx: &LayoutCx<'_>) -> Vec<(NodeId, Point)>;

    /// Paths of the lines from `node` to each of its children, in child order.
    fn line_paths(&self, tree: &NodeTree, node: NodeId, line_style: &str) -> Vec<BezPath>;

    /// Returns `true` if `node` should draw no lines at all.
    fn node_is_remove_all_lines(&self, tree: &NodeTree, node: NodeId) -> bool {
        let _ = (tree, node);
        false
    }

    /// Places a summary node right of the range it covers.
    fn generalization_placement(
        &self,
        tree: &NodeTree,
        request: &GeneralizationRequest,
    ) -> Option<GeneralizationPlacement> {
        right_of_range(tree, request)
    }
}

/// Visible nodes under `root` in pre-order: children of collapsed nodes are skipped.
pub(crate) fn expanded_nodes(tree: &NodeTree, root: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        let Some(node) = tree.get(id) else {
            continue;
        };
        out.push(id);
        if node.is_expanded() {
            stack.extend(node.children().iter().rev().copied());
        }
    }
    out
}

/// Bounds of `id` and its visible descendants.
#[must_use]
pub fn subtree_bounds(tree: &NodeTree, id: NodeId) -> Option<Rect> {
    expanded_nodes(tree, id)
        .into_iter()
        .filter_map(|n| tree.get(n).map(|node| node.rect()))
        .reduce(|a, b| a.union(b))
}

fn right_of_range(
    tree: &NodeTree,
    request: &GeneralizationRequest,
) -> Option<GeneralizationPlacement> {
    let covered: Vec<NodeId> = match request.range {
        Some([start, end]) => {
            let children = tree.children_of(request.owner);
            let end = end.min(children.len().checked_sub(1)?);
            children.get(start..=end)?.to_vec()
        }
        None => vec![request.owner],
    };
    let bounds = covered
        .into_iter()
        .filter_map(|id| subtree_bounds(tree, id))
        .reduce(|a, b| a.union(b))?;
    let x = bounds.x1 + request.line_margin;
    let cy = bounds.center().y;
    let reach = 10.0;
    let mut bracket = BezPath::new();
    bracket.move_to((x, bounds.y0));
    bracket.quad_to((x + reach, bounds.y0), (x + reach, cy));
    bracket.quad_to((x + reach, bounds.y1), (x, bounds.y1));
    Some(GeneralizationPlacement {
        position: Point::new(
            x + reach + request.node_margin,
            cy - request.size.height / 2.0,
        ),
        bracket,
    })
}

/// Right-growing tree.
///
/// The root is centered on the canvas; each child column sits right of its
/// parent by the child's horizontal margin, and siblings are stacked around
/// the parent's vertical center by subtree extent. Pinned children keep
/// their place outside the stack, and their descendants follow them.
#[derive(Copy, Clone, Debug, Default)]
pub struct LogicalStructure;

impl LogicalStructure {
    fn extent(tree: &NodeTree, cx: &LayoutCx<'_>, id: NodeId) -> f64 {
        let Some(node) = tree.get(id) else {
            return 0.0;
        };
        if !node.is_expanded() {
            return node.height();
        }
        let stacked = Self::stacked(tree, node.children());
        if stacked.is_empty() {
            return node.height();
        }
        let total = Self::stack_height(tree, cx, &stacked);
        node.height().max(total)
    }

    fn stacked(tree: &NodeTree, children: &[NodeId]) -> Vec<NodeId> {
        children
            .iter()
            .copied()
            .filter(|c| !tree.has_custom_position(*c))
            .collect()
    }

    fn stack_height(tree: &NodeTree, cx: &LayoutCx<'_>, stacked: &[NodeId]) -> f64 {
        let gaps: f64 = stacked
            .iter()
            .skip(1)
            .map(|c| cx.style.number(*c, StyleProp::MarginY, StyleScope::Layered))
            .sum();
        stacked.iter().map(|c| Self::extent(tree, cx, *c)).sum::<f64>() + gaps
    }

    fn place_children(
        tree: &NodeTree,
        cx: &LayoutCx<'_>,
        id: NodeId,
        origin: Point,
        out: &mut Vec<(NodeId, Point)>,
    ) {
        let Some(node) = tree.get(id) else {
            return;
        };
        if !node.is_expanded() {
            return;
        }
        let right = origin.x + node.width();
        let center_y = origin.y + node.height() / 2.0;
        let stacked = Self::stacked(tree, node.children());
        let mut y = center_y - Self::stack_height(tree, cx, &stacked) / 2.0;
        let mut first = true;
        for &child in node.children() {
            let Some(c) = tree.get(child) else {
                continue;
            };
            let pos = if let Some(pinned) = c.custom_position() {
                pinned
            } else {
                if !first {
                    y += cx.style.number(child, StyleProp::MarginY, StyleScope::Layered);
                }
                first = false;
                let margin_x = cx.style.number(child, StyleProp::MarginX, StyleScope::Layered);
                let extent = Self::extent(tree, cx, child);
                let pos = Point::new(right + margin_x, y + (extent - c.height()) / 2.0);
                y += extent;
                pos
            };
            out.push((child, pos));
            Self::place_children(tree, cx, child, pos, out);
        }
    }
}

impl LayoutStrategy for LogicalStructure {
    fn layout(&self, tree: &NodeTree, cx: &LayoutCx<'_>) -> Vec<(NodeId, Point)> {
        let Some(root) = tree.root() else {
            return Vec::new();
        };
        let Some(node) = tree.get(root) else {
            return Vec::new();
        };
        let centered = Point::new(
            (cx.canvas.width - node.width()) / 2.0,
            (cx.canvas.height - node.height()) / 2.0,
        );
        let mut out = vec![(root, centered)];
        Self::place_children(tree, cx, root, node.custom_position().unwrap_or(centered), &mut out);
        out
    }

    fn line_paths(&self, tree: &NodeTree, node: NodeId, line_style: &str) -> Vec<BezPath> {
        let Some(parent) = tree.get(node) else {
            return Vec::new();
        };
        let pr = parent.rect();
        let start = Point::new(pr.x1, pr.center().y);
        parent
            .children()
            .iter()
            .map(|c| {
                let Some(child) = tree.get(*c) else {
                    return BezPath::new();
                };
                let cr = child.rect();
                let end = Point::new(cr.x0, cr.center().y);
                let mid_x = start.x + (end.x - start.x) / 2.0;
                let mut path = BezPath::new();
                path.move_to(start);
                match line_style {
                    "curve" => {
                        path.curve_to(Point::new(mid_x, start.y), Point::new(mid_x, end.y), end);
                    }
                    "direct" => path.line_to(end),
                    _ => {
                        path.line_to((mid_x, start.y));
                        path.line_to((mid_x, end.y));
                        path.line_to(end);
                    }
                }
                path
            })
            .collect()
    }
}

impl<S: SceneBackend> MindMap<S> {
    /// Sizes unsized visible nodes and summary nodes, then applies the
    /// strategy's positions.
    ///
    /// Summary nodes are sized before positions are computed because their
    /// geometry belongs to the owner's bounds.
    pub fn layout_pass(&mut self) {
        let Some(root) = self.tree.root() else {
            return;
        };
        let visible = expanded_nodes(&self.tree, root);
        for &id in &visible {
            if self.tree.get(id).is_some_and(|n| n.content.is_empty()) {
                self.compute_size(id, None);
            }
            self.update_generalization(id);
        }
        let cx = LayoutCx {
            canvas: self.view.canvas(),
            style: StyleResolver::new(&self.tree, &self.theme),
        };
        let positions = self.layout.layout(&self.tree, &cx);
        let placed = positions.len();
        for (id, pos) in positions {
            if let Some(node) = self.tree.get_mut(id) {
                node.layout_left = pos.x;
                node.layout_top = pos.y;
            }
        }
        debug!(visible = visible.len(), placed, "layout pass");
    }
}

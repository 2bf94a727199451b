// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Connecting lines between a node and its children.

use kurbo::BezPath;
use peniko::Color;
use tracing::trace;
use understory_scene::{Dash, ElementDesc, ElementId, Layer, Paint, Parent, SceneBackend, Stroke};

use crate::mindmap::MindMap;
use crate::style::{StyleProp, StyleResolver, StyleScope, StyleValue, parse_css_color, parse_dash};
use crate::tree::{NodeId, NodeTree};

/// Colors lines by top-level branch.
///
/// Every node under the same child of the root gets the same color, picked
/// by that child's index modulo the palette length.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RainbowLines {
    palette: Vec<Color>,
}

impl RainbowLines {
    /// Creates the policy over `palette`.
    #[must_use]
    pub fn new(palette: Vec<Color>) -> Self {
        Self { palette }
    }

    /// Creates the policy from CSS color strings, skipping unparsable ones.
    #[must_use]
    pub fn from_css(colors: &[String]) -> Self {
        Self::new(colors.iter().filter_map(|c| parse_css_color(c)).collect())
    }

    /// Color of the line leading to `node`; `None` for the root.
    #[must_use]
    pub fn color_for(&self, tree: &NodeTree, node: NodeId) -> Option<Color> {
        if self.palette.is_empty() {
            return None;
        }
        let mut branch = node;
        loop {
            let parent = tree.parent_of(branch)?;
            if tree.get(parent)?.is_root() {
                break;
            }
            branch = parent;
        }
        let index = tree.index_in_brothers(branch)?;
        self.palette.get(index % self.palette.len()).copied()
    }
}

/// Resolved stroke of one line.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct LineStyle {
    pub(crate) width: f64,
    pub(crate) color: Option<Color>,
    pub(crate) dash: Dash,
}

impl<S: SceneBackend> MindMap<S> {
    /// Keeps one line per child of `id`, then redraws them.
    ///
    /// Missing lines are created and excess lines are destroyed; a destroyed
    /// line is never handed to another child. Collapsed nodes are left
    /// alone. With `deep`, descendants are reconciled too.
    pub fn render_line(&mut self, id: NodeId, deep: bool) {
        let Some(node) = self.tree.get(id) else {
            return;
        };
        if !node.is_expanded() {
            return;
        }
        let count = if self.layout.node_is_remove_all_lines(&self.tree, id) {
            0
        } else {
            node.children_len()
        };
        let children = node.children.clone();
        let line_style = StyleResolver::new(&self.tree, &self.theme).text(
            id,
            StyleProp::LineStyle,
            StyleScope::Base,
        );
        let paths = self.layout.line_paths(&self.tree, id, &line_style);

        let Some(node) = self.tree.get_mut(id) else {
            return;
        };
        while node.lines.len() < count {
            let line = self.scene.create(ElementDesc::Path(BezPath::new()));
            self.scene.append(Parent::Layer(Layer::Lines), line);
            node.lines.push(line);
        }
        for line in node.lines.drain(count..) {
            self.scene.destroy(line);
        }
        let lines = node.lines.clone();
        for (i, line) in lines.iter().enumerate() {
            if let Some(path) = paths.get(i) {
                self.scene.set_path(*line, path.clone());
            }
            if let Some(child) = children.get(i) {
                self.style_line(*line, *child);
            }
        }
        trace!(node = ?id, lines = count, "lines reconciled");

        if deep {
            for child in children {
                self.render_line(child, true);
            }
        }
    }

    /// Resolves the style of the line leading to `child`.
    ///
    /// The child's own override comes first (or the nearest ancestor's, when
    /// ancestor line styles are inherited), then the rainbow color, then the
    /// theme's base value.
    pub(crate) fn line_style(&self, child: NodeId) -> LineStyle {
        let resolver = StyleResolver::new(&self.tree, &self.theme);
        let own = |prop: StyleProp| -> Option<StyleValue> {
            if self.options.enable_inherit_ancestor_line_style {
                resolver.self_inherit_style(child, prop)
            } else {
                resolver.self_style(child, prop)
            }
        };
        let width = own(StyleProp::LineWidth)
            .and_then(|v| v.as_number())
            .unwrap_or_else(|| resolver.number(child, StyleProp::LineWidth, StyleScope::Base));
        let color = own(StyleProp::LineColor)
            .and_then(|v| parse_css_color(&v.as_text()))
            .or_else(|| {
                self.rainbow
                    .as_ref()
                    .and_then(|r| r.color_for(&self.tree, child))
            })
            .or_else(|| {
                parse_css_color(&resolver.text(child, StyleProp::LineColor, StyleScope::Base))
            });
        let dash = own(StyleProp::LineDasharray)
            .map(|v| parse_dash(&v.as_text()))
            .unwrap_or_else(|| {
                parse_dash(&resolver.text(child, StyleProp::LineDasharray, StyleScope::Base))
            });
        LineStyle { width, color, dash }
    }

    fn style_line(&mut self, line: ElementId, child: NodeId) {
        let style = self.line_style(child);
        let stroke = style.color.map(|color| Stroke {
            color,
            width: style.width,
            dash: style.dash,
        });
        self.scene.set_paint(line, Paint { fill: None, stroke });
    }

    /// Destroys every line of `id`.
    pub fn remove_line(&mut self, id: NodeId) {
        let Some(node) = self.tree.get_mut(id) else {
            return;
        };
        for line in node.lines.drain(..) {
            self.scene.destroy(line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::NodeRecord;
    use crate::mindmap::MindMapBuilder;
    use understory_scene::RetainedScene;

    fn rgb(r: u8, g: u8, b: u8) -> Color {
        Color::from_rgba8(r, g, b, 255)
    }

    fn map() -> (MindMap<RetainedScene>, NodeId) {
        let mut map = MindMapBuilder::new()
            .rainbow_lines(vec![rgb(255, 0, 0), rgb(0, 255, 0)])
            .build(RetainedScene::new());
        let root = map.load(
            NodeRecord::with_text("root")
                .child(NodeRecord::with_text("a").child(NodeRecord::with_text("a1")))
                .child(NodeRecord::with_text("b"))
                .child(NodeRecord::with_text("c")),
        );
        map.render_tree();
        (map, root)
    }

    #[test]
    fn rainbow_follows_top_level_branch() {
        let (map, root) = map();
        let children = map.tree().children_of(root).to_vec();
        let a1 = map.tree().children_of(children[0])[0];
        let rainbow = map.rainbow.as_ref().unwrap();
        assert_eq!(rainbow.color_for(map.tree(), root), None);
        assert_eq!(rainbow.color_for(map.tree(), a1), Some(rgb(255, 0, 0)));
        assert_eq!(rainbow.color_for(map.tree(), children[1]), Some(rgb(0, 255, 0)));
        assert_eq!(rainbow.color_for(map.tree(), children[2]), Some(rgb(255, 0, 0)));
    }

    #[test]
    fn own_override_beats_rainbow() {
        let (mut map, root) = map();
        let b = map.tree().children_of(root)[1];
        map.tree
            .get_mut(b)
            .unwrap()
            .data
            .set_style_override(StyleProp::LineColor, Some("#0000ff".into()));
        assert_eq!(map.line_style(b).color, Some(rgb(0, 0, 255)));
    }

    #[test]
    fn inherited_override_needs_the_option() {
        let (mut map, root) = map();
        let a = map.tree().children_of(root)[0];
        let a1 = map.tree().children_of(a)[0];
        map.tree
            .get_mut(a)
            .unwrap()
            .data
            .set_style_override(StyleProp::LineWidth, Some(StyleValue::Number(4.0)));
        assert_eq!(map.line_style(a1).width, 1.0);
        map.options.enable_inherit_ancestor_line_style = true;
        assert_eq!(map.line_style(a1).width, 4.0);
    }

    #[test]
    fn excess_lines_are_destroyed_not_reused() {
        let (mut map, root) = map();
        let lines = map.node(root).unwrap().lines().to_vec();
        assert_eq!(lines.len(), 3);
        let c = map.tree().children_of(root)[2];
        map.tree.unlink(c);
        map.render_line(root, false);
        assert_eq!(map.node(root).unwrap().lines(), &lines[..2]);
        assert!(!map.scene().contains(lines[2]));
    }
}
